//! Session layer: who is signed in and how they stay signed in.
//!
//! This module provides:
//! - `SessionStore`: the shared credential and subject, with change events
//! - `CredentialExchange`: obtain, renew and invalidate credentials
//! - `RecoveryInterceptor`: renews on `401 Unauthorized` and replays once
//! - `RouteGuard`: admission check for protected content
//!
//! The renewal proof is the `refresh_token` cookie held by the HTTP client's
//! cookie jar; it never passes through this module.

pub mod credential;
pub mod error;
pub mod exchange;
pub mod flows;
pub mod guard;
pub mod recovery;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;

pub use credential::{Credential, IdentityProof, DEFAULT_TOKEN_KIND};
pub use error::{CredentialExchangeError, ExchangeOperation, SessionError};
pub use exchange::{CredentialExchange, HttpCredentialExchange};
pub use flows::{sign_in, sign_out};
pub use guard::{Admission, RouteGuard, LOGIN_ROUTE};
pub use recovery::{Attempt, RecoveryInterceptor};
pub use session::{SessionEvent, SessionStore};
