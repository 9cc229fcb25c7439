use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::api::ApiError;

/// The credential operations a `CredentialExchange` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOperation {
    Obtain,
    Renew,
    Invalidate,
    FetchSubject,
}

impl fmt::Display for ExchangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeOperation::Obtain => "Sign-in",
            ExchangeOperation::Renew => "Credential renewal",
            ExchangeOperation::Invalidate => "Sign-out",
            ExchangeOperation::FetchSubject => "Profile lookup",
        };
        f.write_str(name)
    }
}

/// A credential operation failed; carries the transport status when there
/// was one.
#[derive(Error, Debug)]
#[error("{operation} failed: {source}")]
pub struct CredentialExchangeError {
    pub operation: ExchangeOperation,
    #[source]
    pub source: ApiError,
}

impl CredentialExchangeError {
    pub fn new(operation: ExchangeOperation, source: ApiError) -> Self {
        Self { operation, source }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.source.status()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.source.is_unauthorized()
    }
}

/// Errors surfaced by calls that run through the recovery interceptor.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The call failed and was not (or could no longer be) recovered.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Recovery could not renew the session; all session state was cleared.
    #[error("Session ended: {0}")]
    SessionEnded(#[source] CredentialExchangeError),

    /// The identity proof was not accepted.
    #[error(transparent)]
    SignInFailed(CredentialExchangeError),
}

impl SessionError {
    /// Whether the caller should send the user back to sign in.
    pub fn requires_sign_in(&self) -> bool {
        match self {
            SessionError::SessionEnded(_) | SessionError::SignInFailed(_) => true,
            SessionError::Api(e) => e.is_unauthorized(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SessionError::Api(e) => e.status(),
            SessionError::SessionEnded(e) | SessionError::SignInFailed(e) => e.status(),
        }
    }
}
