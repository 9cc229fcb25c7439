//! Recovery interceptor: renews an expired credential and replays the call.
//!
//! Per call:
//!
//! ```text
//! Sent ──► Success
//!   └────► Unauthorized ──(already replayed)──► fail
//!                └──► Renewing ──► renew ok ──► refetch subject ──► Replay ──► Success | fail
//!                          └──► renew/refetch failed ──► forced logout ──► fail
//! ```
//!
//! Only a 401 enters recovery. Everything else is returned untouched.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::{CredentialExchangeError, SessionError};
use super::{CredentialExchange, SessionStore};
use crate::api::{ApiRequest, ApiResponse, RequestDispatcher};
use crate::models::Subject;

/// Maximum number of replays after a renewal, per originating call.
const MAX_REPLAYS: u8 = 1;

/// Which try of an originating call is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    replays: u8,
}

impl Attempt {
    pub const fn first() -> Self {
        Self { replays: 0 }
    }

    /// Whether an unauthorized response on this attempt may still be recovered.
    pub fn may_recover(self) -> bool {
        self.replays < MAX_REPLAYS
    }

    pub fn next(self) -> Self {
        Self {
            replays: self.replays + 1,
        }
    }

    pub fn replays(self) -> u8 {
        self.replays
    }
}

enum Recovered {
    /// Send the original request again with the new credential
    Replay,
    /// The original request was the subject lookup; answer it directly
    Resolved(Subject),
}

/// Runs requests through the dispatcher and recovers from expired
/// credentials.
#[derive(Clone)]
pub struct RecoveryInterceptor {
    dispatcher: RequestDispatcher,
    exchange: Arc<dyn CredentialExchange>,
    session: SessionStore,
    /// When set, concurrent recoveries share one renewal
    renewal_gate: Option<Arc<Mutex<()>>>,
}

impl RecoveryInterceptor {
    pub fn new(dispatcher: RequestDispatcher, exchange: Arc<dyn CredentialExchange>) -> Self {
        let session = dispatcher.session().clone();
        Self {
            dispatcher,
            exchange,
            session,
            renewal_gate: None,
        }
    }

    /// Coalesce renewals triggered by concurrent failures. Off by default:
    /// every failing call then renews on its own and the last renewal to
    /// land wins.
    pub fn with_coalesced_renewals(mut self, enabled: bool) -> Self {
        self.renewal_gate = enabled.then(|| Arc::new(Mutex::new(())));
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn exchange(&self) -> &Arc<dyn CredentialExchange> {
        &self.exchange
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        self.execute_from(request, Attempt::first()).await
    }

    async fn execute_from(&self, request: &ApiRequest, first: Attempt) -> Result<ApiResponse, SessionError> {
        let mut attempt = first;
        loop {
            let (generation, result) = self.dispatcher.send_tracked(request).await;
            let err = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !err.is_unauthorized() {
                return Err(err.into());
            }
            if !attempt.may_recover() {
                warn!(
                    path = request.path(),
                    replays = attempt.replays(),
                    "Still unauthorized after renewal, giving up"
                );
                return Err(err.into());
            }

            match self.recover(request, generation).await? {
                Recovered::Resolved(subject) => {
                    debug!("Answering subject lookup from recovery");
                    return ApiResponse::from_json(&subject).map_err(SessionError::from);
                }
                Recovered::Replay => {
                    attempt = attempt.next();
                    debug!(path = request.path(), replays = attempt.replays(), "Replaying request");
                }
            }
        }
    }

    async fn recover(&self, request: &ApiRequest, stale_generation: u64) -> Result<Recovered, SessionError> {
        let subject = match &self.renewal_gate {
            None => self.renew_session().await?,
            Some(gate) => {
                let _permit = gate.lock().await;
                if self.session.generation() != stale_generation && self.session.is_authenticated() {
                    debug!("Credential already renewed by a concurrent call");
                    if !request.is_current_subject() {
                        return Ok(Recovered::Replay);
                    }
                    match self.session.subject() {
                        Some(subject) => subject,
                        None => self.refresh_subject().await?,
                    }
                } else {
                    self.renew_session().await?
                }
            }
        };

        if request.is_current_subject() {
            Ok(Recovered::Resolved(subject))
        } else {
            Ok(Recovered::Replay)
        }
    }

    /// Renew the credential, store it, then refresh the cached subject.
    async fn renew_session(&self) -> Result<Subject, SessionError> {
        info!("Access token rejected, renewing session");
        let credential = match self.exchange.renew_credential().await {
            Ok(credential) => credential,
            Err(e) => return Err(self.force_logout(e)),
        };
        self.session.replace_credential(credential);
        self.refresh_subject().await
    }

    async fn refresh_subject(&self) -> Result<Subject, SessionError> {
        match self.exchange.fetch_current_subject().await {
            Ok(subject) => {
                self.session.set_subject(subject.clone());
                Ok(subject)
            }
            Err(e) => Err(self.force_logout(e)),
        }
    }

    fn force_logout(&self, cause: CredentialExchangeError) -> SessionError {
        warn!(error = %cause, "Session recovery failed, signing out");
        self.session.clear();
        SessionError::SessionEnded(cause)
    }
}
