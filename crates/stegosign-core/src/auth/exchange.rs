//! Credential exchange: the four network operations the session protocol
//! depends on.
//!
//! `HttpCredentialExchange` talks to the service through a bare
//! `RequestDispatcher`, never through the recovery interceptor, so a failed
//! renewal cannot trigger another renewal.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::credential::TokenResponse;
use super::error::{CredentialExchangeError, ExchangeOperation};
use super::{Credential, IdentityProof};
use crate::api::{ApiError, ApiRequest, RequestDispatcher, CURRENT_SUBJECT_PATH};
use crate::models::Subject;

const LOGIN_PATH: &str = "/auth/login";
const GOOGLE_CALLBACK_PATH: &str = "/auth/google/callback";
const REFRESH_PATH: &str = "/auth/refresh";
const LOGOUT_PATH: &str = "/auth/logout";

#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Trade an identity proof for a credential.
    async fn obtain_credential(&self, proof: &IdentityProof) -> Result<Credential, CredentialExchangeError>;

    /// Get a fresh credential without re-prompting the user. The proof is
    /// carried out-of-band by the transport (the refresh cookie).
    async fn renew_credential(&self) -> Result<Credential, CredentialExchangeError>;

    /// Terminate the server-side session. Best effort.
    async fn invalidate_credential(&self) -> Result<(), CredentialExchangeError>;

    async fn fetch_current_subject(&self) -> Result<Subject, CredentialExchangeError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Clone)]
pub struct HttpCredentialExchange {
    dispatcher: RequestDispatcher,
}

impl HttpCredentialExchange {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    async fn request_credential(
        &self,
        operation: ExchangeOperation,
        request: ApiRequest,
    ) -> Result<Credential, CredentialExchangeError> {
        let fail = |e: ApiError| CredentialExchangeError::new(operation, e);
        let response = self.dispatcher.send(&request).await.map_err(fail)?;
        let token: TokenResponse = response.json().map_err(fail)?;
        let credential = Credential::from(token);
        debug!(kind = credential.kind(), %operation, "Credential issued");
        Ok(credential)
    }
}

#[async_trait]
impl CredentialExchange for HttpCredentialExchange {
    async fn obtain_credential(&self, proof: &IdentityProof) -> Result<Credential, CredentialExchangeError> {
        let operation = ExchangeOperation::Obtain;
        let request = match proof {
            IdentityProof::Password { email, password } => {
                info!(email = %email, "Signing in with password");
                ApiRequest::post(LOGIN_PATH)
                    .json(&LoginRequest { email, password })
                    .map_err(|e| CredentialExchangeError::new(operation, e))?
            }
            IdentityProof::OAuthCode(code) => {
                info!("Completing Google sign-in");
                ApiRequest::get(GOOGLE_CALLBACK_PATH).query("code", code.as_str())
            }
        };
        self.request_credential(operation, request).await
    }

    async fn renew_credential(&self) -> Result<Credential, CredentialExchangeError> {
        self.request_credential(ExchangeOperation::Renew, ApiRequest::post(REFRESH_PATH))
            .await
    }

    async fn invalidate_credential(&self) -> Result<(), CredentialExchangeError> {
        self.dispatcher
            .send(&ApiRequest::post(LOGOUT_PATH))
            .await
            .map(|_| ())
            .map_err(|e| CredentialExchangeError::new(ExchangeOperation::Invalidate, e))
    }

    async fn fetch_current_subject(&self) -> Result<Subject, CredentialExchangeError> {
        let fail = |e: ApiError| CredentialExchangeError::new(ExchangeOperation::FetchSubject, e);
        let response = self
            .dispatcher
            .send(&ApiRequest::get(CURRENT_SUBJECT_PATH))
            .await
            .map_err(fail)?;
        response.json().map_err(fail)
    }
}
