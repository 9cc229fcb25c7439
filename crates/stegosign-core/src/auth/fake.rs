//! Counting in-memory `CredentialExchange` for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use super::error::{CredentialExchangeError, ExchangeOperation};
use super::{Credential, CredentialExchange, IdentityProof, SessionStore};
use crate::api::ApiError;
use crate::models::Subject;

pub(crate) fn alice() -> Subject {
    Subject {
        id: 1,
        firstname: "Alice".into(),
        lastname: String::new(),
        username: "alice".into(),
        email: "alice@example.com".into(),
        created_at: None,
    }
}

/// Each operation succeeds only if it was given something to return;
/// otherwise it fails with `401 Unauthorized`, or the status given to
/// `failing_renewal_with` for renewal.
pub(crate) struct FakeExchange {
    session: SessionStore,
    issued: Option<Credential>,
    renewed: Option<Credential>,
    /// Status renewal fails with when no credential is configured
    renew_failure: StatusCode,
    subject: Option<Subject>,
    invalidate_fails: bool,
    pub obtains: AtomicUsize,
    pub renewals: AtomicUsize,
    pub invalidations: AtomicUsize,
    pub subject_fetches: AtomicUsize,
    /// Authorization header visible in the store at each subject fetch
    pub subject_headers: Mutex<Vec<Option<String>>>,
}

impl FakeExchange {
    pub(crate) fn new(session: &SessionStore) -> Self {
        Self {
            session: session.clone(),
            issued: None,
            renewed: None,
            renew_failure: StatusCode::UNAUTHORIZED,
            subject: None,
            invalidate_fails: false,
            obtains: AtomicUsize::new(0),
            renewals: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
            subject_fetches: AtomicUsize::new(0),
            subject_headers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn issuing(mut self, credential: Credential) -> Self {
        self.issued = Some(credential);
        self
    }

    pub(crate) fn renewing_to(mut self, credential: Credential) -> Self {
        self.renewed = Some(credential);
        self
    }

    pub(crate) fn failing_renewal_with(mut self, status: StatusCode) -> Self {
        self.renew_failure = status;
        self
    }

    pub(crate) fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub(crate) fn failing_invalidate(mut self) -> Self {
        self.invalidate_fails = true;
        self
    }

    fn unauthorized(operation: ExchangeOperation) -> CredentialExchangeError {
        CredentialExchangeError::new(operation, ApiError::Unauthorized)
    }
}

#[async_trait]
impl CredentialExchange for FakeExchange {
    async fn obtain_credential(&self, _proof: &IdentityProof) -> Result<Credential, CredentialExchangeError> {
        self.obtains.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.issued
            .clone()
            .ok_or_else(|| Self::unauthorized(ExchangeOperation::Obtain))
    }

    async fn renew_credential(&self) -> Result<Credential, CredentialExchangeError> {
        self.renewals.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.renewed.clone().ok_or_else(|| {
            CredentialExchangeError::new(
                ExchangeOperation::Renew,
                ApiError::from_status(self.renew_failure, ""),
            )
        })
    }

    async fn invalidate_credential(&self) -> Result<(), CredentialExchangeError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        if self.invalidate_fails {
            Err(CredentialExchangeError::new(
                ExchangeOperation::Invalidate,
                ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ))
        } else {
            Ok(())
        }
    }

    async fn fetch_current_subject(&self) -> Result<Subject, CredentialExchangeError> {
        self.subject_fetches.fetch_add(1, Ordering::SeqCst);
        self.subject_headers.lock().push(self.session.authorization_header());
        tokio::task::yield_now().await;
        self.subject
            .clone()
            .ok_or_else(|| Self::unauthorized(ExchangeOperation::FetchSubject))
    }
}
