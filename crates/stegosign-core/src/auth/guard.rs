//! Route guard for protected content.
//!
//! Admission always ends with a freshly fetched subject in the store, or
//! with the store cleared and a redirect to the login boundary.

use tracing::{debug, info, warn};

use super::error::SessionError;
use crate::api::ApiClient;
use crate::models::Subject;

/// Where denied callers are sent.
pub const LOGIN_ROUTE: &str = "login";

#[derive(Debug)]
pub enum Admission {
    /// Protected content may render for this subject
    Granted(Subject),
    /// Session state was cleared; send the user to `login_route`
    Redirect {
        login_route: &'static str,
        cause: SessionError,
    },
}

impl Admission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted(_))
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    api: ApiClient,
    login_route: &'static str,
}

impl RouteGuard {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            login_route: LOGIN_ROUTE,
        }
    }

    pub fn with_login_route(mut self, login_route: &'static str) -> Self {
        self.login_route = login_route;
        self
    }

    /// Run on entering a protected boundary.
    pub async fn admit(&self) -> Admission {
        match self.check().await {
            Ok(subject) => {
                debug!(subject_id = subject.id, "Admitted to protected content");
                Admission::Granted(subject)
            }
            Err(cause) => {
                warn!(error = %cause, route = self.login_route, "Redirecting to sign in");
                // SessionEnded means the store was already cleared, here or by the interceptor
                if !matches!(cause, SessionError::SessionEnded(_)) {
                    self.api.session().clear();
                }
                Admission::Redirect {
                    login_route: self.login_route,
                    cause,
                }
            }
        }
    }

    async fn check(&self) -> Result<Subject, SessionError> {
        let session = self.api.session();
        if !session.is_authenticated() {
            info!("No credential held, attempting silent renewal");
            match self.api.interceptor().exchange().renew_credential().await {
                Ok(credential) => session.replace_credential(credential),
                Err(e) => {
                    session.clear();
                    return Err(SessionError::SessionEnded(e));
                }
            }
        }

        let subject = self.api.current_subject().await?;
        session.set_subject(subject.clone());
        Ok(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RequestDispatcher;
    use crate::auth::fake::{alice, FakeExchange};
    use crate::auth::{Credential, RecoveryInterceptor, SessionEvent, SessionStore};
    use mockito::Server;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn guard(url: &str, session: &SessionStore, exchange: Arc<FakeExchange>) -> RouteGuard {
        let dispatcher = RequestDispatcher::new(url, Duration::from_secs(5), session.clone()).unwrap();
        RouteGuard::new(ApiClient::new(RecoveryInterceptor::new(dispatcher, exchange)))
    }

    fn count_ended(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> usize {
        let mut ended = 0;
        while let Ok(event) = events.try_recv() {
            if event == SessionEvent::Ended {
                ended += 1;
            }
        }
        ended
    }

    #[tokio::test]
    async fn test_empty_store_renewal_failure_redirects_once() {
        let session = SessionStore::new();
        let mut events = session.subscribe();
        let exchange = Arc::new(FakeExchange::new(&session));
        // No HTTP call is expected at all
        let guard = guard("http://127.0.0.1:9", &session, exchange.clone());

        let admission = guard.admit().await;

        match admission {
            Admission::Redirect { login_route, cause } => {
                assert_eq!(login_route, LOGIN_ROUTE);
                assert!(matches!(cause, SessionError::SessionEnded(ref e) if e.is_unauthorized()));
            }
            Admission::Granted(_) => panic!("guard admitted without a session"),
        }
        assert!(!session.is_authenticated());
        assert_eq!(session.subject(), None);
        assert_eq!(count_ended(&mut events), 1);
        assert_eq!(exchange.renewals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_store_renewal_server_error_redirects_once() {
        let session = SessionStore::new();
        let mut events = session.subscribe();
        let exchange = Arc::new(
            FakeExchange::new(&session).failing_renewal_with(reqwest::StatusCode::SERVICE_UNAVAILABLE),
        );
        let guard = guard("http://127.0.0.1:9", &session, exchange.clone());

        let admission = guard.admit().await;

        match admission {
            Admission::Redirect { cause, .. } => {
                assert!(matches!(cause, SessionError::SessionEnded(ref e) if !e.is_unauthorized()));
                assert_eq!(cause.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
            }
            Admission::Granted(_) => panic!("guard admitted after failed renewal"),
        }
        assert_eq!(session.credential(), None);
        assert_eq!(session.subject(), None);
        assert_eq!(count_ended(&mut events), 1);
        assert_eq!(exchange.renewals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_credential_renewal_failure_redirects_once() {
        let mut server = Server::new_async().await;
        let _me = server
            .mock("GET", "/auth/me")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let session = SessionStore::new();
        session.establish(Credential::bearer("abc"));
        session.set_subject(alice());
        let mut events = session.subscribe();
        let exchange = Arc::new(
            FakeExchange::new(&session).failing_renewal_with(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
        );
        let guard = guard(&server.url(), &session, exchange);

        assert!(!guard.admit().await.is_granted());
        assert!(!session.is_authenticated());
        assert_eq!(session.subject(), None);
        assert_eq!(count_ended(&mut events), 1);
    }

    #[tokio::test]
    async fn test_empty_store_silent_renewal_grants() {
        let mut server = Server::new_async().await;
        let me = server
            .mock("GET", "/auth/me")
            .match_header("authorization", "bearer xyz")
            .with_status(200)
            .with_body(r#"{"id":1,"firstname":"Alice","username":"alice","email":"alice@example.com"}"#)
            .expect(1)
            .create_async()
            .await;

        let session = SessionStore::new();
        let exchange = Arc::new(FakeExchange::new(&session).renewing_to(Credential::bearer("xyz")));
        let guard = guard(&server.url(), &session, exchange.clone());

        let admission = guard.admit().await;

        me.assert_async().await;
        assert!(admission.is_granted());
        assert_eq!(session.authorization_header().as_deref(), Some("bearer xyz"));
        assert_eq!(session.subject().map(|s| s.firstname), Some("Alice".to_string()));
        assert_eq!(exchange.renewals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authenticated_store_still_refreshes_subject() {
        let mut server = Server::new_async().await;
        let me = server
            .mock("GET", "/auth/me")
            .match_header("authorization", "bearer abc")
            .with_status(200)
            .with_body(r#"{"id":1,"firstname":"Alice","username":"alice","email":"alice@example.com"}"#)
            .expect(1)
            .create_async()
            .await;

        let session = SessionStore::new();
        session.establish(Credential::bearer("abc"));
        let exchange = Arc::new(FakeExchange::new(&session));
        let guard = guard(&server.url(), &session, exchange.clone());

        assert!(guard.admit().await.is_granted());
        me.assert_async().await;
        assert_eq!(exchange.renewals.load(Ordering::SeqCst), 0);
        assert!(session.subject().is_some());
    }

    #[tokio::test]
    async fn test_stale_credential_recovered_through_interceptor() {
        let mut server = Server::new_async().await;
        let me = server
            .mock("GET", "/auth/me")
            .match_header("authorization", "bearer abc")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let session = SessionStore::new();
        session.establish(Credential::bearer("abc"));
        let exchange = Arc::new(
            FakeExchange::new(&session)
                .renewing_to(Credential::bearer("xyz"))
                .with_subject(alice()),
        );
        let guard = guard(&server.url(), &session, exchange.clone());

        let admission = guard.admit().await;

        me.assert_async().await;
        assert!(matches!(admission, Admission::Granted(ref s) if *s == alice()));
        assert_eq!(exchange.subject_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(session.authorization_header().as_deref(), Some("bearer xyz"));
    }

    #[tokio::test]
    async fn test_subject_failure_clears_and_redirects() {
        let mut server = Server::new_async().await;
        let _me = server
            .mock("GET", "/auth/me")
            .with_status(500)
            .create_async()
            .await;

        let session = SessionStore::new();
        session.establish(Credential::bearer("abc"));
        let mut events = session.subscribe();
        let exchange = Arc::new(FakeExchange::new(&session));
        let guard = guard(&server.url(), &session, exchange).with_login_route("/login");

        let admission = guard.admit().await;

        assert!(matches!(admission, Admission::Redirect { login_route: "/login", .. }));
        assert!(!session.is_authenticated());
        assert_eq!(count_ended(&mut events), 1);
    }
}
