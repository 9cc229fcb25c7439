//! Account maintenance calls that never carry or renew a credential:
//! registration, email confirmation and password reset.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, ApiRequest, RequestDispatcher};
use crate::models::{NewAccount, Subject};

/// `{"msg": "..."}` acknowledgement returned by most account endpoints
#[derive(Debug, Deserialize)]
struct Acknowledgement {
    msg: String,
}

#[derive(Debug, Deserialize)]
struct GoogleLogin {
    auth_url: String,
}

#[derive(Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    token: &'a str,
    new_password: &'a str,
}

/// Unauthenticated account endpoints. Uses the bare dispatcher: a 401 here
/// is a plain failure, not a reason to renew.
#[derive(Clone)]
pub struct AccountApi {
    dispatcher: RequestDispatcher,
}

impl AccountApi {
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Create an account. The new user must confirm their email before
    /// signing in.
    pub async fn register(&self, account: &NewAccount) -> Result<Subject, ApiError> {
        info!(username = %account.username, "Registering account");
        let request = ApiRequest::post("/auth/register").json(account)?;
        self.dispatcher.send(&request).await?.json()
    }

    pub async fn confirm_email(&self, token: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post("/auth/confirm-email").query("token", token);
        self.acknowledge(request).await
    }

    /// Request a reset link. The server answers the same way whether or not
    /// the address exists.
    pub async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post("/auth/forgot-password").json(&ForgotPasswordRequest { email })?;
        self.acknowledge(request).await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post("/auth/reset-password").json(&ResetPasswordRequest {
            token,
            new_password,
        })?;
        self.acknowledge(request).await
    }

    /// URL of the Google consent page. The code it redirects back with is
    /// exchanged via `IdentityProof::OAuthCode`.
    pub async fn google_login_url(&self) -> Result<String, ApiError> {
        let response = self.dispatcher.send(&ApiRequest::get("/auth/google/login")).await?;
        let login: GoogleLogin = response.json()?;
        Ok(login.auth_url)
    }

    async fn acknowledge(&self, request: ApiRequest) -> Result<String, ApiError> {
        let ack: Acknowledgement = self.dispatcher.send(&request).await?.json()?;
        Ok(ack.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionStore;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    fn account_api(url: &str) -> AccountApi {
        AccountApi::new(RequestDispatcher::new(url, Duration::from_secs(5), SessionStore::new()).unwrap())
    }

    #[tokio::test]
    async fn test_register_returns_created_user() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/register")
            .match_body(Matcher::Json(json!({
                "firstname": "Bob",
                "lastname": "Stone",
                "username": "bob",
                "email": "bob@example.com",
                "password": "Secret-123"
            })))
            .with_status(201)
            .with_body(r#"{"id":9,"firstname":"Bob","lastname":"Stone","username":"bob","email":"bob@example.com"}"#)
            .create_async()
            .await;

        let account = NewAccount {
            firstname: "Bob".into(),
            lastname: "Stone".into(),
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "Secret-123".into(),
        };
        let subject = account_api(&server.url()).register(&account).await.unwrap();

        mock.assert_async().await;
        assert_eq!(subject.id, 9);
        assert_eq!(subject.display_name(), "Bob Stone");
    }

    #[tokio::test]
    async fn test_confirm_email_sends_token_as_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/confirm-email")
            .match_query(Matcher::UrlEncoded("token".into(), "t0k".into()))
            .with_status(200)
            .with_body(r#"{"msg":"Email confirmed successfully.","user":{"id":9}}"#)
            .create_async()
            .await;

        let msg = account_api(&server.url()).confirm_email("t0k").await.unwrap();

        mock.assert_async().await;
        assert_eq!(msg, "Email confirmed successfully.");
    }

    #[tokio::test]
    async fn test_reset_password_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/reset-password")
            .match_body(Matcher::Json(json!({"token": "t0k", "new_password": "N3w-pass"})))
            .with_status(200)
            .with_body(r#"{"msg":"Password has been reset successfully."}"#)
            .create_async()
            .await;

        account_api(&server.url())
            .reset_password("t0k", "N3w-pass")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_reset_token_is_bad_request() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/reset-password")
            .with_status(400)
            .with_body(r#"{"err":"Invalid or expired reset token."}"#)
            .create_async()
            .await;

        let err = account_api(&server.url())
            .reset_password("old", "N3w-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { ref message, .. } if message.contains("expired")));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_renewed() {
        let mut server = Server::new_async().await;
        let forgot = server
            .mock("POST", "/auth/forgot-password")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let err = account_api(&server.url())
            .forgot_password("a@example.com")
            .await
            .unwrap_err();

        forgot.assert_async().await;
        refresh.assert_async().await;
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_google_login_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/google/login")
            .with_status(200)
            .with_body(r#"{"auth_url":"https://accounts.google.com/o/oauth2/auth?client_id=x"}"#)
            .create_async()
            .await;

        let url = account_api(&server.url()).google_login_url().await.unwrap();
        assert!(url.starts_with("https://accounts.google.com/"));
    }
}
