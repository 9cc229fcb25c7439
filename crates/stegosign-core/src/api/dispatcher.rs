//! Request dispatcher: turns `ApiRequest` values into HTTP calls.
//!
//! The authorization header is read from the `SessionStore` at send time,
//! never when the request value is built, so calls issued after a renewal
//! pick up the new credential. The underlying `reqwest::Client` keeps a
//! cookie jar; that jar carries the refresh cookie used by renewal.

use std::time::Duration;

use reqwest::{header, multipart, Client, RequestBuilder, Url};
use tracing::{debug, warn};

use super::request::{ApiRequest, ApiResponse, FormField, RequestBody};
use super::ApiError;
use crate::auth::SessionStore;

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sends requests with the current credential stamped on them.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RequestDispatcher {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl RequestDispatcher {
    pub fn new(base_url: &str, timeout: Duration, session: SessionStore) -> Result<Self, ApiError> {
        Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and buffer its response.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.send_tracked(request).await.1
    }

    /// Like `send`, also reporting the session generation whose credential
    /// was stamped on the request.
    pub(crate) async fn send_tracked(&self, request: &ApiRequest) -> (u64, Result<ApiResponse, ApiError>) {
        let (authorization, generation) = self.session.stamp();
        let result = self.dispatch(request, authorization).await;
        (generation, result)
    }

    async fn dispatch(&self, request: &ApiRequest, authorization: Option<String>) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(request)?;
        debug!(
            method = %request.method(),
            url = %url,
            authorized = authorization.is_some(),
            "Sending request"
        );

        let builder = self.client.request(request.method().clone(), url.clone());
        let builder = Self::with_authorization(builder, authorization)?;
        let builder = Self::with_body(builder, request.body())?;

        let response = builder.send().await?;
        let response = Self::check_response(response).await;
        if let Err(ref e) = response {
            debug!(url = %url, error = %e, "Request failed");
        }
        response
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, request.path());
        let mut url = Url::parse(&raw)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid URL {}: {}", raw, e)))?;
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }
        Ok(url)
    }

    fn with_authorization(builder: RequestBuilder, authorization: Option<String>) -> Result<RequestBuilder, ApiError> {
        match authorization {
            Some(value) => {
                let mut value = header::HeaderValue::from_str(&value)
                    .map_err(|e| ApiError::InvalidRequest(format!("Invalid authorization header: {}", e)))?;
                value.set_sensitive(true);
                Ok(builder.header(header::AUTHORIZATION, value))
            }
            None => Ok(builder),
        }
    }

    fn with_body(builder: RequestBuilder, body: &RequestBody) -> Result<RequestBuilder, ApiError> {
        let builder = builder.header(header::ACCEPT, "application/json");
        match body {
            RequestBody::Empty => Ok(builder),
            RequestBody::Json(value) => Ok(builder.json(value)),
            RequestBody::Multipart(fields) => {
                let mut form = multipart::Form::new();
                for field in fields {
                    form = match field {
                        FormField::Text { name, value } => form.text(name.clone(), value.clone()),
                        FormField::File {
                            name,
                            filename,
                            mime,
                            bytes,
                        } => {
                            let part = multipart::Part::bytes(bytes.to_vec())
                                .file_name(filename.clone())
                                .mime_str(mime)?;
                            form.part(name.clone(), part)
                        }
                    };
                }
                Ok(builder.multipart(form))
            }
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            Ok(ApiResponse::new(status, body.to_vec()))
        } else {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                warn!(status = %status, "Server error response");
            }
            Err(ApiError::from_status(status, &body))
        }
    }
}
