//! REST API client module for the stegosign service.
//!
//! `RequestDispatcher` is the single HTTP transport; it stamps the session's
//! current credential onto every request. `ApiClient` routes its calls
//! through credential recovery, `AccountApi` does not.

pub mod account;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod request;

pub use account::AccountApi;
pub use client::{ApiClient, ImageUpload};
pub use dispatcher::{RequestDispatcher, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
pub use reqwest::StatusCode;
pub use request::{ApiRequest, ApiResponse, FormField, RequestBody, CURRENT_SUBJECT_PATH};
