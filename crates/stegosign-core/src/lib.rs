//! Core library for stegosign.
//!
//! Holds the session layer shared by every front end: credential storage,
//! the credential exchange with the service, automatic recovery from expired
//! credentials, and the admission guard for protected content. The API
//! client and data models for image signing and verification sit on top.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod services;

pub use api::{AccountApi, ApiClient, ApiError, ImageUpload};
pub use auth::{Admission, Credential, IdentityProof, RouteGuard, SessionError, SessionEvent, SessionStore};
pub use config::Config;
pub use services::Services;
