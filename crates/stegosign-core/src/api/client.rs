//! API client for the stegosign service.
//!
//! Every call here runs through the `RecoveryInterceptor`: the current
//! credential is stamped at send time and an expired credential is renewed
//! and the call replayed once.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{ApiError, ApiRequest, CURRENT_SUBJECT_PATH};
use crate::auth::{RecoveryInterceptor, SessionError, SessionStore};
use crate::models::{SignatureReceipt, SignatureRecord, SignedImage, Subject, VerificationOutcome, VerificationRecord};

/// An image to upload, already read into memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an image from disk, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(filename, mime_for(path), bytes))
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// API client for authenticated stegosign calls.
/// Clone is cheap - the interceptor shares its HTTP client and session.
#[derive(Clone)]
pub struct ApiClient {
    interceptor: RecoveryInterceptor,
}

impl ApiClient {
    pub fn new(interceptor: RecoveryInterceptor) -> Self {
        Self { interceptor }
    }

    pub fn session(&self) -> &SessionStore {
        self.interceptor.session()
    }

    pub fn interceptor(&self) -> &RecoveryInterceptor {
        &self.interceptor
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, SessionError> {
        let response = self.interceptor.execute(&request).await?;
        Ok(response.json()?)
    }

    // ===== Session =====

    /// Look up the signed-in user.
    pub async fn current_subject(&self) -> Result<Subject, SessionError> {
        self.fetch(ApiRequest::get(CURRENT_SUBJECT_PATH)).await
    }

    // ===== Signing =====

    /// Embed `message` into `image` and store the signed result server-side.
    pub async fn sign_image(&self, image: &ImageUpload, message: &str) -> Result<SignatureReceipt, SessionError> {
        if message.trim().is_empty() {
            return Err(ApiError::InvalidRequest("Message must not be empty".into()).into());
        }
        info!(file = %image.filename, "Signing image");
        let request = ApiRequest::post("/stego/upload-signature")
            .file_field("file", image.filename.as_str(), image.mime.as_str(), Arc::clone(&image.bytes))
            .text_field("message", message);
        self.fetch(request).await
    }

    /// Check an image for an embedded signature.
    pub async fn verify_image(&self, image: &ImageUpload) -> Result<VerificationOutcome, SessionError> {
        info!(file = %image.filename, "Verifying image");
        let request = ApiRequest::post("/stego/verify").file_field(
            "file",
            image.filename.as_str(),
            image.mime.as_str(),
            Arc::clone(&image.bytes),
        );
        self.fetch(request).await
    }

    // ===== History =====

    pub async fn fetch_signatures(&self) -> Result<Vec<SignatureRecord>, SessionError> {
        let records: Vec<SignatureRecord> = self.fetch(ApiRequest::get("/stego/signatures")).await?;
        debug!("Fetched {} signatures", records.len());
        Ok(records)
    }

    pub async fn fetch_verifications(&self) -> Result<Vec<VerificationRecord>, SessionError> {
        let records: Vec<VerificationRecord> = self.fetch(ApiRequest::get("/stego/verifications")).await?;
        debug!("Fetched {} verifications", records.len());
        Ok(records)
    }

    pub async fn download_signed_image(&self, signature_uuid: &str) -> Result<SignedImage, SessionError> {
        if signature_uuid.is_empty() || signature_uuid.contains('/') {
            return Err(ApiError::InvalidRequest(format!("Invalid signature id: {:?}", signature_uuid)).into());
        }
        self.fetch(ApiRequest::get(format!("/stego/download/{}", signature_uuid)))
            .await
    }

    // ===== Administration =====

    /// Deactivate a user account (admin only).
    pub async fn deactivate_user(&self, user_id: i64) -> Result<(), SessionError> {
        info!(user_id, "Deactivating user");
        self.interceptor
            .execute(&ApiRequest::delete(format!("/users/{}/deactivate", user_id)))
            .await?;
        Ok(())
    }
}
