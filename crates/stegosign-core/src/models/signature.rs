//! Signing results and the signed-image download payload.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of embedding a message into an uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureReceipt {
    pub signature_uuid: String,
    pub image_id: i64,
    pub file_path: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// One entry of the "my signatures" history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub id: i64,
    pub signature_uuid: String,
    pub image_id: i64,
    pub signer_id: i64,
    #[serde(with = "super::timestamp::required")]
    pub signed_at: DateTime<Utc>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Signed image as returned by the download endpoint (base64 encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct SignedImage {
    pub filename: String,
    pub media_type: String,
    base64_data: String,
}

impl SignedImage {
    /// Decode the image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.base64_data.trim())
    }
}
