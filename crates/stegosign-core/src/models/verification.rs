use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of checking an image for an embedded signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub signature_uuid: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, with = "super::timestamp::optional")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// One entry of the "my verifications" history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: i64,
    #[serde(default)]
    pub signature_uuid: Option<String>,
    #[serde(default)]
    pub image_id: Option<i64>,
    pub verifier_id: i64,
    pub verified: bool,
    #[serde(with = "super::timestamp::required")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub extracted_payload: Option<String>,
}
