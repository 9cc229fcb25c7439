//! Data models for stegosign entities.
//!
//! - `Subject`: the signed-in user profile
//! - `SignatureReceipt`, `SignatureRecord`, `SignedImage`: signing results and history
//! - `VerificationOutcome`, `VerificationRecord`: verification results and history

pub mod signature;
pub mod subject;
pub mod timestamp;
pub mod verification;

pub use signature::{SignatureReceipt, SignatureRecord, SignedImage};
pub use subject::{NewAccount, Subject};
pub use verification::{VerificationOutcome, VerificationRecord};
