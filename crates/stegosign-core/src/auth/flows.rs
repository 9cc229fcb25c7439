//! Sign-in and sign-out on top of the credential exchange.

use tracing::{info, warn};

use super::error::SessionError;
use super::IdentityProof;
use crate::api::ApiClient;
use crate::models::Subject;

/// Obtain a credential for `proof`, install it and cache the subject.
pub async fn sign_in(api: &ApiClient, proof: &IdentityProof) -> Result<Subject, SessionError> {
    let session = api.session();
    let credential = api
        .interceptor()
        .exchange()
        .obtain_credential(proof)
        .await
        .map_err(SessionError::SignInFailed)?;
    session.establish(credential);

    match api.current_subject().await {
        Ok(subject) => {
            session.set_subject(subject.clone());
            info!(subject_id = subject.id, "Signed in");
            Ok(subject)
        }
        Err(e) => {
            warn!(error = %e, "Signed in but profile lookup failed");
            if !matches!(e, SessionError::SessionEnded(_)) {
                session.clear();
            }
            Err(e)
        }
    }
}

/// End the session. The server call is best effort; local state is cleared
/// regardless of its outcome.
pub async fn sign_out(api: &ApiClient) {
    if let Err(e) = api.interceptor().exchange().invalidate_credential().await {
        warn!(error = %e, "Server-side sign-out failed");
    }
    api.session().clear();
    info!("Signed out");
}
