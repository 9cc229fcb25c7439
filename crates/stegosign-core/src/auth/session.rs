use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use super::Credential;
use crate::models::Subject;

/// Buffer size for the session event channel.
/// Subscribers only care about the latest transitions, 16 leaves headroom.
const EVENT_BUFFER_SIZE: usize = 16;

/// Transitions published to anyone watching the session (UI, guards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was obtained through an explicit sign-in
    SignedIn,
    /// The credential was replaced by a silent renewal
    Renewed,
    /// All session state was cleared (logout or forced logout)
    Ended,
}

#[derive(Debug, Default)]
struct SessionData {
    credential: Option<Credential>,
    subject: Option<Subject>,
    /// Bumped on every credential write or clear
    generation: u64,
}

/// Shared in-memory session state.
///
/// Clones are handles onto the same state: a write through one is visible to
/// every other holder immediately. Nothing here touches disk; the credential
/// lives only as long as the process.
#[derive(Clone)]
pub struct SessionStore {
    data: Arc<RwLock<SessionData>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            data: Arc::new(RwLock::new(SessionData::default())),
            events,
        }
    }

    /// Install a credential from an explicit sign-in. Any cached subject
    /// belongs to the previous identity and is dropped.
    pub fn establish(&self, credential: Credential) {
        {
            let mut data = self.data.write();
            data.credential = Some(credential);
            data.subject = None;
            data.generation += 1;
        }
        debug!("Session established");
        self.publish(SessionEvent::SignedIn);
    }

    /// Swap in a renewed credential, keeping the cached subject until it is
    /// refreshed.
    pub fn replace_credential(&self, credential: Credential) {
        {
            let mut data = self.data.write();
            data.credential = Some(credential);
            data.generation += 1;
        }
        debug!("Session credential renewed");
        self.publish(SessionEvent::Renewed);
    }

    pub fn set_subject(&self, subject: Subject) {
        self.data.write().subject = Some(subject);
    }

    /// Clear credential and subject together.
    pub fn clear(&self) {
        {
            let mut data = self.data.write();
            data.credential = None;
            data.subject = None;
            data.generation += 1;
        }
        debug!("Session cleared");
        self.publish(SessionEvent::Ended);
    }

    pub fn credential(&self) -> Option<Credential> {
        self.data.read().credential.clone()
    }

    pub fn subject(&self) -> Option<Subject> {
        self.data.read().subject.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.read().credential.is_some()
    }

    /// `"<kind> <token>"` for the current credential, computed on every call.
    pub fn authorization_header(&self) -> Option<String> {
        self.data
            .read()
            .credential
            .as_ref()
            .map(Credential::header_value)
    }

    pub fn generation(&self) -> u64 {
        self.data.read().generation
    }

    /// Header and generation read under a single lock.
    pub(crate) fn stamp(&self) -> (Option<String>, u64) {
        let data = self.data.read();
        (
            data.credential.as_ref().map(Credential::header_value),
            data.generation,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Subject {
        Subject {
            id: 1,
            firstname: "Alice".into(),
            lastname: String::new(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            created_at: None,
        }
    }

    #[test]
    fn test_empty_store_has_no_header() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated());
        assert_eq!(store.authorization_header(), None);
        assert_eq!(store.subject(), None);
    }

    #[test]
    fn test_header_tracks_credential() {
        let store = SessionStore::new();

        store.establish(Credential::new("abc", "bearer"));
        assert!(store.is_authenticated());
        assert_eq!(store.authorization_header().as_deref(), Some("bearer abc"));

        store.replace_credential(Credential::new("xyz", "bearer"));
        assert_eq!(store.authorization_header().as_deref(), Some("bearer xyz"));

        store.clear();
        assert!(!store.is_authenticated());
        assert_eq!(store.authorization_header(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();

        store.establish(Credential::bearer("abc"));
        assert_eq!(other.authorization_header().as_deref(), Some("bearer abc"));

        other.clear();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clear_drops_subject_and_credential() {
        let store = SessionStore::new();
        store.establish(Credential::bearer("abc"));
        store.set_subject(alice());

        store.clear();
        assert_eq!(store.credential(), None);
        assert_eq!(store.subject(), None);
    }

    #[test]
    fn test_establish_drops_previous_subject() {
        let store = SessionStore::new();
        store.establish(Credential::bearer("abc"));
        store.set_subject(alice());

        store.establish(Credential::bearer("def"));
        assert_eq!(store.subject(), None);
    }

    #[test]
    fn test_renewal_keeps_subject() {
        let store = SessionStore::new();
        store.establish(Credential::bearer("abc"));
        store.set_subject(alice());

        store.replace_credential(Credential::bearer("xyz"));
        assert_eq!(store.subject(), Some(alice()));
    }

    #[test]
    fn test_generation_advances_on_credential_writes() {
        let store = SessionStore::new();
        let start = store.generation();

        store.establish(Credential::bearer("abc"));
        store.set_subject(alice());
        assert_eq!(store.generation(), start + 1);

        store.clear();
        assert_eq!(store.generation(), start + 2);

        let (header, generation) = store.stamp();
        assert_eq!(header, None);
        assert_eq!(generation, start + 2);
    }

    #[test]
    fn test_events_published_in_order() {
        let store = SessionStore::new();
        let mut events = store.subscribe();

        store.establish(Credential::bearer("abc"));
        store.replace_credential(Credential::bearer("xyz"));
        store.clear();

        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Renewed);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
        assert!(events.try_recv().is_err());
    }
}
