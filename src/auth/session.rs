// Session State
// Per user-agent state carried across the login detour, and the store that
// keeps it between requests

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::identity::Identity;
use super::providers::Method;

/// State of one user-agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Present only after a successful login
    pub identity: Option<Identity>,

    /// Verifier that produced `identity`
    pub method: Option<Method>,

    /// Originally requested path, restored after login
    pub pending_destination: Option<String>,

    /// Messages shown once on the next login page
    #[serde(default)]
    pub flash: Vec<String>,

    /// Correlates the two legs of a federated login
    pub oauth_state: Option<String>,
}

impl Session {
    pub fn push_flash(&mut self, message: impl Into<String>) {
        self.flash.push(message.into());
    }

    /// Hand out all queued messages and clear the queue
    pub fn take_flash(&mut self) -> Vec<String> {
        std::mem::take(&mut self.flash)
    }

    /// Attach a verified identity
    pub fn sign_in(&mut self, identity: Identity, method: Method) {
        self.identity = Some(identity);
        self.method = Some(method);
        self.oauth_state = None;
    }
}

/// Session id handed to the client in a cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

/// 32 random bytes, URL-safe base64 without padding
pub fn random_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

impl SessionId {
    pub fn generate() -> Self {
        Self(random_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Durable storage of sessions keyed by id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live session; expired or unknown ids yield `None`
    async fn load(&self, id: &SessionId) -> Option<Session>;

    /// Store `session` under `id`, extending its lifetime
    async fn save(&self, id: &SessionId, session: Session);

    async fn destroy(&self, id: &SessionId);

    /// Drop expired sessions, returning how many were removed
    async fn purge_expired(&self) -> usize;
}

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    expires_at: DateTime<Utc>,
}

/// In-process session store
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
    timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(timeout_seconds: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout: Duration::seconds(timeout_seconds),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Option<Session> {
        let sessions = self.sessions.read().await;
        let stored = sessions.get(id)?;
        if stored.expires_at <= Utc::now() {
            debug!("Session expired at {}", stored.expires_at);
            return None;
        }
        Some(stored.session.clone())
    }

    async fn save(&self, id: &SessionId, session: Session) {
        let stored = StoredSession {
            session,
            expires_at: Utc::now() + self.timeout,
        };
        self.sessions.write().await.insert(id.clone(), stored);
    }

    async fn destroy(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::RawIdentity;

    #[test]
    fn test_flash_is_consumed_once() {
        let mut session = Session::default();
        session.push_flash("first");
        session.push_flash("second");

        assert_eq!(session.take_flash(), vec!["first", "second"]);
        assert!(session.take_flash().is_empty());
    }

    #[test]
    fn test_sign_in_clears_oauth_state() {
        let mut session = Session {
            oauth_state: Some("state".to_string()),
            ..Default::default()
        };

        session.sign_in(RawIdentity::new("jane", None).normalize(), Method::Github);

        assert!(session.identity.is_some());
        assert_eq!(session.method, Some(Method::Github));
        assert_eq!(session.oauth_state, None);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
    }

    #[tokio::test]
    async fn test_save_load_destroy() {
        let store = MemorySessionStore::new(3600);
        let id = SessionId::generate();
        let session = Session {
            pending_destination: Some("/wiki/Page".to_string()),
            ..Default::default()
        };

        store.save(&id, session.clone()).await;
        assert_eq!(store.load(&id).await, Some(session));

        store.destroy(&id).await;
        assert_eq!(store.load(&id).await, None);
    }

    #[tokio::test]
    async fn test_expired_sessions() {
        let store = MemorySessionStore::new(0);
        let id = SessionId::generate();

        store.save(&id, Session::default()).await;
        assert_eq!(store.load(&id).await, None);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }
}
