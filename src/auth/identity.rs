/// Identity Normalization
///
/// Every verifier hands back a [`RawIdentity`] in whatever shape its backend
/// produces. Before anything is stored in the session the raw record is
/// collapsed into an [`Identity`] with a display name, an email (or the
/// [`UNKNOWN_EMAIL`] sentinel) and the derived author alias.
use serde::{Deserialize, Serialize};

/// Placeholder stored when no email could be determined; not an address, so
/// [`Identity::has_email`] is false for it.
pub const UNKNOWN_EMAIL: &str = "nobody";

/// A single email record as returned by federated profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub value: String,
}

/// Identity as returned by a verifier, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIdentity {
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub emails: Vec<EmailRecord>,
}

/// Normalized identity attached to an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    pub email: String,
    pub author_alias: String,
}

impl Identity {
    /// Whether the identity carries a real email rather than the sentinel.
    pub fn has_email(&self) -> bool {
        !self.email.is_empty() && self.email != UNKNOWN_EMAIL
    }
}

impl RawIdentity {
    pub fn new(display_name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            email,
            ..Default::default()
        }
    }

    /// Collapse the raw record into an [`Identity`].
    pub fn normalize(self) -> Identity {
        let RawIdentity {
            display_name,
            username,
            email,
            emails,
        } = self;

        let email = emails
            .into_iter()
            .next()
            .map(|record| record.value)
            .or(email)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());

        let display_name = non_empty(display_name)
            .or_else(|| non_empty(username))
            .unwrap_or_else(|| email.clone());

        let author_alias = format!("{} <{}>", display_name, email);

        Identity {
            display_name,
            email,
            author_alias,
        }
    }
}

impl From<Identity> for RawIdentity {
    fn from(identity: Identity) -> Self {
        Self {
            display_name: Some(identity.display_name),
            username: None,
            email: Some(identity.email),
            emails: Vec::new(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
