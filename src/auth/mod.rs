// Authentication Module
// Verifiers, the login flow that drives them, and the authorization policy
// applied to the identities they produce

pub mod config;
pub mod error;
pub mod flow;
pub mod identity;
pub mod page;
pub mod password;
pub mod policy;
pub mod providers;
pub mod registry;
pub mod routes;
pub mod session;

pub use config::{AuthenticationConfig, AuthorizationConfig};
pub use error::AuthError;
pub use flow::{Gateway, Phase};
pub use identity::{Identity, RawIdentity};
pub use policy::{AuthorizationRule, Decision, authorize};
pub use providers::{Method, Presented, Verifier};
pub use registry::Registry;
pub use routes::{AuthState, CookieSettings, create_auth_router};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
