/// Credential Verifiers
///
/// This module provides the [`Verifier`] trait shared by every authentication
/// method and the implementations for the supported methods: a fixed single
/// account, a local account list, directory bind (LDAP) and the Google and
/// GitHub federated logins.
use crate::auth::config::AuthenticationConfig;
use crate::auth::error::AuthError;
use crate::auth::identity::RawIdentity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod alone;
pub mod github;
pub mod google;
pub mod ldap;
pub mod local;

/// Supported authentication methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Alone,
    Local,
    Ldap,
    Google,
    Github,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Alone,
        Method::Local,
        Method::Ldap,
        Method::Google,
        Method::Github,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Alone => "alone",
            Method::Local => "local",
            Method::Ldap => "ldap",
            Method::Google => "google",
            Method::Github => "github",
        }
    }

    /// Administrator-provisioned accounts skip the authorization policy
    pub fn is_exempt(self) -> bool {
        matches!(self, Method::Alone | Method::Local)
    }

    /// Methods that hand the user-agent to an external consent page
    pub fn is_federated(self) -> bool {
        matches!(self, Method::Google | Method::Github)
    }

    /// Methods verified through the shared username/password form
    pub fn uses_login_form(self) -> bool {
        matches!(self, Method::Alone | Method::Local)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the user-agent presented to a verifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presented {
    Password { username: String, password: String },
    Callback { code: String },
}

/// Single capability implemented by every authentication method
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Verifier: Send + Sync {
    fn method(&self) -> Method;

    /// Check what the user-agent presented and return the identity it proves
    async fn verify(&self, presented: Presented) -> Result<RawIdentity, AuthError>;

    /// Consent page of a federated provider, carrying `state` for the callback
    fn consent_url(&self, state: &str) -> Result<String, AuthError> {
        let _ = state;
        Err(AuthError::UnsupportedMethod(self.method()))
    }
}

/// Builds verifiers from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the verifier for `method`
    ///
    /// `callback_base` is the externally visible URL of the gateway including
    /// its base path; federated callbacks default to paths below it.
    pub fn create_verifier(
        method: Method,
        config: &AuthenticationConfig,
        callback_base: &str,
    ) -> Result<Arc<dyn Verifier>, AuthError> {
        let callback_base = callback_base.trim_end_matches('/');

        let verifier: Arc<dyn Verifier> = match method {
            Method::Alone => Arc::new(alone::AloneVerifier::new(config.alone.clone())),
            Method::Local => Arc::new(local::LocalVerifier::new(config.local.accounts.clone())),
            Method::Ldap => Arc::new(ldap::LdapVerifier::new(config.ldap.clone())),
            Method::Google => Arc::new(google::GoogleVerifier::new(
                config.google.clone(),
                format!("{}/oauth2callback", callback_base),
            )?),
            Method::Github => Arc::new(github::GithubVerifier::new(
                config.github.clone(),
                format!("{}/auth/github/callback", callback_base),
            )?),
        };

        Ok(verifier)
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent(concat!("authgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AuthError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success provider response into an error carrying its body
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, AuthError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(AuthError::ProviderError(format!(
        "{} failed with status {}: {}",
        what, status, error_text
    )))
}
