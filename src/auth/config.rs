// Authentication Configuration
// Per-method verifier settings and the authorization allow-list

use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::policy::AuthorizationRule;
use super::providers::Method;

/// Settings for every supported authentication method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    #[serde(default)]
    pub alone: AloneConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub google: OAuthConfig,

    #[serde(default)]
    pub github: OAuthConfig,
}

impl AuthenticationConfig {
    /// Methods switched on in configuration, in registration order
    pub fn enabled_methods(&self) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|method| self.is_enabled(*method))
            .collect()
    }

    pub fn is_enabled(&self, method: Method) -> bool {
        match method {
            Method::Alone => self.alone.enabled,
            Method::Local => self.local.enabled,
            Method::Ldap => self.ldap.enabled,
            Method::Google => self.google.enabled,
            Method::Github => self.github.enabled,
        }
    }

    /// Check every enabled method for the settings it cannot run without
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.alone.enabled {
            self.alone.validate()?;
        }
        if self.local.enabled {
            self.local.validate()?;
        }
        if self.ldap.enabled {
            self.ldap.validate()?;
        }
        if self.google.enabled {
            self.google.validate(Method::Google)?;
        }
        if self.github.enabled {
            self.github.validate(Method::Github)?;
        }
        Ok(())
    }
}

/// Fixed single administrator account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AloneConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub username: String,

    /// Hex SHA-256 of the password (see `authgate hash-password`)
    #[serde(default)]
    pub password_hash: String,

    #[serde(default)]
    pub email: Option<String>,
}

impl AloneConfig {
    fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::misconfigured(
                Method::Alone,
                "username cannot be empty",
            ));
        }
        validate_hash(Method::Alone, &self.password_hash)
    }
}

/// List of locally provisioned accounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl LocalConfig {
    fn validate(&self) -> Result<(), AuthError> {
        if self.accounts.is_empty() {
            return Err(AuthError::misconfigured(
                Method::Local,
                "at least one account is required",
            ));
        }
        for account in &self.accounts {
            if account.username.trim().is_empty() {
                return Err(AuthError::misconfigured(
                    Method::Local,
                    "account username cannot be empty",
                ));
            }
            validate_hash(Method::Local, &account.password_hash)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Directory bind settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapConfig {
    #[serde(default)]
    pub enabled: bool,

    /// e.g. `ldap://ldap.example.com:389`
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub bind_dn: Option<String>,

    #[serde(default)]
    pub bind_credentials: Option<String>,

    /// e.g. `ou=people,dc=example,dc=com`
    #[serde(default)]
    pub search_base: String,

    /// Filter with a `{{username}}` placeholder, e.g. `(uid={{username}})`
    #[serde(default)]
    pub search_filter: String,
}

impl LdapConfig {
    fn validate(&self) -> Result<(), AuthError> {
        if !self.url.starts_with("ldap://") && !self.url.starts_with("ldaps://") {
            return Err(AuthError::misconfigured(
                Method::Ldap,
                "url must start with ldap:// or ldaps://",
            ));
        }
        if self.search_base.trim().is_empty() {
            return Err(AuthError::misconfigured(
                Method::Ldap,
                "search_base cannot be empty",
            ));
        }
        if !self.search_filter.contains("{{username}}") {
            return Err(AuthError::misconfigured(
                Method::Ldap,
                "search_filter must contain {{username}}",
            ));
        }
        if self.bind_dn.is_some() != self.bind_credentials.is_some() {
            return Err(AuthError::misconfigured(
                Method::Ldap,
                "bind_dn and bind_credentials must be set together",
            ));
        }
        Ok(())
    }
}

/// Federated login through an OAuth2 provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Callback URL registered with the provider; derived from
    /// `server.base_url` when absent
    #[serde(default)]
    pub redirect_url: Option<String>,

    /// Endpoint overrides, mostly useful against a test provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_url: Option<String>,
}

impl OAuthConfig {
    fn validate(&self, method: Method) -> Result<(), AuthError> {
        if self.client_id.is_empty() {
            return Err(AuthError::misconfigured(method, "client_id cannot be empty"));
        }

        if self.client_secret.is_empty() {
            return Err(AuthError::misconfigured(
                method,
                "client_secret cannot be empty",
            ));
        }

        if let Some(redirect_url) = &self.redirect_url {
            url::Url::parse(redirect_url).map_err(|e| {
                AuthError::misconfigured(method, format!("invalid redirect_url: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Allow-list for identities produced by non-exempt methods
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Comma-separated, case-insensitive regular expressions
    #[serde(default)]
    pub valid_matches: String,

    #[serde(default)]
    pub empty_email_matches: bool,
}

impl AuthorizationConfig {
    pub fn rule(&self) -> Result<AuthorizationRule, AuthError> {
        AuthorizationRule::new(&self.valid_matches, self.empty_email_matches)
    }
}

fn validate_hash(method: Method, hash: &str) -> Result<(), AuthError> {
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AuthError::misconfigured(
            method,
            "password_hash must be a 64 character hex SHA-256 digest",
        ));
    }
    Ok(())
}
