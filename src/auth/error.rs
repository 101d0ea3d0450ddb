// Authentication Error Types
// Failures of verification, authorization and provider configuration

use thiserror::Error;

use super::providers::Method;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Identity is not authorized to access this application")]
    AuthorizationDenied,

    // Federated provider errors
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid or missing federated login state")]
    InvalidState,

    #[error("Authentication method {0} does not support this operation")]
    UnsupportedMethod(Method),

    #[error("Authentication method {0} is not enabled")]
    MethodNotEnabled(Method),

    // Configuration errors
    #[error("Authentication method {method} is misconfigured: {reason}")]
    MisconfiguredProvider { method: Method, reason: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Provider communication timeout")]
    Timeout,
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::ProviderError(err.to_string())
        }
    }
}

impl AuthError {
    pub fn misconfigured(method: Method, reason: impl Into<String>) -> Self {
        AuthError::MisconfiguredProvider {
            method,
            reason: reason.into(),
        }
    }

    /// Whether the failure ends up as a plain "try again" on the login surface.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidState
                | AuthError::ProviderError(_)
                | AuthError::Timeout
        )
    }
}
