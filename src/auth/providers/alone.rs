/// Fixed single-account verifier
use super::{Method, Presented, Verifier};
use crate::auth::config::AloneConfig;
use crate::auth::error::AuthError;
use crate::auth::identity::RawIdentity;
use crate::auth::password::verify_password;
use async_trait::async_trait;

pub struct AloneVerifier {
    config: AloneConfig,
}

impl AloneVerifier {
    pub fn new(config: AloneConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Verifier for AloneVerifier {
    fn method(&self) -> Method {
        Method::Alone
    }

    async fn verify(&self, presented: Presented) -> Result<RawIdentity, AuthError> {
        let Presented::Password { username, password } = presented else {
            return Err(AuthError::InvalidCredentials);
        };

        if username.to_lowercase() != self.config.username.to_lowercase()
            || !verify_password(&password, &self.config.password_hash)
        {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(RawIdentity::new(
            self.config.username.clone(),
            Some(self.config.email.clone().unwrap_or_default()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;

    fn verifier() -> AloneVerifier {
        AloneVerifier::new(AloneConfig {
            enabled: true,
            username: "Admin".to_string(),
            password_hash: hash_password("s3cret"),
            email: Some("admin@example.com".to_string()),
        })
    }

    fn password(username: &str, password: &str) -> Presented {
        Presented::Password {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_username_is_case_insensitive() {
        let identity = verifier()
            .verify(password("ADMIN", "s3cret"))
            .await
            .unwrap();

        assert_eq!(identity.display_name.as_deref(), Some("Admin"));
        assert_eq!(identity.email.as_deref(), Some("admin@example.com"));
    }

    #[tokio::test]
    async fn test_non_ascii_username_is_case_insensitive() {
        let verifier = AloneVerifier::new(AloneConfig {
            enabled: true,
            username: "Ödön".to_string(),
            password_hash: hash_password("s3cret"),
            email: None,
        });

        let identity = verifier.verify(password("öDÖN", "s3cret")).await.unwrap();
        assert_eq!(identity.display_name.as_deref(), Some("Ödön"));
        assert_eq!(identity.email.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_wrong_password_fails() {
        let result = verifier().verify(password("admin", "S3CRET")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_wrong_username_fails() {
        let result = verifier().verify(password("root", "s3cret")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_callbacks_are_rejected() {
        let result = verifier()
            .verify(Presented::Callback {
                code: "abc".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
}
