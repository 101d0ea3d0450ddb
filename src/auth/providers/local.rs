/// Local account list verifier
use super::{Method, Presented, Verifier};
use crate::auth::config::AccountConfig;
use crate::auth::error::AuthError;
use crate::auth::identity::RawIdentity;
use crate::auth::password::verify_password;
use async_trait::async_trait;

pub struct LocalVerifier {
    accounts: Vec<AccountConfig>,
}

impl LocalVerifier {
    pub fn new(accounts: Vec<AccountConfig>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl Verifier for LocalVerifier {
    fn method(&self) -> Method {
        Method::Local
    }

    async fn verify(&self, presented: Presented) -> Result<RawIdentity, AuthError> {
        let Presented::Password { username, password } = presented else {
            return Err(AuthError::InvalidCredentials);
        };

        // First matching account wins
        let account = self
            .accounts
            .iter()
            .find(|account| {
                account.username.to_lowercase() == username.to_lowercase()
                    && verify_password(&password, &account.password_hash)
            })
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(RawIdentity::new(
            account.username.clone(),
            Some(account.email.clone().unwrap_or_default()),
        ))
    }
}
