/// Directory-bind verifier
///
/// Looks the user up with the service account, then binds as the found entry
/// with the submitted password.
use super::{Method, Presented, Verifier};
use crate::auth::config::LdapConfig;
use crate::auth::error::AuthError;
use crate::auth::identity::RawIdentity;
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapError, Scope, SearchEntry, ldap_escape};
use tracing::{debug, error};

const ATTRIBUTES: [&str; 4] = ["displayName", "cn", "uid", "mail"];

/// LDAP result code for invalid credentials
const RC_INVALID_CREDENTIALS: u32 = 49;

pub struct LdapVerifier {
    config: LdapConfig,
}

impl LdapVerifier {
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }

    /// Search filter with the escaped username substituted
    pub fn search_filter(&self, username: &str) -> String {
        self.config
            .search_filter
            .replace("{{username}}", &ldap_escape(username))
    }

    async fn bind(&self, username: &str, password: &str) -> Result<Option<RawIdentity>, LdapError> {
        let (conn, mut ldap) = LdapConnAsync::new(&self.config.url).await?;
        ldap3::drive!(conn);

        if let (Some(bind_dn), Some(bind_credentials)) =
            (&self.config.bind_dn, &self.config.bind_credentials)
        {
            ldap.simple_bind(bind_dn, bind_credentials).await?.success()?;
        }

        let (mut entries, _res) = ldap
            .search(
                &self.config.search_base,
                Scope::Subtree,
                &self.search_filter(username),
                ATTRIBUTES.to_vec(),
            )
            .await?
            .success()?;

        if entries.len() != 1 {
            debug!("LDAP search for {} returned {} entries", username, entries.len());
            let _ = ldap.unbind().await;
            return Ok(None);
        }
        let entry = match entries.pop() {
            Some(entry) => SearchEntry::construct(entry),
            None => return Ok(None),
        };

        let res = ldap.simple_bind(&entry.dn, password).await?;
        let _ = ldap.unbind().await;
        if res.rc == RC_INVALID_CREDENTIALS {
            return Ok(None);
        }
        res.success()?;

        Ok(Some(identity_from_entry(&entry)))
    }
}

fn first_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry.attrs.get(name).and_then(|values| values.first()).cloned()
}

fn identity_from_entry(entry: &SearchEntry) -> RawIdentity {
    RawIdentity {
        display_name: first_attr(entry, "displayName").or_else(|| first_attr(entry, "cn")),
        username: first_attr(entry, "uid"),
        email: first_attr(entry, "mail"),
        emails: Vec::new(),
    }
}

#[async_trait]
impl Verifier for LdapVerifier {
    fn method(&self) -> Method {
        Method::Ldap
    }

    async fn verify(&self, presented: Presented) -> Result<RawIdentity, AuthError> {
        let Presented::Password { username, password } = presented else {
            return Err(AuthError::InvalidCredentials);
        };

        // An empty password would turn into an unauthenticated bind
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        match self.bind(&username, &password).await {
            Ok(Some(identity)) => Ok(identity),
            Ok(None) => Err(AuthError::InvalidCredentials),
            Err(err) => {
                error!("Cannot authenticate user using LDAP: {:?}", err);
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}
