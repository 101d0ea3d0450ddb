/// GitHub OAuth verifier
use super::{Method, Presented, Verifier, ensure_success, http_client};
use crate::auth::config::OAuthConfig;
use crate::auth::error::AuthError;
use crate::auth::identity::{EmailRecord, RawIdentity};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct GithubTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
}

/// GitHub answers token errors with 200 and an `error` field
#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct GithubVerifier {
    config: OAuthConfig,
    redirect_uri: String,
    http_client: reqwest::Client,
}

impl GithubVerifier {
    pub fn new(config: OAuthConfig, default_redirect_uri: String) -> Result<Self, AuthError> {
        let redirect_uri = config
            .redirect_url
            .clone()
            .unwrap_or(default_redirect_uri);

        Ok(Self {
            config,
            redirect_uri,
            http_client: http_client()?,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AuthError> {
        let token_url = self.config.token_url.as_deref().unwrap_or(GITHUB_TOKEN_URL);

        let response = self
            .http_client
            .post(token_url)
            .header(ACCEPT, "application/json")
            .form(&GithubTokenRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                code,
                redirect_uri: &self.redirect_uri,
            })
            .send()
            .await?;

        let token: GithubTokenResponse = ensure_success(response, "Token request")
            .await?
            .json()
            .await?;

        match (token.access_token, token.error) {
            (Some(access_token), None) => Ok(access_token),
            (_, error) => Err(AuthError::ProviderError(format!(
                "Token request rejected: {} {}",
                error.unwrap_or_else(|| "missing access_token".to_string()),
                token.error_description.unwrap_or_default()
            ))),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GithubUser, AuthError> {
        let user_url = self.config.userinfo_url.as_deref().unwrap_or(GITHUB_USER_URL);

        let response = self
            .http_client
            .get(user_url)
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(ensure_success(response, "User request").await?.json().await?)
    }
}

#[async_trait]
impl Verifier for GithubVerifier {
    fn method(&self) -> Method {
        Method::Github
    }

    async fn verify(&self, presented: Presented) -> Result<RawIdentity, AuthError> {
        let Presented::Callback { code } = presented else {
            return Err(AuthError::InvalidCredentials);
        };

        let access_token = self.exchange_code(&code).await?;
        let user = self.fetch_user(&access_token).await?;

        Ok(RawIdentity {
            display_name: user.name,
            username: Some(user.login),
            email: None,
            emails: user
                .email
                .into_iter()
                .map(|value| EmailRecord { value })
                .collect(),
        })
    }

    fn consent_url(&self, state: &str) -> Result<String, AuthError> {
        let auth_url = self.config.auth_url.as_deref().unwrap_or(GITHUB_AUTH_URL);

        let mut url = url::Url::parse(auth_url)
            .map_err(|e| AuthError::misconfigured(Method::Github, format!("invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state);

        Ok(url.to_string())
    }
}
