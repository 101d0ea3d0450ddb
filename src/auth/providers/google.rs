/// Google OAuth2 verifier
///
/// First leg sends the user-agent to Google's consent page with the email and
/// profile scopes; the callback code is exchanged for an access token which
/// is used to fetch the userinfo profile.
use super::{Method, Presented, Verifier, ensure_success, http_client};
use crate::auth::config::OAuthConfig;
use crate::auth::error::AuthError;
use crate::auth::identity::{EmailRecord, RawIdentity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

pub const GOOGLE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Google userinfo response
#[derive(Debug, Deserialize)]
struct GoogleUserInfoResponse {
    #[allow(dead_code)]
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct GoogleTokenRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

pub struct GoogleVerifier {
    config: OAuthConfig,
    redirect_uri: String,
    http_client: reqwest::Client,
}

impl GoogleVerifier {
    /// `default_redirect_uri` is used unless the configuration names one
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
        let token_url = self.config.token_url.as_deref().unwrap_or(GOOGLE_TOKEN_URL);

        let response = self
            .http_client
            .post(token_url)
            .form(&GoogleTokenRequest {
                code,
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                redirect_uri: &self.redirect_uri,
                grant_type: "authorization_code",
            })
            .send()
            .await?;

        let token: GoogleTokenResponse = ensure_success(response, "Token request")
            .await?
            .json()
            .await?;

        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleUserInfoResponse, AuthError> {
        let userinfo_url = self
            .config
            .userinfo_url
            .as_deref()
            .unwrap_or(GOOGLE_USERINFO_URL);

        let response = self
            .http_client
            .get(userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        Ok(ensure_success(response, "UserInfo request")
            .await?
            .json()
            .await?)
    }
}

#[async_trait]
impl Verifier for GoogleVerifier {
    fn method(&self) -> Method {
        Method::Google
    }

    async fn verify(&self, presented: Presented) -> Result<RawIdentity, AuthError> {
        let Presented::Callback { code } = presented else {
            return Err(AuthError::InvalidCredentials);
        };

        let access_token = self.exchange_code(&code).await?;
        let profile = self.fetch_profile(&access_token).await?;

        Ok(RawIdentity {
            display_name: profile.name,
            username: None,
            email: None,
            emails: profile
                .email
                .into_iter()
                .map(|value| EmailRecord { value })
                .collect(),
        })
    }

    fn consent_url(&self, state: &str) -> Result<String, AuthError> {
        let auth_url = self.config.auth_url.as_deref().unwrap_or(GOOGLE_AUTH_URL);

        let mut url = url::Url::parse(auth_url)
            .map_err(|e| AuthError::misconfigured(Method::Google, format!("invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &GOOGLE_SCOPES.join(" "))
            .append_pair("state", state);

        Ok(url.to_string())
    }
}
