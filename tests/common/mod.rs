#![allow(dead_code)]

pub mod mock_provider;

use authgate::auth::config::{AccountConfig, AloneConfig, LocalConfig, OAuthConfig};
use authgate::auth::password::hash_password;
use authgate::auth::{MemorySessionStore, SessionStore};
use authgate::build_app;
use authgate::config::Config;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use std::sync::Arc;
use tower::ServiceExt;

pub const COOKIE_NAME: &str = "authgate_session";

/// Gateway mounted at `/wiki` with the fixed account and a local account list.
/// Only `@example.org` addresses pass the authorization policy.
pub fn wiki_config() -> Config {
    let mut config = Config::default();
    config.server.base_path = "/wiki".to_string();
    config.server.base_url = "http://wiki.test".to_string();
    config.application.title = "Team Wiki".to_string();
    config.authorization.valid_matches = r".*@example\.org$".to_string();

    config.authentication.alone = AloneConfig {
        enabled: true,
        username: "admin".to_string(),
        password_hash: hash_password("admin-pw"),
        email: Some("root@elsewhere.net".to_string()),
    };
    config.authentication.local = LocalConfig {
        enabled: true,
        accounts: vec![
            AccountConfig {
                username: "jane".to_string(),
                password_hash: hash_password("jane-pw"),
                email: Some("jane@outside.com".to_string()),
            },
            AccountConfig {
                username: "bob".to_string(),
                password_hash: hash_password("bob-pw"),
                email: None,
            },
        ],
    };
    config
}

/// Point a federated method at the mock provider
pub fn with_provider(mut config: Config, provider: &mock_provider::MockProvider) -> Config {
    config.authentication.github = OAuthConfig {
        enabled: true,
        client_id: "github-client".to_string(),
        client_secret: "github-secret".to_string(),
        redirect_url: None,
        auth_url: Some(provider.url("/github/authorize")),
        token_url: Some(provider.url("/github/token")),
        userinfo_url: Some(provider.url("/github/user")),
    };
    config.authentication.google = OAuthConfig {
        enabled: true,
        client_id: "google-client".to_string(),
        client_secret: "google-secret".to_string(),
        redirect_url: None,
        auth_url: Some(provider.url("/google/authorize")),
        token_url: Some(provider.url("/google/token")),
        userinfo_url: Some(provider.url("/google/userinfo")),
    };
    config
}

/// A user-agent driving the router in-process, carrying the session cookie
pub struct TestApp {
    router: Router,
    pub sessions: Arc<MemorySessionStore>,
    cookie: Option<String>,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let sessions = Arc::new(MemorySessionStore::new(config.session.timeout_seconds));
        let router = build_app(&config, sessions.clone()).expect("app should build");
        Self {
            router,
            sessions,
            cookie: None,
        }
    }

    /// Current session cookie value, if any
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn forget_cookie(&mut self) {
        self.cookie = None;
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(serde_urlencoded::to_string(fields).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/wiki/login",
            &[("username", username), ("password", password)],
        )
        .await
    }

    async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        if let Some(value) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                format!("{}={}", COOKIE_NAME, value).parse().unwrap(),
            );
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let set_cookie = set_cookie.to_str().unwrap();
            let pair = set_cookie.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                if name.trim() == COOKIE_NAME {
                    self.cookie = (!value.is_empty()).then(|| value.to_string());
                }
            }
        }

        response
    }

    pub async fn live_sessions(&self) -> usize {
        self.sessions.purge_expired().await;
        self.sessions.len().await
    }
}

pub fn location(response: &Response<Body>) -> String {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without location")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn assert_redirect(response: &Response<Body>, expected: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), expected);
}
