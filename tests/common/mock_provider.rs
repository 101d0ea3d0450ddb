/// Mock OAuth2 provider standing in for Google and GitHub.
///
/// The token endpoints hand out `tok-{code}`; the profile endpoints map that
/// token back to a fixed user:
/// - `member`   -> octocat / octo@example.org
/// - `outsider` -> intruder / intruder@evil.test
/// - `noemail`  -> ghost without a public email
///
/// Any other code is rejected by the token endpoint.
use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Clone)]
pub struct MockProvider {
    pub port: u16,
    shutdown_tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    code: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

const KNOWN_CODES: [&str; 3] = ["member", "outsider", "noemail"];

impl MockProvider {
    /// Start a new mock provider on a random available port
    pub async fn start() -> anyhow::Result<Self> {
        let app = Router::new()
            .route("/github/token", post(github_token))
            .route("/github/user", get(github_user))
            .route("/google/token", post(google_token))
            .route("/google/userinfo", get(google_userinfo));

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock provider failed");
        });

        Ok(Self {
            port,
            shutdown_tx: Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx))),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub async fn shutdown(self) {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer tok-")
}

fn client_matches(form: &TokenForm, client_id: &str, client_secret: &str, callback: &str) -> bool {
    form.client_id == client_id
        && form.client_secret == client_secret
        && form.redirect_uri.ends_with(callback)
}

// GitHub answers token errors with 200 and an error field
async fn github_token(Form(form): Form<TokenForm>) -> Json<serde_json::Value> {
    if !client_matches(&form, "github-client", "github-secret", "/auth/github/callback")
        || !KNOWN_CODES.contains(&form.code.as_str())
    {
        return Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }));
    }

    Json(json!({
        "access_token": format!("tok-{}", form.code),
        "token_type": "bearer",
        "scope": "user:email"
    }))
}

async fn github_user(headers: HeaderMap) -> Response {
    let body = match bearer(&headers) {
        Some("member") => json!({
            "login": "octocat",
            "name": "The Octocat",
            "email": "octo@example.org"
        }),
        Some("outsider") => json!({
            "login": "intruder",
            "name": null,
            "email": "intruder@evil.test"
        }),
        Some("noemail") => json!({
            "login": "ghost",
            "name": null,
            "email": null
        }),
        _ => return StatusCode::UNAUTHORIZED.into_response(),
    };
    Json(body).into_response()
}

async fn google_token(Form(form): Form<TokenForm>) -> Response {
    if !client_matches(&form, "google-client", "google-secret", "/oauth2callback")
        || !KNOWN_CODES.contains(&form.code.as_str())
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": format!("tok-{}", form.code),
        "expires_in": 3599,
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn google_userinfo(headers: HeaderMap) -> Response {
    let body = match bearer(&headers) {
        Some("member") => json!({
            "sub": "1001",
            "name": "Jane Member",
            "email": "jane@example.org"
        }),
        Some("outsider") => json!({
            "sub": "1002",
            "name": "Eve Outsider",
            "email": "eve@evil.test"
        }),
        Some("noemail") => json!({ "sub": "1003" }),
        _ => return StatusCode::UNAUTHORIZED.into_response(),
    };
    Json(body).into_response()
}
