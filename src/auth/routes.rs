/// Authentication Routes
///
/// HTTP handlers for the login surfaces, federated hand-offs and callbacks,
/// the `auth/done` gate and logout. Handlers only move the session between
/// the cookie, the store and the [`Gateway`]; every decision is made there.
use crate::auth::flow::{CallbackParams, Gateway, Next, SessionChange, Step};
use crate::auth::page::Surface;
use crate::auth::providers::Method;
use crate::auth::session::{Session, SessionId, SessionStore};
use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{MethodRouter, get},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Session cookie attributes
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub path: String,
}

/// Shared state of the authentication routes
#[derive(Clone)]
pub struct AuthState {
    pub gateway: Arc<Gateway>,
    pub sessions: Arc<dyn SessionStore>,
    pub cookie: CookieSettings,
}

impl AuthState {
    /// Session named by the request cookie, or a fresh one
    async fn load_session(&self, jar: &CookieJar) -> (Option<SessionId>, Session) {
        let Some(id) = jar
            .get(&self.cookie.name)
            .map(|c| SessionId::from(c.value().to_string()))
        else {
            return (None, Session::default());
        };

        match self.sessions.load(&id).await {
            Some(session) => (Some(id), session),
            None => {
                debug!("Unknown or expired session cookie");
                (None, Session::default())
            }
        }
    }

    fn session_cookie(&self, id: &SessionId) -> Cookie<'static> {
        Cookie::build((self.cookie.name.clone(), id.as_str().to_string()))
            .path(self.cookie.path.clone())
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.cookie.secure)
            .build()
    }

    /// Persist the outcome of a step and turn it into a response
    async fn apply(&self, jar: CookieJar, current: Option<SessionId>, step: Step) -> Response {
        let jar = match step.session {
            SessionChange::Keep(session) => {
                let id = current.unwrap_or_else(SessionId::generate);
                self.sessions.save(&id, session).await;
                jar.add(self.session_cookie(&id))
            }
            SessionChange::Renew(session) => {
                if let Some(old) = &current {
                    self.sessions.destroy(old).await;
                }
                let id = SessionId::generate();
                self.sessions.save(&id, session).await;
                jar.add(self.session_cookie(&id))
            }
            SessionChange::Invalidate => {
                if let Some(old) = &current {
                    self.sessions.destroy(old).await;
                }
                jar.remove(
                    Cookie::build((self.cookie.name.clone(), ""))
                        .path(self.cookie.path.clone()),
                )
            }
        };

        let response = match step.next {
            Next::Redirect(location) => Redirect::to(&location).into_response(),
            Next::Render(page) => Html(page.render()).into_response(),
            Next::Forbidden => {
                (StatusCode::FORBIDDEN, Html("<h1>Forbidden</h1>")).into_response()
            }
        };

        (jar, response).into_response()
    }
}

/// Login page parameters
#[derive(Debug, Deserialize)]
pub struct LoginParams {
    /// Path to return to after a successful login
    destination: Option<String>,
}

/// Submitted login form
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    username: String,
    password: String,
}

/// Federated callback parameters
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl From<OAuthCallbackParams> for CallbackParams {
    fn from(params: OAuthCallbackParams) -> Self {
        Self {
            code: params.code,
            state: params.state,
            error: params.error,
        }
    }
}

/// JSON answer of the status endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub author_alias: Option<String>,
    pub method: Option<Method>,
}

async fn login_page(
    State(state): State<AuthState>,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state.gateway.enter_login(session, params.destination);
    state.apply(jar, id, step).await
}

async fn login_submit(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state
        .gateway
        .submit_credentials(session, Surface::Login, form.username, form.password)
        .await;
    state.apply(jar, id, step).await
}

async fn ldap_page(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state.gateway.enter_ldap_login(session);
    state.apply(jar, id, step).await
}

async fn ldap_submit(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state
        .gateway
        .submit_credentials(session, Surface::Ldap, form.username, form.password)
        .await;
    state.apply(jar, id, step).await
}

async fn begin_federated(state: AuthState, jar: CookieJar, method: Method) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state.gateway.begin_federated(session, method);
    state.apply(jar, id, step).await
}

async fn complete_federated(
    state: AuthState,
    jar: CookieJar,
    method: Method,
    params: OAuthCallbackParams,
) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state
        .gateway
        .complete_federated(session, method, params.into())
        .await;
    state.apply(jar, id, step).await
}

fn federated_start(method: Method) -> MethodRouter<AuthState> {
    get(move |State(state): State<AuthState>, jar: CookieJar| {
        begin_federated(state, jar, method)
    })
}

fn federated_callback(method: Method) -> MethodRouter<AuthState> {
    get(
        move |State(state): State<AuthState>,
              jar: CookieJar,
              Query(params): Query<OAuthCallbackParams>| {
            complete_federated(state, jar, method, params)
        },
    )
}

async fn auth_done(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state.gateway.finish(session);
    state.apply(jar, id, step).await
}

async fn logout(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let (id, session) = state.load_session(&jar).await;
    let step = state.gateway.logout(session);
    state.apply(jar, id, step).await
}

/// Status endpoint - who the current session belongs to
async fn auth_status(State(state): State<AuthState>, jar: CookieJar) -> Json<AuthStatus> {
    let (_, session) = state.load_session(&jar).await;

    match session.identity {
        Some(identity) => Json(AuthStatus {
            authenticated: true,
            email: identity.has_email().then(|| identity.email.clone()),
            display_name: Some(identity.display_name),
            author_alias: Some(identity.author_alias),
            method: session.method,
        }),
        None => Json(AuthStatus {
            authenticated: false,
            display_name: None,
            email: None,
            author_alias: None,
            method: None,
        }),
    }
}

/// Application root: greets the signed-in user, otherwise starts a login
/// that returns here
async fn home(State(state): State<AuthState>, jar: CookieJar) -> Response {
    let (_, session) = state.load_session(&jar).await;
    let gateway = &state.gateway;

    let Some(identity) = session.identity else {
        let location = format!(
            "{}?destination={}",
            gateway.path("/login"),
            urlencoding::encode(&gateway.root())
        );
        return Redirect::to(&location).into_response();
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{title}</title></head>
<body>
    <p>Signed in as <strong>{name}</strong> ({alias})</p>
    <a href="{logout}">Log out</a>
</body>
</html>"#,
        title = encode_text(gateway.title()),
        name = encode_text(&identity.display_name),
        alias = encode_text(&identity.author_alias),
        logout = encode_double_quoted_attribute(&gateway.path("/logout")),
    ))
    .into_response()
}

/// Create the authentication router; routes of disabled methods are absent.
/// Paths are mounted below the gateway's base path.
pub fn create_auth_router(state: AuthState) -> Router {
    let gateway = Arc::clone(&state.gateway);
    let methods = gateway.registry().methods();
    let at = |route: &str| gateway.path(route);

    let mut login = get(login_page);
    if methods.iter().any(|m| m.uses_login_form()) {
        login = login.post(login_submit);
    }

    let mut router = Router::new()
        .route(&gateway.root(), get(home))
        .route(&at("/login"), login)
        .route(&at("/logout"), get(logout))
        .route(&at("/auth/done"), get(auth_done))
        .route(&at("/auth/status"), get(auth_status));

    for method in methods {
        router = match method {
            Method::Alone | Method::Local => router,
            Method::Ldap => router.route(&at("/ldap/login"), get(ldap_page).post(ldap_submit)),
            Method::Google => router
                .route(&at("/auth/google"), federated_start(Method::Google))
                .route(&at("/oauth2callback"), federated_callback(Method::Google)),
            Method::Github => router
                .route(&at("/auth/github"), federated_start(Method::Github))
                .route(
                    &at("/auth/github/callback"),
                    federated_callback(Method::Github),
                ),
        };
    }

    router.with_state(state)
}
