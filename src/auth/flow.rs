/// Login Orchestrator
///
/// State machine behind the login routes. Every operation takes the caller's
/// [`Session`] by value and returns a [`Step`] telling the HTTP layer what to
/// do with the session and what to answer.
///
/// ```text
/// Anonymous -> Challenging -> Verifying -> Authorizing -> Authenticated
///                   ^              |              |
///                   +-- Rejected <-+              +-> Denied
/// ```
use crate::auth::error::AuthError;
use crate::auth::page::{LoginPage, Surface};
use crate::auth::policy::{AuthorizationRule, Decision, authorize};
use crate::auth::providers::{Method, Presented};
use crate::auth::registry::Registry;
use crate::auth::session::{Session, random_token};
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Anonymous,
    Challenging,
    Verifying,
    Authorizing,
    Authenticated,
    Rejected,
    Denied,
}

/// What the HTTP layer must do with the session after a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// Save under the current id
    Keep(Session),
    /// Save under a fresh id, dropping the old one
    Renew(Session),
    /// Destroy the session and clear the cookie
    Invalidate,
}

/// Response the HTTP layer must produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    Redirect(String),
    Render(LoginPage),
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub session: SessionChange,
    pub next: Next,
}

impl Step {
    fn keep(phase: Phase, session: Session, next: Next) -> Self {
        Self {
            phase,
            session: SessionChange::Keep(session),
            next,
        }
    }
}

/// Query parameters of a federated callback
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub struct Gateway {
    registry: Registry,
    rule: AuthorizationRule,
    base_path: String,
    title: String,
}

impl Gateway {
    /// `base_path` is the prefix all routes live under, e.g. `/wiki` or empty
    pub fn new(
        registry: Registry,
        rule: AuthorizationRule,
        base_path: &str,
        title: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            rule,
            base_path: base_path.trim_end_matches('/').to_string(),
            title: title.into(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Absolute path of a route below the base path
    pub fn path(&self, route: &str) -> String {
        format!("{}{}", self.base_path, route)
    }

    /// Application root the user lands on when nothing else is pending
    pub fn root(&self) -> String {
        self.path("/")
    }

    fn login_surface(&self, surface: Surface) -> String {
        match surface {
            Surface::Login => self.path("/login"),
            Surface::Ldap => self.path("/ldap/login"),
        }
    }

    /// Render a login surface, draining queued flash messages
    fn render(&self, mut session: Session, surface: Surface) -> Step {
        let page = LoginPage {
            title: self.title.clone(),
            base_path: self.base_path.clone(),
            surface,
            methods: self.registry.methods(),
            last_used: self.registry.last_used(),
            errors: session.take_flash(),
        };
        Step::keep(Phase::Challenging, session, Next::Render(page))
    }

    /// `GET /login`: remember where the user wanted to go and show the page
    pub fn enter_login(&self, mut session: Session, destination: Option<String>) -> Step {
        session.pending_destination = self.sanitize_destination(destination);
        debug!(
            "Pending destination set to {:?}",
            session.pending_destination
        );
        self.render(session, Surface::Login)
    }

    /// `GET /ldap/login`
    pub fn enter_ldap_login(&self, session: Session) -> Step {
        self.render(session, Surface::Ldap)
    }

    fn sanitize_destination(&self, destination: Option<String>) -> Option<String> {
        let destination = destination?;

        // Browsers drop tab and newlines while parsing `Location`, so
        // `/\t/host` would still leave the site
        if destination.chars().any(char::is_control) {
            warn!("Ignoring destination with control characters {:?}", destination);
            return None;
        }

        // Only same-site absolute paths; `//host` and `/\host` leave the site
        if !destination.starts_with('/')
            || destination.starts_with("//")
            || destination.starts_with("/\\")
        {
            warn!("Ignoring off-site destination {:?}", destination);
            return None;
        }

        let path = destination.split(['?', '#']).next().unwrap_or_default();
        if path == "/login" || path == self.path("/login") {
            return Some(self.root());
        }

        Some(destination)
    }

    /// `POST /login` and `POST /ldap/login`
    pub async fn submit_credentials(
        &self,
        session: Session,
        surface: Surface,
        username: String,
        password: String,
    ) -> Step {
        let candidates: Vec<Method> = match surface {
            Surface::Login => self
                .registry
                .methods()
                .into_iter()
                .filter(|m| m.uses_login_form())
                .collect(),
            Surface::Ldap => vec![Method::Ldap],
        };

        let mut last_error = AuthError::InvalidCredentials;
        for method in candidates {
            let Some(verifier) = self.registry.get(method) else {
                continue;
            };
            let presented = Presented::Password {
                username: username.clone(),
                password: password.clone(),
            };
            match verifier.verify(presented).await {
                Ok(raw) => return self.signed_in(session, method, raw),
                Err(err) => last_error = err,
            }
        }

        log_failure(&format!("{:?} login for {}", surface, username), &last_error);
        self.rejected(session, self.login_surface(surface))
    }

    /// `GET /auth/google`, `GET /auth/github`: hand the user-agent to the provider
    pub fn begin_federated(&self, mut session: Session, method: Method) -> Step {
        let consent = self
            .registry
            .get(method)
            .ok_or(AuthError::MethodNotEnabled(method))
            .and_then(|verifier| {
                if !method.is_federated() {
                    return Err(AuthError::UnsupportedMethod(method));
                }
                let state = random_token();
                let url = verifier.consent_url(&state)?;
                Ok((state, url))
            });

        match consent {
            Ok((state, url)) => {
                session.oauth_state = Some(state);
                debug!("Redirecting to {} consent page", method);
                Step::keep(Phase::Verifying, session, Next::Redirect(url))
            }
            Err(err) => {
                warn!("Cannot start {} login: {}", method, err);
                self.rejected(session, self.path("/login"))
            }
        }
    }

    /// Provider callback: correlate with the first leg and verify the code
    pub async fn complete_federated(
        &self,
        mut session: Session,
        method: Method,
        params: CallbackParams,
    ) -> Step {
        let expected_state = session.oauth_state.take();

        match self.verify_callback(method, expected_state, params).await {
            Ok(raw) => self.signed_in(session, method, raw),
            Err(err) => {
                log_failure(&format!("{} login", method), &err);
                self.rejected(session, self.path("/login"))
            }
        }
    }

    async fn verify_callback(
        &self,
        method: Method,
        expected_state: Option<String>,
        params: CallbackParams,
    ) -> Result<crate::auth::identity::RawIdentity, AuthError> {
        if let Some(error) = params.error {
            return Err(AuthError::ProviderError(error));
        }

        let (Some(expected), Some(actual)) = (expected_state, params.state) else {
            return Err(AuthError::InvalidState);
        };
        if !bool::from(expected.as_bytes().ct_eq(actual.as_bytes())) {
            return Err(AuthError::InvalidState);
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::ProviderError("missing authorization code".to_string()))?;

        let verifier = self
            .registry
            .get(method)
            .ok_or(AuthError::MethodNotEnabled(method))?;

        verifier.verify(Presented::Callback { code }).await
    }

    fn signed_in(
        &self,
        mut session: Session,
        method: Method,
        raw: crate::auth::identity::RawIdentity,
    ) -> Step {
        let identity = raw.normalize();
        info!("{} signed in using {}", identity.author_alias, method);

        self.registry.record_success(method);
        session.sign_in(identity, method);

        Step {
            phase: Phase::Authorizing,
            session: SessionChange::Renew(session),
            next: Next::Redirect(self.path("/auth/done")),
        }
    }

    fn rejected(&self, mut session: Session, back_to: String) -> Step {
        session.push_flash(AuthError::InvalidCredentials.to_string());
        Step::keep(Phase::Rejected, session, Next::Redirect(back_to))
    }

    /// `GET /auth/done`: authorization gate and final redirect
    pub fn finish(&self, mut session: Session) -> Step {
        let Some(identity) = session.identity.as_ref() else {
            return Step::keep(Phase::Anonymous, session, Next::Redirect(self.root()));
        };

        // Exemption follows this session's verifier, never the registry marker
        let method = session.method;
        let exempt = method.is_some_and(|m| self.registry.is_exempt(m));

        if authorize(identity, exempt, &self.rule) == Decision::Deny {
            warn!(
                "{} is not authorized ({})",
                identity.author_alias,
                AuthError::AuthorizationDenied
            );
            return Step {
                phase: Phase::Denied,
                session: SessionChange::Invalidate,
                next: Next::Forbidden,
            };
        }

        let destination = session.pending_destination.take().unwrap_or_else(|| {
            // Directory logins have always landed on the bare root
            if method == Some(Method::Ldap) {
                "/".to_string()
            } else {
                self.root()
            }
        });

        debug!("Authorized, redirecting to {}", destination);
        Step::keep(Phase::Authenticated, session, Next::Redirect(destination))
    }

    /// `GET /logout`
    pub fn logout(&self, session: Session) -> Step {
        if let Some(identity) = &session.identity {
            info!("{} signed out", identity.author_alias);
        }
        Step {
            phase: Phase::Anonymous,
            session: SessionChange::Invalidate,
            next: Next::Redirect(self.root()),
        }
    }
}

/// Bad credentials are routine; anything else points at the provider or setup
fn log_failure(what: &str, err: &AuthError) {
    if err.is_verification_failure() {
        warn!("Failed {}: {}", what, err);
    } else {
        error!("Failed {}: {}", what, err);
    }
}
