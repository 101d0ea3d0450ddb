use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub mod auth;
pub mod config;

use auth::{
    AuthError, AuthState, CookieSettings, Gateway, MemorySessionStore, Registry, SessionStore,
    create_auth_router,
};

/// How often expired sessions are swept from the in-memory store
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Builds the login gateway router on top of `sessions`.
///
/// Fails when the authorization rule does not compile or an enabled method
/// lacks required settings, so a broken method never gets routes.
pub fn build_app(
    config: &config::Config,
    sessions: Arc<dyn SessionStore>,
) -> Result<Router, AuthError> {
    let registry = Registry::from_config(&config.authentication, &config.callback_base())?;
    if registry.is_empty() {
        tracing::warn!("No authentication method is enabled; nobody can log in");
    }

    let rule = config.authorization.rule()?;
    debug!(
        "Authorization rule has {} pattern(s), empty email {}",
        rule.pattern_count(),
        if config.authorization.empty_email_matches {
            "allowed"
        } else {
            "denied"
        }
    );

    let gateway = Gateway::new(
        registry,
        rule,
        &config.server.base_path,
        config.application.title.clone(),
    );

    let state = AuthState {
        gateway: Arc::new(gateway),
        sessions,
        cookie: CookieSettings {
            name: config.session.cookie_name.clone(),
            secure: config.session.cookie_secure,
            path: config.cookie_path(),
        },
    };

    Ok(create_auth_router(state).layer(TraceLayer::new_for_http()))
}

/// Starts the server with the given configuration and runs until
/// `shutdown_rx` fires.
///
/// This function:
/// 1. Registers the enabled verifiers and builds the router
/// 2. Spawns the expired-session sweeper
/// 3. Serves on the configured address
/// 4. Drains in-flight requests on shutdown
pub async fn start_server_with_config(
    config: config::Config,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let sessions = Arc::new(MemorySessionStore::new(config.session.timeout_seconds));
    let app = build_app(&config, sessions.clone())?;

    let purge = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                debug!("Purged {} expired session(s)", removed);
            }
        }
    });

    let listener = TcpListener::bind(config.server_addr())
        .await
        .map_err(|e| anyhow::anyhow!("Cannot bind {}: {}", config.server_addr(), e))?;
    info!(
        "listening on {} (base path '{}')",
        listener.local_addr()?,
        config.server.base_path
    );

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            info!("shutdown requested, stopping server...");
        })
        .await;

    purge.abort();
    result?;
    info!("server stopped");
    Ok(())
}
