//! HTTP API over the user service and the rate resolver.
//!
//! ```text
//! /api
//! ├── /register                POST - create an account
//! ├── /login                   POST - start a session
//! ├── /logout                  POST - end the session
//! ├── /check-auth              GET  - session status
//! ├── /users                   GET  - registered users
//! └── /currency-rates          GET  - USD/EUR, latest or ?date=YYYY-MM-DD
//!     └── /all                 GET  - every currency for a date
//! ```

mod handlers;
mod session;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::rates::RateResolver;
use crate::users::{JsonFileUserStore, UserService};

pub use handlers::RateParams;
pub use session::{end_session, session_cookie, session_token, SessionStore, SESSION_COOKIE};

/// Shared state behind every handler.
pub struct AppState {
    pub users: UserService,
    pub sessions: SessionStore,
    pub rates: RateResolver,
}

impl AppState {
    pub fn new(users: UserService, rates: RateResolver) -> Self {
        Self {
            users,
            sessions: SessionStore::new(),
            rates,
        }
    }

    /// State wired to the file store under `data_dir` and the live CBR
    /// endpoints.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timezone));
        let store = JsonFileUserStore::new(&config.data_dir);

        Self::new(
            UserService::new(Arc::new(store)).with_clock(clock.clone()),
            RateResolver::from_config(&config.cbr).with_clock(clock),
        )
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/check-auth", get(handlers::check_auth))
        .route("/users", get(handlers::list_users))
        .route("/currency-rates", get(handlers::currency_rates))
        .route("/currency-rates/all", get(handlers::all_currency_rates));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &ResolvedConfig) -> Result<()> {
    let state = Arc::new(AppState::from_config(config));
    let addr = config.server.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        addr = %addr,
        data_dir = %config.data_dir.display(),
        "server listening"
    );

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}
