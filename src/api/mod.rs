//! HTTP API server for MindMate

pub mod chat;
pub mod error;
pub mod health;
pub mod identity;
pub mod moods;
pub mod rate_limit;
pub mod resources;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::chat::SessionRegistry;
use crate::db::{DbPool, MoodRepo};

pub use error::ApiError;
pub use identity::CurrentUser;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub sessions: Arc<SessionRegistry>,
    pub mood_repo: MoodRepo,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    db: DbPool,
    sessions: Arc<SessionRegistry>,
    port: u16,
    rate_limit_rpm: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(db: DbPool, sessions: Arc<SessionRegistry>, port: u16) -> Self {
        Self {
            db,
            sessions,
            port,
            rate_limit_rpm: None,
        }
    }

    /// Cap the whole API at `rpm` requests per minute
    #[must_use]
    pub const fn rate_limit_rpm(mut self, rpm: Option<u32>) -> Self {
        self.rate_limit_rpm = rpm;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let mood_repo = MoodRepo::new(self.db.clone());
        let rate_limiter = self.rate_limit_rpm.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            db: self.db,
            sessions: self.sessions,
            mood_repo,
            rate_limiter,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.rate_limiter.is_some() {
            tracing::info!("API rate limiting active");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// Assemble every route around `state`
pub fn router(state: Arc<ApiState>) -> Router {
    let router = Router::new()
        .nest("/api/chat", chat::router(state.clone()))
        .nest("/api/moods", moods::router(state.clone()))
        .nest("/api/resources", resources::router())
        .merge(health::router())
        .merge(health::ready_router(state.clone()));

    let router = router.layer(axum::middleware::from_fn_with_state(
        state,
        rate_limit::rate_limit_middleware,
    ));

    // CORS layer for cross-origin requests from frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}
