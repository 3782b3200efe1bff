//! Web server setup and startup.
//!
//! [`router`] composes the Axum routes with a permissive CORS layer and
//! [`WebServer`] binds the listener.

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::WebConfig;
use crate::api;
use crate::state::AppState;

/// Build the application router.
///
/// Each endpoint is reachable both at the root (`/login`) and under
/// `/api` (`/api/login`).
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers(Any);

    let routes: Router<Arc<AppState>> = Router::new()
        .route(
            "/register",
            post(api::register)
                .options(api::options)
                .fallback(api::post_only),
        )
        .route(
            "/login",
            post(api::login)
                .options(api::options)
                .fallback(api::post_only),
        )
        .route(
            "/save-data",
            post(api::save_data)
                .options(api::options)
                .fallback(api::post_only),
        )
        .route(
            "/status",
            get(api::status)
                .options(api::options)
                .fallback(api::get_only),
        );

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .fallback(api::not_found)
        .layer(cors)
        .with_state(state)
}

/// The study planner HTTP server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self {
            config: state.config.clone(),
            state: Arc::new(state),
        }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Start the server and block until it is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(self) -> std::io::Result<()> {
        let addr = self.addr();
        let router = router(self.state);

        tracing::info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
