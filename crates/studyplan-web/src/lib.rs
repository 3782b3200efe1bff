//! HTTP interface for the study planner backend.
//!
//! Exposes four JSON endpoints backed by `studyplan-store`:
//!
//! - `POST /register` — create a student account.
//! - `POST /login` — verify credentials and return saved progress.
//! - `POST /save-data` — replace a student's progress and study plan.
//! - `GET /status` — liveness plus store statistics.
//!
//! Every route is also mounted under `/api/`.

pub mod api;
pub mod error;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{WebServer, router};
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
        }
    }
}
