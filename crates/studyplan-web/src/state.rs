//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers. Both services share one [`Database`] handle, so their
//! transactions are serialized against each other.

use studyplan_store::{Database, PasswordHasher, ProgressStore, StudentStore};

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Account operations.
    pub students: StudentStore,

    /// Progress and study-plan operations.
    pub progress: ProgressStore,

    /// Web server configuration.
    pub config: WebConfig,
}

impl AppState {
    pub fn new(db: Database, hasher: PasswordHasher, config: WebConfig) -> Self {
        Self {
            students: StudentStore::with_hasher(db.clone(), hasher),
            progress: ProgressStore::new(db),
            config,
        }
    }
}
