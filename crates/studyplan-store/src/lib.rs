//! # studyplan-store
//!
//! Storage engine for the study planner backend.
//!
//! All state lives in one JSON [`Document`] holding every student account
//! and every saved progress record. Access goes through a [`Database`]
//! handle that serializes whole-document transactions over a swappable
//! [`StoreBackend`] (a JSON file in production, memory in tests).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  StudentStore   (accounts, PBKDF2)      │
//! │  ProgressStore  (progress, study plan)  │
//! ├─────────────────────────────────────────┤
//! │  Database (mutex + spawn_blocking)      │
//! ├─────────────────────────────────────────┤
//! │  StoreBackend: JsonFileBackend | Memory │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use studyplan_store::{ProgressStore, StoreConfig, StudentStore};
//!
//! let config = StoreConfig::default();
//! let db = config.database();
//! let students = StudentStore::with_hasher(db.clone(), config.hasher());
//! let progress = ProgressStore::new(db);
//! ```

use std::path::PathBuf;

pub mod db;
pub mod error;
pub mod model;
pub mod password;
pub mod progress_store;
pub mod student_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::{Database, JsonFileBackend, MemoryBackend, StoreBackend};
pub use error::{StoreError, StoreResult};
pub use model::{Document, NewStudent, PublicStudent, StoreStats, Student, StudentData};
pub use password::PasswordHasher;
pub use progress_store::ProgressStore;
pub use student_store::StudentStore;

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Location of the JSON document.
    pub data_path: PathBuf,
    /// PBKDF2 iteration count for newly hashed passwords.
    pub hash_iterations: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/students.json"),
            hash_iterations: password::DEFAULT_ITERATIONS,
        }
    }
}

impl StoreConfig {
    /// Open the configured file store.
    pub fn database(&self) -> Database {
        Database::open(self.data_path.clone())
    }

    pub fn hasher(&self) -> PasswordHasher {
        PasswordHasher::with_iterations(self.hash_iterations)
    }
}
