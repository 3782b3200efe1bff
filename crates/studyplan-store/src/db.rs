//! Whole-document storage behind a swappable backend.
//!
//! A [`StoreBackend`] knows how to load and replace the complete
//! [`Document`]. The [`Database`] handle wraps a backend behind an
//! `Arc<Mutex<>>` and exposes async methods that use
//! `tokio::task::spawn_blocking` to avoid blocking the async runtime.
//!
//! Every mutation runs as a [`Database::transaction`]: the lock is held
//! across load, mutate and save, so writers sharing a handle never lose
//! each other's updates. Processes sharing one file are not coordinated.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::model::Document;

// ═══════════════════════════════════════════════════════════════════════
//  Backends
// ═══════════════════════════════════════════════════════════════════════

/// Load/replace access to the persisted document.
///
/// Implementations are called with the [`Database`] lock held and from the
/// blocking thread pool, so they may perform synchronous I/O.
pub trait StoreBackend: Send + 'static {
    /// Load the current document, creating an empty one if nothing is persisted.
    fn load(&mut self) -> StoreResult<Document>;

    /// Replace the persisted document.
    fn save(&mut self, doc: &Document) -> StoreResult<()>;
}

/// A single human-readable JSON file, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&mut self) -> StoreResult<Document> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "initializing empty store");
            let doc = Document::default();
            self.save(&doc)?;
            return Ok(doc);
        }

        let raw = fs::read(&self.path)?;
        let doc = serde_json::from_slice(&raw)?;
        Ok(doc)
    }

    fn save(&mut self, doc: &Document) -> StoreResult<()> {
        self.ensure_parent()?;

        // Write-then-rename: readers see either the old or the new file.
        let tmp = self.tmp_path();
        let bytes = serde_json::to_vec_pretty(doc)?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            students = doc.students.len(),
            "store written"
        );
        Ok(())
    }
}

/// An in-process document, useful for tests and throwaway servers.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    doc: Document,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_document(doc: Document) -> Self {
        Self { doc }
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&mut self) -> StoreResult<Document> {
        Ok(self.doc.clone())
    }

    fn save(&mut self, doc: &Document) -> StoreResult<()> {
        self.doc = doc.clone();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Database
// ═══════════════════════════════════════════════════════════════════════

/// Thread-safe handle to the student store.
///
/// Cloning is cheap; all clones share the same backend and lock.
#[derive(Clone)]
pub struct Database {
    backend: Arc<Mutex<Box<dyn StoreBackend>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or lazily create) a JSON file store at `path`.
    ///
    /// The file itself is created on first access.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "opening store");
        Self::with_backend(JsonFileBackend::new(path))
    }

    /// Create an in-memory store — useful for tests.
    pub fn open_in_memory() -> Self {
        debug!("opening in-memory store");
        Self::with_backend(MemoryBackend::new())
    }

    /// Wrap any backend implementation.
    pub fn with_backend(backend: impl StoreBackend) -> Self {
        let backend: Box<dyn StoreBackend> = Box::new(backend);
        Self {
            backend: Arc::new(Mutex::new(backend)),
        }
    }

    /// Load the document and run a read-only closure on the blocking pool.
    pub async fn read<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Document) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || {
            let mut backend = backend
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            let doc = backend.load()?;
            f(&doc)
        })
        .await?
    }

    /// Load, mutate and persist the document atomically with respect to
    /// other callers of this handle.
    ///
    /// The document is saved only if the closure returns `Ok`; an error
    /// leaves the persisted state untouched.
    pub async fn transaction<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Document) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || {
            let mut backend = backend
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            let mut doc = backend.load()?;
            let out = f(&mut doc)?;
            backend.save(&doc)?;
            Ok(out)
        })
        .await?
    }

    /// Load a snapshot of the full document.
    pub async fn snapshot(&self) -> StoreResult<Document> {
        self.read(|doc| Ok(doc.clone())).await
    }
}

// ── tests ────────────────────────────────────────────────────────────
