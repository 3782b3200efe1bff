//! Student accounts: registration, lookup and credential checks.
//!
//! Passwords are hashed with [`PasswordHasher`] on the blocking pool before
//! the store lock is taken. The duplicate-username check and the insert run
//! in one [`Database::transaction`], so two concurrent registrations of the
//! same name cannot both succeed.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::model::{NewStudent, Student, now_millis};
use crate::password::PasswordHasher;

// ═══════════════════════════════════════════════════════════════════════
//  Id generation
// ═══════════════════════════════════════════════════════════════════════

/// Last id handed out in this process, in epoch milliseconds.
static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Wall-clock millisecond id, bumped past the previous one when the clock
/// has not advanced.
fn next_student_id() -> String {
    let now = Utc::now().timestamp_millis();
    let prev = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(prev + 1).to_string()
}

// ═══════════════════════════════════════════════════════════════════════
//  StudentStore
// ═══════════════════════════════════════════════════════════════════════

/// Account operations on the student collection.
#[derive(Clone)]
pub struct StudentStore {
    db: Database,
    hasher: PasswordHasher,
}

impl StudentStore {
    /// Create a student store backed by `db` with the default work factor.
    pub fn new(db: Database) -> Self {
        Self::with_hasher(db, PasswordHasher::default())
    }

    pub fn with_hasher(db: Database, hasher: PasswordHasher) -> Self {
        Self { db, hasher }
    }

    /// Register a new student.
    ///
    /// Fails with [`StoreError::InvalidArgument`] if username or password is
    /// empty and with [`StoreError::DuplicateUsername`] if the name is taken.
    #[instrument(skip(self, new), fields(username = %new.username))]
    pub async fn create_student(&self, new: NewStudent) -> StoreResult<Student> {
        if new.username.is_empty() {
            return Err(StoreError::InvalidArgument(
                "username must not be empty".into(),
            ));
        }
        if new.password.is_empty() {
            return Err(StoreError::InvalidArgument(
                "password must not be empty".into(),
            ));
        }

        // Cheap early exit before paying for the hash. The authoritative
        // check happens again inside the transaction.
        if self.find_student_by_username(&new.username).await?.is_some() {
            return Err(StoreError::DuplicateUsername(new.username));
        }

        let hasher = self.hasher;
        let NewStudent {
            username,
            password,
            email,
            full_name,
        } = new;
        let password_hash =
            tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

        let student = self
            .db
            .transaction(move |doc| {
                if doc.student_by_username(&username).is_some() {
                    return Err(StoreError::DuplicateUsername(username));
                }
                let student = Student {
                    id: next_student_id(),
                    username,
                    password_hash,
                    email,
                    full_name,
                    created_at: now_millis(),
                };
                doc.students.push(student.clone());
                Ok(student)
            })
            .await?;

        debug!(student_id = %student.id, "student created");
        Ok(student)
    }

    /// Exact, case-sensitive lookup by username.
    #[instrument(skip(self))]
    pub async fn find_student_by_username(&self, username: &str) -> StoreResult<Option<Student>> {
        let username = username.to_string();
        self.db
            .read(move |doc| Ok(doc.student_by_username(&username).cloned()))
            .await
    }

    /// Lookup by id.
    #[instrument(skip(self))]
    pub async fn find_student_by_id(&self, id: &str) -> StoreResult<Option<Student>> {
        let id = id.to_string();
        self.db
            .read(move |doc| Ok(doc.student_by_id(&id).cloned()))
            .await
    }

    /// Lookup by id, failing with [`StoreError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn require_student(&self, id: &str) -> StoreResult<Student> {
        self.find_student_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "student",
                id: id.to_string(),
            })
    }

    /// Check a plaintext password against a stored hash.
    #[instrument(skip_all)]
    pub async fn verify_password(&self, password: &str, hash: &str) -> StoreResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let valid =
            tokio::task::spawn_blocking(move || PasswordHasher::verify(&password, &hash)).await?;
        Ok(valid)
    }

    /// Look up a student and verify the password.
    ///
    /// Returns `None` both for unknown usernames and for wrong passwords.
    /// An unknown username still costs one full key derivation.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> StoreResult<Option<Student>> {
        let student = self.find_student_by_username(username).await?;
        let password = password.to_string();

        let Some(student) = student else {
            let hasher = self.hasher;
            tokio::task::spawn_blocking(move || hasher.verify_nothing(&password)).await?;
            debug!("authentication failed: unknown username");
            return Ok(None);
        };

        if self.verify_password(&password, &student.password_hash).await? {
            debug!(student_id = %student.id, "authenticated");
            Ok(Some(student))
        } else {
            debug!(student_id = %student.id, "authentication failed: wrong password");
            Ok(None)
        }
    }

    /// All students in creation order.
    #[instrument(skip(self))]
    pub async fn list_students(&self) -> StoreResult<Vec<Student>> {
        self.db.read(|doc| Ok(doc.students.clone())).await
    }
}

// ── tests ────────────────────────────────────────────────────────────
