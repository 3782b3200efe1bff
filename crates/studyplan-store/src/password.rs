//! Password hashing via PBKDF2-HMAC-SHA256 (ring).
//!
//! Hashes are stored as `iterations:base64(salt):base64(hash)`. Keeping the
//! iteration count in the stored string lets the work factor change without
//! invalidating existing accounts.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// PBKDF2-HMAC-SHA256 with 600,000 iterations (OWASP 2023).
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Salt length in bytes.
const SALT_LEN: usize = 32;

/// Derived key length in bytes.
const KEY_LEN: usize = 32;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Salted one-way password hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::with_iterations(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    /// Use a custom iteration count. Zero is clamped to one.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations.get()
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> StoreResult<String> {
        let rng = SystemRandom::new();

        let mut salt = [0u8; SALT_LEN];
        rng.fill(&mut salt)
            .map_err(|_| StoreError::Crypto("failed to generate random salt".into()))?;

        let mut hash = [0u8; KEY_LEN];
        pbkdf2::derive(
            PBKDF2_ALG,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{}:{}:{}",
            self.iterations,
            BASE64.encode(salt),
            BASE64.encode(hash)
        ))
    }

    /// Verify a password against a stored hash string.
    ///
    /// PBKDF2 hashes are checked with ring's constant-time verify, using the
    /// iteration count from the stored string rather than `self`. bcrypt
    /// hashes (`$2a$`, `$2b$`, `$2y$`) written by earlier deployments are
    /// checked with the `bcrypt` crate. A hash in neither format never
    /// matches.
    pub fn verify(password: &str, stored: &str) -> bool {
        if is_bcrypt(stored) {
            return match bcrypt::verify(password, stored) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!(error = %e, "unreadable bcrypt hash, treating as mismatch");
                    false
                }
            };
        }

        match parse_pbkdf2(stored) {
            Ok((iterations, salt, expected)) => pbkdf2::verify(
                PBKDF2_ALG,
                iterations,
                &salt,
                password.as_bytes(),
                &expected,
            )
            .is_ok(),
            Err(e) => {
                warn!(error = %e, "unreadable password hash, treating as mismatch");
                false
            }
        }
    }

    /// Spend the same effort as a real verification, then fail.
    ///
    /// Used when the account does not exist so response timing matches a
    /// wrong-password attempt.
    pub fn verify_nothing(&self, password: &str) {
        let mut sink = [0u8; KEY_LEN];
        pbkdf2::derive(
            PBKDF2_ALG,
            self.iterations,
            &[0u8; SALT_LEN],
            password.as_bytes(),
            &mut sink,
        );
    }
}

fn is_bcrypt(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| stored.starts_with(prefix))
}

/// Split `iterations:base64(salt):base64(hash)`.
fn parse_pbkdf2(stored: &str) -> StoreResult<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = stored.splitn(3, ':');
    let (Some(iterations), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(StoreError::Crypto("malformed password hash".into()));
    };

    let iterations = iterations
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| StoreError::Crypto("invalid iteration count".into()))?;
    let salt = BASE64
        .decode(salt)
        .map_err(|e| StoreError::Crypto(format!("invalid salt encoding: {e}")))?;
    let expected = BASE64
        .decode(expected)
        .map_err(|e| StoreError::Crypto(format!("invalid hash encoding: {e}")))?;

    Ok((iterations, salt, expected))
}

// ── tests ────────────────────────────────────────────────────────────
