//! Revoked-token storage with per-key expiry.
//!
//! Logout inserts a `bl_<token>` key whose TTL equals the seconds left until
//! the token's natural expiry, so a record never outlives the token it
//! revokes. The store is an abstraction: production uses the SQLite-backed
//! implementation, unit tests use the in-memory clock-driven one.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix for revocation keys.
pub const REVOCATION_KEY_PREFIX: &str = "bl_";

/// Build the revocation key for a token string.
pub fn revocation_key(token: &str) -> String {
    format!("{}{}", REVOCATION_KEY_PREFIX, token)
}

/// Failure talking to the revocation store.
#[derive(Debug)]
pub struct RevocationError(pub String);

impl std::fmt::Display for RevocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Revocation store error: {}", self.0)
    }
}

impl std::error::Error for RevocationError {}

/// A key-value store with per-key expiry, used to blacklist tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Insert a revocation record expiring `ttl_secs` from now.
    ///
    /// Re-revoking an existing key must never extend its expiry.
    async fn revoke(&self, key: &str, ttl_secs: u64) -> Result<(), RevocationError>;

    /// Whether a live (non-expired) record exists for the key.
    async fn is_revoked(&self, key: &str) -> Result<bool, RevocationError>;

    /// Remove records whose expiry has passed. Returns the number removed.
    async fn purge_expired(&self) -> Result<u64, RevocationError>;
}

/// SQLite-backed revocation store sharing the application pool.
#[derive(Clone)]
pub struct SqliteRevocationStore {
    pool: SqlitePool,
}

impl SqliteRevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for SqliteRevocationStore {
    async fn revoke(&self, key: &str, ttl_secs: u64) -> Result<(), RevocationError> {
        // Single-key upsert: atomic at the store level. MIN keeps an earlier
        // expiry when the same token is revoked twice.
        sqlx::query(
            "INSERT INTO revoked_tokens (key, expires_at)
             VALUES (?, strftime('%s', 'now') + ?)
             ON CONFLICT(key) DO UPDATE
             SET expires_at = MIN(revoked_tokens.expires_at, excluded.expires_at)",
        )
        .bind(key)
        .bind(ttl_secs as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RevocationError(e.to_string()))?;
        Ok(())
    }

    async fn is_revoked(&self, key: &str) -> Result<bool, RevocationError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM revoked_tokens WHERE key = ? AND expires_at > strftime('%s', 'now')",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RevocationError(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn purge_expired(&self) -> Result<u64, RevocationError> {
        let result =
            sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= strftime('%s', 'now')")
                .execute(&self.pool)
                .await
                .map_err(|e| RevocationError(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

/// Clock used by the in-memory store; injectable so tests can drive expiry.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// In-memory revocation store for unit tests.
pub struct MemoryRevocationStore {
    entries: Mutex<HashMap<String, u64>>,
    clock: Clock,
}

impl MemoryRevocationStore {
    /// Store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        }))
    }

    /// Store driven by an injected clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, key: &str, ttl_secs: u64) -> Result<(), RevocationError> {
        let expires_at = (self.clock)() + ttl_secs;
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.to_string()).or_insert(expires_at);
        *entry = (*entry).min(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, key: &str) -> Result<bool, RevocationError> {
        let now = (self.clock)();
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).is_some_and(|&exp| exp > now))
    }

    async fn purge_expired(&self) -> Result<u64, RevocationError> {
        let now = (self.clock)();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, &mut exp| exp > now);
        Ok((before - entries.len()) as u64)
    }
}
