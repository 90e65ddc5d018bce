//! Short-lived verification state.
//!
//! Holds the secrets that bridge multi-step auth flows: email verification
//! codes, password reset codes, and pending registration payloads. Every
//! entry carries its own TTL (currently always one hour) and is single-use:
//! the consuming flow removes it atomically via [`VerificationStore::take`],
//! so a replayed code observes "absent".
//!
//! Backed by a `moka` cache with a per-entry expiry policy. Expiry is lazy,
//! with an explicit timestamp guard so an expired value can never be
//! observed even before the cache has evicted it.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use bazaar_core::Email;

/// TTL applied to all verification entries.
pub const VERIFICATION_TTL: Duration = Duration::from_secs(60 * 60);

/// Purpose-scoped key for a verification entry.
///
/// Centralizing key construction keeps the purposes from colliding: the
/// same email has independent entries per flow.
#[derive(Debug, Clone, Copy)]
pub enum VerificationKey<'a> {
    /// Email verification code for a pending registration.
    EmailCode(&'a Email),
    /// The pending registration payload, bound to its code.
    PendingRegistration(&'a Email, &'a str),
    /// Password reset code.
    ResetCode(&'a Email),
}

impl VerificationKey<'_> {
    fn render(&self) -> String {
        match self {
            Self::EmailCode(email) => format!("verifyEmail:{email}"),
            Self::PendingRegistration(email, code) => format!("userInfo:{email}:{code}"),
            Self::ResetCode(email) => format!("resetPassword:{email}"),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    ttl: Duration,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Reads each entry's own TTL when it is created or replaced.
struct PerEntryExpiry;

impl Expiry<String, StoredEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Key-value store with per-entry expiration for flow secrets.
///
/// Operations are atomic per key; a `get` never observes a half-written
/// value, and two concurrent `take`s of the same key yield exactly one
/// `Some`.
pub struct VerificationStore {
    entries: Cache<String, StoredEntry>,
}

impl VerificationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(PerEntryExpiry).build(),
        }
    }

    /// Store a value, replacing any existing entry under the key.
    pub async fn put(&self, key: VerificationKey<'_>, value: &str, ttl: Duration) {
        let entry = StoredEntry {
            value: value.to_owned(),
            ttl,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.render(), entry).await;
    }

    /// Return the value if present and unexpired.
    pub async fn get(&self, key: VerificationKey<'_>) -> Option<String> {
        self.entries
            .get(&key.render())
            .await
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value)
    }

    /// Atomically remove and return the value, if present and unexpired.
    ///
    /// This is the consumption primitive: when two flows race on the same
    /// key, exactly one receives the value.
    pub async fn take(&self, key: VerificationKey<'_>) -> Option<String> {
        self.entries
            .remove(&key.render())
            .await
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value)
    }

    /// Remove the entry. Idempotent.
    pub async fn delete(&self, key: VerificationKey<'_>) {
        self.entries.invalidate(&key.render()).await;
    }
}

impl Default for VerificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn email() -> Email {
        Email::parse("user@example.com").unwrap()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = VerificationStore::new();
        let email = email();

        store
            .put(VerificationKey::EmailCode(&email), "abc123XYZ0", VERIFICATION_TTL)
            .await;

        assert_eq!(
            store.get(VerificationKey::EmailCode(&email)).await.as_deref(),
            Some("abc123XYZ0")
        );
    }

    #[tokio::test]
    async fn test_purposes_do_not_collide() {
        let store = VerificationStore::new();
        let email = email();

        store
            .put(VerificationKey::EmailCode(&email), "verify", VERIFICATION_TTL)
            .await;
        store
            .put(VerificationKey::ResetCode(&email), "reset", VERIFICATION_TTL)
            .await;

        assert_eq!(
            store.get(VerificationKey::EmailCode(&email)).await.as_deref(),
            Some("verify")
        );
        assert_eq!(
            store.get(VerificationKey::ResetCode(&email)).await.as_deref(),
            Some("reset")
        );
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_entry() {
        let store = VerificationStore::new();
        let email = email();

        store
            .put(VerificationKey::EmailCode(&email), "first", VERIFICATION_TTL)
            .await;
        store
            .put(VerificationKey::EmailCode(&email), "second", VERIFICATION_TTL)
            .await;

        // Last write wins; only one code is ever valid at a time.
        assert_eq!(
            store.get(VerificationKey::EmailCode(&email)).await.as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store = VerificationStore::new();
        let email = email();

        store
            .put(VerificationKey::ResetCode(&email), "abc123XYZ0", VERIFICATION_TTL)
            .await;

        assert!(store.take(VerificationKey::ResetCode(&email)).await.is_some());
        // Replay observes absent.
        assert!(store.take(VerificationKey::ResetCode(&email)).await.is_none());
        assert!(store.get(VerificationKey::ResetCode(&email)).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_takes_yield_one_winner() {
        let store = Arc::new(VerificationStore::new());
        let email = email();

        store
            .put(VerificationKey::EmailCode(&email), "abc123XYZ0", VERIFICATION_TTL)
            .await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let email = email.clone();
            handles.push(tokio::spawn(async move {
                store.take(VerificationKey::EmailCode(&email)).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = VerificationStore::new();
        let email = email();

        store
            .put(
                VerificationKey::EmailCode(&email),
                "abc123XYZ0",
                Duration::from_millis(30),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(store.get(VerificationKey::EmailCode(&email)).await.is_none());
        assert!(store.take(VerificationKey::EmailCode(&email)).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = VerificationStore::new();
        let email = email();

        store
            .put(VerificationKey::EmailCode(&email), "abc123XYZ0", VERIFICATION_TTL)
            .await;
        store.delete(VerificationKey::EmailCode(&email)).await;
        store.delete(VerificationKey::EmailCode(&email)).await;

        assert!(store.get(VerificationKey::EmailCode(&email)).await.is_none());
    }
}
