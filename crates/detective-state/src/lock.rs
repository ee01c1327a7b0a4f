//! StorageLock — per-client rate limit on page-metric storage.
//!
//! After a client stores a metric it is locked out for `ttl_secs`,
//! regardless of which URL it submits for next. A TTL of zero disables
//! locking entirely, which is handy during development.
//!
//! Clients are keyed by a hash of their best-known address. That address
//! can be spoofed, so the lock only deters casual abuse.

use tracing::debug;

use crate::error::StateResult;
use crate::repository::LockRepository;
use crate::types::LockEntry;

#[derive(Clone)]
pub struct StorageLock<L> {
    repo: L,
    ttl_secs: u64,
}

impl<L: LockRepository> StorageLock<L> {
    pub fn new(repo: L, ttl_secs: u64) -> Self {
        Self { repo, ttl_secs }
    }

    /// Whether `client_key` stored a metric less than one TTL before `now`.
    pub fn is_locked(&self, client_key: &str, now: u64) -> StateResult<bool> {
        if self.ttl_secs == 0 {
            return Ok(false);
        }
        let locked = match self.repo.load_lock(client_key)? {
            Some(entry) if !entry.is_expired(now) => {
                now.saturating_sub(entry.locked_at) < self.ttl_secs
            }
            _ => false,
        };
        Ok(locked)
    }

    /// Record a stored submission for `client_key` at `now`.
    ///
    /// With locking disabled any existing entry is cleared instead.
    pub fn acquire(&self, client_key: &str, now: u64) -> StateResult<()> {
        if self.ttl_secs == 0 {
            self.repo.clear_lock(client_key)?;
            return Ok(());
        }
        let entry = LockEntry {
            locked_at: now,
            expires_at: now.saturating_add(self.ttl_secs),
        };
        self.repo.store_lock(client_key, &entry)?;
        debug!(ttl = self.ttl_secs, "storage lock acquired");
        Ok(())
    }
}
