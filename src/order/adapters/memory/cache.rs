//! In-process provisional checkout cache.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::order::{
    domain::{CachedCheckout, CheckoutSnapshot, PaymentId},
    ports::{OrderCacheError, OrderCacheResult, TemporaryOrderCache},
};

/// Thread-safe in-memory checkout cache.
///
/// Entries are stamped with the injected clock on every write. Nothing
/// survives a restart.
#[derive(Debug, Clone)]
pub struct InMemoryTemporaryOrderCache<C>
where
    C: Clock + Send + Sync,
{
    entries: Arc<RwLock<HashMap<PaymentId, CachedCheckout>>>,
    clock: Arc<C>,
}

impl<C> InMemoryTemporaryOrderCache<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty cache stamping entries with `clock`.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Returns the number of cached entries.
    ///
    /// # Errors
    ///
    /// Returns [`OrderCacheError`] when the cache lock is poisoned.
    pub fn len(&self) -> OrderCacheResult<usize> {
        let entries = self.entries.read().map_err(|err| lock_error(&err))?;
        Ok(entries.len())
    }

    /// Returns whether the cache holds no entries.
    ///
    /// # Errors
    ///
    /// Returns [`OrderCacheError`] when the cache lock is poisoned.
    pub fn is_empty(&self) -> OrderCacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn lock_error(err: &dyn std::fmt::Display) -> OrderCacheError {
    OrderCacheError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl<C> TemporaryOrderCache for InMemoryTemporaryOrderCache<C>
where
    C: Clock + Send + Sync,
{
    async fn put(
        &self,
        payment_id: &PaymentId,
        snapshot: CheckoutSnapshot,
    ) -> OrderCacheResult<()> {
        let cached_at = self.clock.utc();
        let mut entries = self.entries.write().map_err(|err| lock_error(&err))?;
        entries.insert(
            payment_id.clone(),
            CachedCheckout {
                snapshot,
                cached_at,
            },
        );
        Ok(())
    }

    async fn get(&self, payment_id: &PaymentId) -> OrderCacheResult<Option<CachedCheckout>> {
        let entries = self.entries.read().map_err(|err| lock_error(&err))?;
        Ok(entries.get(payment_id).cloned())
    }

    async fn evict(&self, payment_id: &PaymentId) -> OrderCacheResult<()> {
        let mut entries = self.entries.write().map_err(|err| lock_error(&err))?;
        entries.remove(payment_id);
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>, ttl: Duration) -> OrderCacheResult<usize> {
        let mut entries = self.entries.write().map_err(|err| lock_error(&err))?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, ttl));
        Ok(before - entries.len())
    }
}
