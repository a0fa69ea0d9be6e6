//! Periodic eviction of expired provisional checkouts.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mockable::Clock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::order::ports::{OrderCacheResult, TemporaryOrderCache};

/// Expiry settings for the checkout cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Age after which a cached checkout is dropped.
    pub ttl: Duration,
    /// Period of the sweep loop.
    pub sweep_interval: StdDuration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(30),
            sweep_interval: StdDuration::from_secs(30 * 60),
        }
    }
}

/// Sweeps the checkout cache independently of request traffic.
pub struct CacheSweeper<K, C>
where
    K: TemporaryOrderCache,
    C: Clock + Send + Sync,
{
    cache: Arc<K>,
    clock: Arc<C>,
    settings: CacheSettings,
}

impl<K, C> CacheSweeper<K, C>
where
    K: TemporaryOrderCache + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a sweeper for `cache`.
    #[must_use]
    pub const fn new(cache: Arc<K>, clock: Arc<C>, settings: CacheSettings) -> Self {
        Self {
            cache,
            clock,
            settings,
        }
    }

    /// Drops every entry older than the TTL and returns how many went.
    ///
    /// # Errors
    ///
    /// Returns [`crate::order::ports::OrderCacheError`] when the cache
    /// backend fails.
    pub async fn sweep_once(&self) -> OrderCacheResult<usize> {
        let removed = self.cache.sweep(self.clock.utc(), self.settings.ttl).await?;
        if removed > 0 {
            info!(removed, "expired checkouts evicted");
        }
        Ok(removed)
    }

    /// Starts the sweep loop on the current Tokio runtime.
    #[must_use]
    pub fn spawn(self) -> SweeperHandle {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.settings.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = self.sweep_once().await {
                            warn!(error = %err, "checkout cache sweep failed");
                        }
                    }
                }
            }
            debug!("checkout cache sweeper stopped");
        });
        SweeperHandle { token, handle }
    }
}

/// Handle to a running sweep loop.
#[derive(Debug)]
pub struct SweeperHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the loop and waits for the current sweep to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.handle.await {
            warn!(error = %err, "checkout cache sweeper ended abnormally");
        }
    }
}
