//! Read-through cache in front of the upstream weather provider.
//!
//! Entries live in the `cache` table, one row per (kind, city). A row is
//! fresh while `now - stored_at < ttl`; stale rows are overwritten on the
//! next successful fetch and never served. Concurrent misses for the same
//! key are not coalesced, each one calls upstream.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::database::{normalize_city, CacheKind, Database};
use crate::error::AppError;

pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds.
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

pub struct CacheGateway {
    database: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl CacheGateway {
    pub fn new(database: Arc<Database>) -> Self {
        Self::with_clock(database, Arc::new(SystemClock))
    }

    pub fn with_clock(database: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { database, clock }
    }

    /// Returns the cached payload for `(kind, city)` if it is younger than
    /// `ttl_secs`, otherwise calls `fetch`, stores the result and returns it.
    ///
    /// A failed fetch writes nothing and leaves any stale row in place.
    pub async fn fetch_with_cache<T, F, Fut>(
        &self,
        kind: CacheKind,
        city: &str,
        ttl_secs: u64,
        fetch: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let key = normalize_city(city);
        let now = self.clock.now_millis();

        if let Some(entry) = self.database.get_cache_entry(kind, &key).await? {
            if is_fresh(entry.stored_at, now, ttl_secs) {
                match serde_json::from_str::<T>(&entry.payload) {
                    Ok(payload) => {
                        tracing::debug!("Cache hit for {}:{}", entry.kind, entry.city);
                        return Ok(payload);
                    }
                    Err(e) => {
                        tracing::warn!("Discarding unreadable cache entry {}:{}: {}", kind, key, e);
                    }
                }
            } else {
                tracing::debug!("Cache entry {}:{} is stale", kind, key);
            }
        } else {
            tracing::debug!("Cache miss for {}:{}", kind, key);
        }

        let payload = fetch(city.trim().to_string()).await?;

        let serialized = serde_json::to_string(&payload)
            .map_err(|e| AppError::Upstream(format!("Failed to serialize payload: {}", e)))?;
        self.database
            .put_cache_entry(kind, &key, &serialized, self.clock.now_millis())
            .await?;

        Ok(payload)
    }
}

fn is_fresh(stored_at: i64, now: i64, ttl_secs: u64) -> bool {
    let ttl_ms = i64::try_from(ttl_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now.saturating_sub(stored_at) < ttl_ms
}

/// Clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: std::sync::atomic::AtomicI64::new(start_millis),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now
            .fetch_add(secs * 1000, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
