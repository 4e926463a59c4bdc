//! In-memory cache with time-based revalidation and single-flight fetches.
//!
//! Each key owns a slot. A fetch holds the slot's flight lock, so concurrent
//! callers for the same key wait for the running fetch and then read its
//! result instead of issuing their own request. Failed fetches are not
//! cached: the previous value stays available through `peek_stale`, and the
//! next caller fetches again. A key whose first fetch fails keeps no slot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
    invalidated: bool,
}

#[derive(Debug)]
struct Slot<V> {
    flight: tokio::sync::Mutex<()>,
    entry: Mutex<Option<Entry<V>>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            flight: tokio::sync::Mutex::new(()),
            entry: Mutex::new(None),
        }
    }
}

#[derive(Debug)]
pub struct RevalidatingCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<Slot<V>>>>,
}

impl<V: Clone> RevalidatingCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn slot(&self, key: &str) -> Arc<Slot<V>> {
        self.slots
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn fresh_value(&self, slot: &Slot<V>) -> Option<V> {
        slot.entry
            .lock()
            .as_ref()
            .filter(|e| !e.invalidated && e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Return the cached value for `key` if it is fresh, otherwise run
    /// `fetch` and cache its result.
    ///
    /// # Errors
    /// Propagates the error from `fetch`; nothing is cached in that case.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);

        if let Some(value) = self.fresh_value(&slot) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(value);
        }

        let _flight = slot.flight.lock().await;

        // Another caller may have finished a fetch while we waited
        if let Some(value) = self.fresh_value(&slot) {
            tracing::debug!("Cache filled by in-flight fetch for {}", key);
            return Ok(value);
        }

        tracing::debug!("Cache miss for {}, fetching", key);
        let value = match fetch().await {
            Ok(value) => value,
            Err(e) => {
                self.drop_if_empty(key, &slot);
                return Err(e);
            }
        };

        *slot.entry.lock() = Some(Entry {
            value: value.clone(),
            fetched_at: Instant::now(),
            invalidated: false,
        });

        Ok(value)
    }

    /// Forget a slot that never held a value, unless the map already points
    /// at a newer one.
    fn drop_if_empty(&self, key: &str, slot: &Arc<Slot<V>>) {
        if slot.entry.lock().is_some() {
            return;
        }
        let mut slots = self.slots.lock();
        if slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(key);
        }
    }

    /// Last successfully fetched value, fresh or not
    pub fn peek_stale(&self, key: &str) -> Option<V> {
        let slot = self.slots.lock().get(key).cloned()?;
        let entry = slot.entry.lock();
        entry.as_ref().map(|e| e.value.clone())
    }

    /// True if `key` holds a value younger than the TTL
    pub fn is_fresh(&self, key: &str) -> bool {
        let slot = self.slots.lock().get(key).cloned();
        slot.map(|s| self.fresh_value(&s).is_some()).unwrap_or(false)
    }

    /// Force the next `get_or_fetch` for `key` to refetch. The stale value
    /// remains readable.
    pub fn invalidate(&self, key: &str) {
        if let Some(slot) = self.slots.lock().get(key) {
            if let Some(entry) = slot.entry.lock().as_mut() {
                entry.invalidated = true;
            }
        }
    }

    /// Drop every entry for `key`
    pub fn remove(&self, key: &str) {
        self.slots.lock().remove(key);
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|s| s.entry.lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
