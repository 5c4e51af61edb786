//! Process-wide cache of API handles, keyed by configuration.
//!
//! One entry per [`ConfigKey`]. An entry is created Pending on first use,
//! transitions to Ready or Failed exactly once, and is replaced (never
//! mutated back) from then on. Callers that hit a Pending entry attach as
//! waiters and share the single in-flight fetch.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use ymaps_config::ConfigKey;

use crate::{error::Error, host::ApiHandle};

/// Outcome of a lookup that may begin a new fetch.
pub(crate) enum Begin {
    /// The key resolved earlier; use its handle.
    Ready(ApiHandle),
    /// The key failed earlier; the cached error is replayed.
    Failed(Error),
    /// A fetch for the key is in flight; await the ticket.
    Wait(oneshot::Receiver<Result<ApiHandle, Error>>),
    /// No entry existed. The caller owns the fetch and must call
    /// [`ApiCache::complete`] with its outcome.
    Miss,
}

enum EntryState {
    Pending {
        waiters: Vec<oneshot::Sender<Result<ApiHandle, Error>>>,
    },
    Ready(ApiHandle),
    Failed(Error),
}

/// Single-flight cache of API handles.
#[derive(Default)]
pub(crate) struct ApiCache {
    entries: Mutex<HashMap<ConfigKey, EntryState>>,
}

impl ApiCache {
    /// Look up `key`, registering interest in whatever is found.
    pub(crate) fn begin(&self, key: &ConfigKey) -> Begin {
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(EntryState::Ready(handle)) => Begin::Ready(handle.clone()),
            Some(EntryState::Failed(error)) => Begin::Failed(error.clone()),
            Some(EntryState::Pending { waiters }) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Begin::Wait(rx)
            }
            None => {
                entries.insert(
                    key.clone(),
                    EntryState::Pending {
                        waiters: Vec::new(),
                    },
                );
                Begin::Miss
            }
        }
    }

    /// Transition `key` out of Pending and resolve its waiters in arrival
    /// order.
    pub(crate) fn complete(&self, key: &ConfigKey, result: Result<ApiHandle, Error>) {
        let waiters = {
            let mut entries = self.entries.lock();
            let state = match &result {
                Ok(handle) => EntryState::Ready(handle.clone()),
                Err(error) => EntryState::Failed(error.clone()),
            };
            match entries.insert(key.clone(), state) {
                Some(EntryState::Pending { waiters }) => waiters,
                // Evicted mid-flight: the waiters went away with the entry,
                // but the fresh outcome still lands for future callers.
                _ => Vec::new(),
            }
        };
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }

    /// Drop the entry for `key`. Returns whether anything was removed.
    ///
    /// Pending waiters of a removed entry observe [`Error::Cancelled`].
    pub(crate) fn evict(&self, key: &ConfigKey) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            debug!(key = %key, "evicted cache entry");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ymaps_config::ApiConfig;

    fn key() -> ConfigKey {
        ApiConfig::default().cache_key()
    }

    #[test]
    fn first_begin_is_a_miss_then_waiters_attach() {
        let cache = ApiCache::default();
        assert!(matches!(cache.begin(&key()), Begin::Miss));
        assert!(matches!(cache.begin(&key()), Begin::Wait(_)));
        assert!(matches!(cache.begin(&key()), Begin::Wait(_)));
    }

    #[tokio::test]
    async fn waiters_share_the_single_outcome() {
        let cache = ApiCache::default();
        assert!(matches!(cache.begin(&key()), Begin::Miss));
        let Begin::Wait(first) = cache.begin(&key()) else {
            panic!("expected in-flight entry");
        };
        let Begin::Wait(second) = cache.begin(&key()) else {
            panic!("expected in-flight entry");
        };

        let handle = ApiHandle::new("https://example.invalid/api.js");
        cache.complete(&key(), Ok(handle.clone()));

        let first = first.await.expect("ticket resolved").expect("ready");
        let second = second.await.expect("ticket resolved").expect("ready");
        assert!(first.ptr_eq(&handle));
        assert!(second.ptr_eq(&handle));
        assert!(matches!(cache.begin(&key()), Begin::Ready(_)));
    }

    #[test]
    fn failures_are_cached_until_evicted() {
        let cache = ApiCache::default();
        assert!(matches!(cache.begin(&key()), Begin::Miss));
        cache.complete(&key(), Err(Error::Fetch(crate::ScriptError::new("401"))));
        assert!(matches!(cache.begin(&key()), Begin::Failed(_)));
        assert!(cache.evict(&key()));
        assert!(!cache.evict(&key()));
        assert!(matches!(cache.begin(&key()), Begin::Miss));
    }

    #[tokio::test]
    async fn eviction_mid_flight_cancels_waiters() {
        let cache = ApiCache::default();
        assert!(matches!(cache.begin(&key()), Begin::Miss));
        let Begin::Wait(ticket) = cache.begin(&key()) else {
            panic!("expected in-flight entry");
        };
        assert!(cache.evict(&key()));
        assert!(ticket.await.is_err());
    }
}
