//! Mock event target for tests and the smoketest harness.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;

use crate::target::{EventTarget, ListenerGuard, NativeListener};

/// In-memory [`EventTarget`] that records attached listeners and lets tests
/// fire events by name.
pub struct MockEventTarget<E> {
    next_id: AtomicU64,
    listeners: Arc<Mutex<HashMap<String, Vec<(u64, NativeListener<E>)>>>>,
}

impl<E: Clone> MockEventTarget<E> {
    /// Fresh target with no listeners.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            listeners: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Number of native listeners currently attached under `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Invoke every listener currently attached under `event`.
    pub fn fire(&self, event: &str, payload: E) {
        let snapshot: Vec<NativeListener<E>> = self
            .listeners
            .lock()
            .get(event)
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|(_, listener)| listener.clone())
                    .collect()
            })
            .unwrap_or_default();
        for listener in snapshot {
            listener(payload.clone());
        }
    }
}

impl<E: 'static> EventTarget<E> for MockEventTarget<E> {
    fn attach(&self, event: &str, listener: NativeListener<E>) -> ListenerGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        let listeners = Arc::clone(&self.listeners);
        let event = event.to_string();
        ListenerGuard::new(move || {
            if let Some(attached) = listeners.lock().get_mut(&event) {
                attached.retain(|(attached_id, _)| *attached_id != id);
            }
        })
    }
}
