//! Per-event bookkeeping: ordered subscribers and the native listener guard.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::target::{ListenerGuard, TargetEvent};

/// One subscriber's delivery queue.
pub(crate) struct Subscriber<E> {
    pub(crate) id: u64,
    pub(crate) tx: mpsc::UnboundedSender<TargetEvent<E>>,
}

/// State for one event name.
///
/// Which fields are populated encodes where the registration stands: no
/// subscribers and no guard (idle), subscribers without a guard (waiting
/// for a target), subscribers with a guard (listening). The guard is held
/// exactly while a target is set and at least one subscriber exists.
pub(crate) struct Registration<E> {
    pub(crate) subscribers: Vec<Subscriber<E>>,
    pub(crate) native: Option<ListenerGuard>,
}

impl<E> Default for Registration<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            native: None,
        }
    }
}

/// Event-name → registration map. Registrations are created lazily and
/// never removed; an event name that lost all subscribers keeps its (empty)
/// slot for the next one.
pub(crate) struct ListenerRegistry<E> {
    registrations: HashMap<String, Registration<E>>,
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }
}

impl<E> ListenerRegistry<E> {
    /// Registration for `event`, created on first use.
    pub(crate) fn ensure(&mut self, event: &str) -> &mut Registration<E> {
        self.registrations.entry(event.to_string()).or_default()
    }

    /// Registration for `event`, if one was ever created.
    pub(crate) fn get(&self, event: &str) -> Option<&Registration<E>> {
        self.registrations.get(event)
    }

    /// Mutable registration for `event`, if one was ever created.
    pub(crate) fn get_mut(&mut self, event: &str) -> Option<&mut Registration<E>> {
        self.registrations.get_mut(event)
    }

    /// Take every held native guard, leaving all registrations unbound.
    pub(crate) fn drain_guards(&mut self) -> Vec<ListenerGuard> {
        self.registrations
            .values_mut()
            .filter_map(|registration| registration.native.take())
            .collect()
    }

    /// Event names that currently have at least one subscriber.
    pub(crate) fn events_with_subscribers(&self) -> Vec<String> {
        self.registrations
            .iter()
            .filter(|(_, registration)| !registration.subscribers.is_empty())
            .map(|(event, _)| event.clone())
            .collect()
    }
}
