//! The event manager: lazy emitters, target rebinding, delivery.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::{
    registry::{ListenerRegistry, Subscriber},
    target::{EventTarget, ListenerGuard, NativeListener, TargetEvent},
};

/// Execution wrapper every delivery runs inside.
///
/// The embedding application supplies this to route deliveries through its
/// scheduling context (a UI change-detection zone, a main-thread executor).
pub type EventContext = Arc<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Result of a [`EventManager::set_target`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSwap {
    /// Live subscriptions were rebound to the new target.
    Swapped,
    /// The target was already current; nothing changed.
    Unchanged,
}

/// Multiplexes named event subscriptions over a replaceable native target.
///
/// Consumers obtain per-event handles via [`Self::lazy_emitter`] and
/// subscribe whenever they like; native listeners are attached only while a
/// target is set and a subscriber exists, and there is never more than one
/// native listener per event name on the current target.
pub struct EventManager<E> {
    inner: Arc<ManagerInner<E>>,
}

struct ManagerInner<E> {
    context: EventContext,
    next_subscriber: AtomicU64,
    state: Mutex<ManagerState<E>>,
}

struct ManagerState<E> {
    target: Option<Arc<dyn EventTarget<E>>>,
    /// Bumped on every target change. Listeners are stamped with the value
    /// current at attach time; an event arriving under an older stamp is
    /// from a target that has already been replaced and is dropped.
    generation: u64,
    registry: ListenerRegistry<E>,
}

impl<E: Clone + Send + 'static> EventManager<E> {
    /// Manager whose deliveries run inside `context`.
    #[must_use]
    pub fn new(context: EventContext) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                context,
                next_subscriber: AtomicU64::new(0),
                state: Mutex::new(ManagerState {
                    target: None,
                    generation: 0,
                    registry: ListenerRegistry::default(),
                }),
            }),
        }
    }

    /// Manager whose deliveries run directly on the firing thread.
    #[must_use]
    pub fn direct() -> Self {
        Self::new(Arc::new(|deliver| deliver()))
    }

    /// Handle to the named event's multicast stream.
    ///
    /// Idempotent per name, and never touches the native target by itself:
    /// the underlying registration is created lazily on first subscribe.
    #[must_use]
    pub fn lazy_emitter(&self, event: &str) -> LazyEmitter<E> {
        LazyEmitter {
            inner: self.inner.clone(),
            event: event.to_string(),
        }
    }

    /// Replace the current target, rebinding every live subscription.
    ///
    /// Old native listeners are fully detached before any new one is
    /// attached. Passing the target that is already current (or `None`
    /// twice) is a no-op reported as [`TargetSwap::Unchanged`].
    pub fn set_target(&self, target: Option<Arc<dyn EventTarget<E>>>) -> TargetSwap {
        self.inner.set_target(target)
    }

    /// Detach every native listener and clear the current target.
    ///
    /// Streams stay subscribed; they go dormant until a future
    /// [`Self::set_target`] rebinds them.
    pub fn destroy(&self) {
        trace!("destroying event manager bindings");
        let guards = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.target = None;
            state.registry.drain_guards()
        };
        for guard in guards {
            guard.detach();
        }
    }
}

impl<E: Clone + Send + 'static> ManagerInner<E> {
    fn set_target(self: &Arc<Self>, target: Option<Arc<dyn EventTarget<E>>>) -> TargetSwap {
        let (old_guards, attach_plan, generation) = {
            let mut state = self.state.lock();
            let unchanged = match (&state.target, &target) {
                (None, None) => true,
                (Some(current), Some(next)) => Arc::ptr_eq(current, next),
                _ => false,
            };
            if unchanged {
                return TargetSwap::Unchanged;
            }
            state.generation += 1;
            state.target = target.clone();
            let attach_plan = if target.is_some() {
                state.registry.events_with_subscribers()
            } else {
                Vec::new()
            };
            (state.registry.drain_guards(), attach_plan, state.generation)
        };

        // Old listeners come off before any new one goes on; events the old
        // target emits from here on carry a stale generation and are dropped.
        for guard in old_guards {
            guard.detach();
        }
        if let Some(target) = target {
            trace!(events = attach_plan.len(), "rebinding listeners to new target");
            for event in attach_plan {
                self.attach_listener(&event, &target, generation);
            }
        }
        TargetSwap::Swapped
    }

    /// Attach one native listener for `event` and store its guard. If the
    /// world moved on while the target was being wired, the fresh listener
    /// is detached again immediately instead.
    fn attach_listener(
        self: &Arc<Self>,
        event: &str,
        target: &Arc<dyn EventTarget<E>>,
        generation: u64,
    ) {
        let guard = target.attach(event, self.native_listener(event, generation));
        let mut state = self.state.lock();
        let current_generation = state.generation;
        let registration = state.registry.ensure(event);
        if current_generation == generation
            && registration.native.is_none()
            && !registration.subscribers.is_empty()
        {
            registration.native = Some(guard);
        } else {
            drop(state);
            guard.detach();
        }
    }

    /// Listener closure handed to the native target.
    fn native_listener(self: &Arc<Self>, event: &str, generation: u64) -> NativeListener<E> {
        let weak = Arc::downgrade(self);
        let event = event.to_string();
        Arc::new(move |native: E| {
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.dispatch(&event, generation, native);
            }
        })
    }

    /// Fan one native event out to the event's subscribers, inside the
    /// configured execution context.
    fn dispatch(&self, event: &str, generation: u64, native: E) {
        let (target, queues) = {
            let state = self.state.lock();
            if state.generation != generation {
                trace!(event, "dropping event from a superseded target");
                return;
            }
            let Some(target) = state.target.clone() else {
                return;
            };
            let Some(registration) = state.registry.get(event) else {
                return;
            };
            let queues: Vec<_> = registration
                .subscribers
                .iter()
                .map(|subscriber| subscriber.tx.clone())
                .collect();
            (target, queues)
        };
        let payload = TargetEvent { native, target };
        (self.context)(Box::new(move || {
            for queue in queues {
                // A queue whose stream is mid-drop just misses the event.
                let _ = queue.send(payload.clone());
            }
        }));
    }
}

/// Handle to one named event's multicast stream.
///
/// Cheap to clone into components; subscribing is what creates state.
pub struct LazyEmitter<E> {
    inner: Arc<ManagerInner<E>>,
    event: String,
}

impl<E: Clone + Send + 'static> LazyEmitter<E> {
    /// Register a new subscriber.
    ///
    /// The first subscriber for an event attaches the native listener if a
    /// target is already set; otherwise attachment happens at the next
    /// `set_target`. Dropping the returned stream unsubscribes immediately.
    #[must_use]
    pub fn subscribe(&self) -> EventStream<E> {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let attach_to = {
            let mut state = self.inner.state.lock();
            let generation = state.generation;
            let target = state.target.clone();
            let registration = state.registry.ensure(&self.event);
            registration.subscribers.push(Subscriber { id, tx });
            if registration.native.is_none() {
                target.map(|target| (target, generation))
            } else {
                None
            }
        };
        if let Some((target, generation)) = attach_to {
            self.inner.attach_listener(&self.event, &target, generation);
        }
        EventStream {
            rx,
            _guard: SubscriberGuard {
                inner: self.inner.clone(),
                event: self.event.clone(),
                id,
            },
        }
    }

    /// The event name this emitter serves.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl<E> Clone for LazyEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            event: self.event.clone(),
        }
    }
}

/// Unsubscribes on drop, synchronously: when the last subscriber for an
/// event goes away, the native listener comes off before `drop` returns.
struct SubscriberGuard<E> {
    inner: Arc<ManagerInner<E>>,
    event: String,
    id: u64,
}

impl<E> Drop for SubscriberGuard<E> {
    fn drop(&mut self) {
        let guard = {
            let mut state = self.inner.state.lock();
            let Some(registration) = state.registry.get_mut(&self.event) else {
                return;
            };
            registration
                .subscribers
                .retain(|subscriber| subscriber.id != self.id);
            if registration.subscribers.is_empty() {
                registration.native.take()
            } else {
                None
            }
        };
        if let Some(guard) = guard {
            trace!(event = %self.event, "last subscriber gone, detaching native listener");
            guard.detach();
        }
    }
}

/// One subscription to a named event.
///
/// Receives wrapped events while a target is bound; dormant otherwise.
/// Dropping the stream unsubscribes synchronously: when the last stream
/// for an event goes away, the native listener is detached immediately.
pub struct EventStream<E> {
    rx: mpsc::UnboundedReceiver<TargetEvent<E>>,
    /// Held for its Drop impl.
    _guard: SubscriberGuard<E>,
}

impl<E> EventStream<E> {
    /// Await the next delivered event.
    pub async fn next(&mut self) -> Option<TargetEvent<E>> {
        self.rx.recv().await
    }

    /// Take the next already-delivered event, if any.
    pub fn try_next(&mut self) -> Option<TargetEvent<E>> {
        self.rx.try_recv().ok()
    }
}
