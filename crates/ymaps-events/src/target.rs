//! The native-target capability seam.
//!
//! Instead of open-ended subclassing over whatever object a script happens
//! to expose, integrations implement one small trait per entity kind:
//! attach a listener, hand back the guard that removes it.

use std::{fmt, sync::Arc};

/// Callback invoked by the native target when an event fires.
pub type NativeListener<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Detach handle for one attached native listener.
///
/// Consumed exactly once. The registry holds at most one guard per
/// (event, target) pair, which is what bounds native listeners to one.
pub struct ListenerGuard(Option<Box<dyn FnOnce() + Send>>);

impl ListenerGuard {
    /// Wrap the target's removal closure.
    #[must_use]
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(detach)))
    }

    /// Remove the native listener.
    pub fn detach(mut self) {
        if let Some(detach) = self.0.take() {
            detach();
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

/// A native entity events are multiplexed against.
///
/// `E` is the entity's native event payload.
pub trait EventTarget<E>: Send + Sync {
    /// Attach `listener` under `event`, returning its removal guard.
    fn attach(&self, event: &str, listener: NativeListener<E>) -> ListenerGuard;
}

/// Payload delivered to subscribers: the originating native event plus the
/// target the listener was attached to when it fired.
#[derive(Clone)]
pub struct TargetEvent<E> {
    /// The originating native event.
    pub native: E,
    /// The target that emitted it.
    pub target: Arc<dyn EventTarget<E>>,
}

impl<E: fmt::Debug> fmt::Debug for TargetEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetEvent")
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}
