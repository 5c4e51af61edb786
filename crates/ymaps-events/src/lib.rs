//! Lazily-bound event multiplexing for script-backed map entities.
//!
//! Map entities come and go: a component subscribes to `click` long before
//! the native object exists, and the object backing those subscriptions can
//! be replaced wholesale when a configuration changes. [`EventManager`]
//! absorbs that churn:
//! - [`EventManager::lazy_emitter`] hands out per-event-name stream handles
//!   that are valid before any target exists
//! - subscriptions multicast through at most one native listener per
//!   (event, target) pair, attached and detached as subscriber counts and
//!   the current target change
//! - [`EventManager::set_target`] atomically rebinds every live
//!   subscription to a replacement target
//!
//! Deliveries run inside a caller-configured [`EventContext`], so consumers
//! observe events in whatever scheduling context (UI thread, change
//! detection, plain call) the embedding application expects.

mod manager;
mod registry;
mod target;
mod test_support;

pub use manager::{EventContext, EventManager, EventStream, LazyEmitter, TargetSwap};
pub use target::{EventTarget, ListenerGuard, NativeListener, TargetEvent};
pub use test_support::MockEventTarget;
