use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use ymaps_events::{
    EventContext, EventManager, EventTarget, ListenerGuard, MockEventTarget, NativeListener,
    TargetEvent,
};

type Manager = EventManager<u32>;

fn as_target(target: &Arc<MockEventTarget<u32>>) -> Arc<dyn EventTarget<u32>> {
    target.clone()
}

/// Thin-pointer identity for dyn targets.
fn same_target(a: &Arc<dyn EventTarget<u32>>, b: &Arc<MockEventTarget<u32>>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

#[test]
fn delivered_events_carry_the_native_payload_and_target() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();
    let mut stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(as_target(&target)));

    target.fire("click", 42);
    let event: TargetEvent<u32> = stream.try_next().expect("one delivery");
    assert_eq!(event.native, 42);
    assert!(same_target(&event.target, &target));
    assert!(stream.try_next().is_none(), "exactly one delivery");
}

#[test]
fn deliveries_run_inside_the_configured_context() {
    let ran = Arc::new(AtomicUsize::new(0));
    let context: EventContext = {
        let ran = ran.clone();
        Arc::new(move |deliver| {
            ran.fetch_add(1, Ordering::SeqCst);
            deliver();
        })
    };
    let manager = Manager::new(context);
    let target = MockEventTarget::new();
    let mut stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(as_target(&target)));
    assert_eq!(ran.load(Ordering::SeqCst), 0, "attach alone must not deliver");

    target.fire("click", 1);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(stream.try_next().map(|event| event.native), Some(1));
}

#[test]
fn swapping_targets_moves_the_subscription() {
    let manager = Manager::direct();
    let first = MockEventTarget::new();
    let mut stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(as_target(&first)));

    first.fire("click", 1);
    assert_eq!(stream.try_next().map(|event| event.native), Some(1));

    let second = MockEventTarget::new();
    manager.set_target(Some(as_target(&second)));
    assert_eq!(first.listener_count("click"), 0);
    assert_eq!(second.listener_count("click"), 1);

    // The old target no longer has a listener to fire.
    first.fire("click", 2);
    assert!(stream.try_next().is_none());

    second.fire("click", 3);
    assert_eq!(stream.try_next().map(|event| event.native), Some(3));
}

/// Target whose removal guards do nothing, imitating a native object that
/// keeps invoking listeners after they were logically detached.
struct LeakyTarget {
    listeners: Mutex<Vec<NativeListener<u32>>>,
}

impl LeakyTarget {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: Mutex::new(Vec::new()),
        })
    }

    fn fire(&self, payload: u32) {
        let snapshot: Vec<_> = self.listeners.lock().clone();
        for listener in snapshot {
            listener(payload);
        }
    }
}

impl EventTarget<u32> for LeakyTarget {
    fn attach(&self, _event: &str, listener: NativeListener<u32>) -> ListenerGuard {
        self.listeners.lock().push(listener);
        ListenerGuard::new(|| {})
    }
}

#[test]
fn stale_target_events_are_dropped_after_a_swap() {
    let manager = Manager::direct();
    let leaky = LeakyTarget::new();
    let mut stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(leaky.clone() as Arc<dyn EventTarget<u32>>));

    leaky.fire(1);
    assert_eq!(stream.try_next().map(|event| event.native), Some(1));

    let replacement = MockEventTarget::new();
    manager.set_target(Some(as_target(&replacement)));

    // The leaky target still invokes the old listener; nothing may reach
    // the subscriber once the swap has happened.
    leaky.fire(2);
    assert!(stream.try_next().is_none());

    replacement.fire("click", 3);
    assert_eq!(stream.try_next().map(|event| event.native), Some(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn streams_wake_for_events_fired_elsewhere() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();
    let mut stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(as_target(&target)));

    let firer = tokio::spawn({
        let target = target.clone();
        async move {
            target.fire("click", 9);
        }
    });
    let event = stream.next().await.expect("delivery");
    assert_eq!(event.native, 9);
    firer.await.expect("firer task");
}
