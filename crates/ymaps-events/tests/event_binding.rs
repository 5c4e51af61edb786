use std::sync::Arc;

use ymaps_events::{EventManager, EventTarget, MockEventTarget, TargetSwap};

type Manager = EventManager<u32>;

fn as_target(target: &Arc<MockEventTarget<u32>>) -> Arc<dyn EventTarget<u32>> {
    target.clone()
}

#[test]
fn setting_the_current_target_again_is_unchanged() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();

    assert_eq!(manager.set_target(None), TargetSwap::Unchanged);
    assert_eq!(manager.set_target(Some(as_target(&target))), TargetSwap::Swapped);
    assert_eq!(manager.set_target(Some(as_target(&target))), TargetSwap::Unchanged);
    assert_eq!(manager.set_target(None), TargetSwap::Swapped);
}

#[test]
fn subscribing_before_any_target_attaches_on_set_target() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();

    let _stream = manager.lazy_emitter("click").subscribe();
    assert_eq!(target.listener_count("click"), 0);

    manager.set_target(Some(as_target(&target)));
    assert_eq!(target.listener_count("click"), 1);
}

#[test]
fn subscribing_after_a_target_attaches_immediately() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();
    manager.set_target(Some(as_target(&target)));

    // The emitter handle alone must not touch the target.
    let emitter = manager.lazy_emitter("click");
    assert_eq!(target.listener_count("click"), 0);

    let _stream = emitter.subscribe();
    assert_eq!(target.listener_count("click"), 1);
}

#[test]
fn many_subscribers_share_one_native_listener() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();
    manager.set_target(Some(as_target(&target)));

    let emitter = manager.lazy_emitter("click");
    let mut first = emitter.subscribe();
    let mut second = emitter.subscribe();
    assert_eq!(target.listener_count("click"), 1);

    target.fire("click", 7);
    assert_eq!(first.try_next().map(|event| event.native), Some(7));
    assert_eq!(second.try_next().map(|event| event.native), Some(7));
}

#[test]
fn emitters_for_the_same_name_share_machinery() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();
    manager.set_target(Some(as_target(&target)));

    let mut first = manager.lazy_emitter("click").subscribe();
    let mut second = manager.lazy_emitter("click").subscribe();
    assert_eq!(target.listener_count("click"), 1);

    target.fire("click", 3);
    assert_eq!(first.try_next().map(|event| event.native), Some(3));
    assert_eq!(second.try_next().map(|event| event.native), Some(3));
}

#[test]
fn dropping_the_last_stream_detaches_immediately() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();
    manager.set_target(Some(as_target(&target)));

    let emitter = manager.lazy_emitter("click");
    let first = emitter.subscribe();
    let second = emitter.subscribe();
    assert_eq!(target.listener_count("click"), 1);

    drop(first);
    assert_eq!(target.listener_count("click"), 1, "one subscriber remains");
    drop(second);
    assert_eq!(target.listener_count("click"), 0, "last unsubscribe detaches");
}

#[test]
fn clearing_the_target_detaches_listeners() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();

    let _stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(as_target(&target)));
    assert_eq!(target.listener_count("click"), 1);

    manager.set_target(None);
    assert_eq!(target.listener_count("click"), 0);
}

#[test]
fn destroy_detaches_but_does_not_poison_the_manager() {
    let manager = Manager::direct();
    let target = MockEventTarget::new();

    let mut stream = manager.lazy_emitter("click").subscribe();
    manager.set_target(Some(as_target(&target)));
    assert_eq!(target.listener_count("click"), 1);

    manager.destroy();
    assert_eq!(target.listener_count("click"), 0);

    // Subscriptions survive destroy dormant; a fresh target rebinds them,
    // and new subscriptions keep working.
    let fresh = MockEventTarget::new();
    manager.set_target(Some(as_target(&fresh)));
    assert_eq!(fresh.listener_count("click"), 1);

    let mut late = manager.lazy_emitter("move").subscribe();
    assert_eq!(fresh.listener_count("move"), 1);

    fresh.fire("click", 11);
    fresh.fire("move", 12);
    assert_eq!(stream.try_next().map(|event| event.native), Some(11));
    assert_eq!(late.try_next().map(|event| event.native), Some(12));
}
