use std::time::{Duration, Instant};

use tokio::sync::watch;
use ymaps_config::{ApiConfig, Lang};
use ymaps_loader::{ApiHandle, ApiLoader, MockScriptHost};

/// Poll `cond` until it holds or a short deadline passes.
async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn first_config() -> ApiConfig {
    ApiConfig {
        lang: Lang::RuRu,
        enterprise: true,
        version: Some("1.31.2".into()),
        ..ApiConfig::default()
    }
}

fn second_config() -> ApiConfig {
    ApiConfig {
        version: Some("2.25.1".into()),
        ..ApiConfig::default()
    }
}

fn global_is(host: &MockScriptHost, expected: &ApiHandle) -> bool {
    host.current_global()
        .is_some_and(|current| current.ptr_eq(expected))
}

#[tokio::test(flavor = "multi_thread")]
async fn config_changes_swap_between_cached_instances() {
    let host = MockScriptHost::browser();
    let (configs, stream) = watch::channel(ApiConfig::default());
    let _loader = ApiLoader::with_stream(host.clone(), stream);

    // First configuration: fresh fetch, slot populated by the script.
    configs.send(first_config()).expect("stream alive");
    eventually("first append", || host.append_count() == 1).await;
    host.complete_load();
    let first_handle = host.current_global().expect("first instance");

    // Second configuration: its own fetch; the slot was invalidated first.
    configs.send(second_config()).expect("stream alive");
    eventually("second append", || host.append_count() == 2).await;
    assert!(
        host.current_global().is_none(),
        "previous instance must be cleared before the new fetch"
    );
    host.complete_load();
    let second_handle = host.current_global().expect("second instance");
    assert!(!first_handle.ptr_eq(&second_handle));

    // Re-emitting a seen configuration restores its cached instance with no
    // new fetch, in either direction.
    configs.send(first_config()).expect("stream alive");
    eventually("first instance restored", || global_is(&host, &first_handle)).await;
    assert_eq!(host.append_count(), 2);

    configs.send(second_config()).expect("stream alive");
    eventually("second instance restored", || global_is(&host, &second_handle)).await;
    assert_eq!(host.append_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn load_resolves_against_the_latest_config() {
    let host = MockScriptHost::browser();
    let (configs, stream) = watch::channel(ApiConfig::default());
    let loader = ApiLoader::with_stream(host.clone(), stream);

    configs.send(first_config()).expect("stream alive");
    eventually("first append", || host.append_count() == 1).await;
    host.complete_load();
    let first_handle = host.current_global().expect("first instance");

    configs.send(second_config()).expect("stream alive");
    eventually("second append", || host.append_count() == 2).await;
    host.complete_load();

    // The loader answers for the most recently emitted configuration.
    let handle = loader.load().await.expect("load resolves");
    assert!(!handle.ptr_eq(&first_handle));
    assert!(global_is(&host, &handle));
    assert_eq!(host.append_count(), 2, "load was a cache hit");
}

#[tokio::test(flavor = "multi_thread")]
async fn driver_stops_when_the_loader_is_dropped() {
    let host = MockScriptHost::browser();
    let (configs, stream) = watch::channel(ApiConfig::default());
    let _keep_stream_open = configs.subscribe();
    let loader = ApiLoader::with_stream(host.clone(), stream);
    drop(loader);

    configs.send(first_config()).expect("receiver still held by test");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.append_count(), 0, "no driver, no fetch");
}
