//! Smoketest cases for the loader and the event manager.

use std::{
    fs,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::watch;
use tracing::info;
use ymaps_config::{ApiConfig, Lang, script_url};
use ymaps_events::{EventManager, EventTarget, MockEventTarget, TargetSwap};
use ymaps_loader::{ApiLoader, MockScriptHost};

/// Failures a smoketest case can report.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Filesystem error while reading the configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file did not parse.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The loader surfaced an error the case did not expect.
    #[error("load error: {0}")]
    Load(#[from] ymaps_loader::Error),
    /// An observable property did not hold.
    #[error("check failed: {0}")]
    Check(String),
}

/// Fail the case unless `cond` holds.
fn check(cond: bool, what: &str) -> Result<(), CaseError> {
    if cond {
        Ok(())
    } else {
        Err(CaseError::Check(what.to_string()))
    }
}

/// Poll `cond` until it holds, failing the case after a short deadline.
async fn eventually(what: &str, mut cond: impl FnMut() -> bool) -> Result<(), CaseError> {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        if Instant::now() >= deadline {
            return Err(CaseError::Check(format!("timed out waiting for {what}")));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(())
}

/// Read the case configuration, defaulting to an `en_US` one.
pub fn read_config(path: Option<&Path>) -> Result<ApiConfig, CaseError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(ApiConfig {
            lang: Lang::EnUs,
            ..ApiConfig::default()
        }),
    }
}

/// Loader case: single-flight, caching, and stream-driven instance swaps.
pub fn run_load(config: ApiConfig) -> Result<(), CaseError> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(load_case(config))
}

async fn load_case(config: ApiConfig) -> Result<(), CaseError> {
    let host = MockScriptHost::browser();
    let loader = Arc::new(ApiLoader::new(host.clone(), config.clone()));

    // Three concurrent loads, one script append.
    let loads: Vec<_> = (0..3)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.load().await })
        })
        .collect();
    eventually("script append", || host.append_count() == 1).await?;
    host.complete_load();

    let mut handles = Vec::new();
    for load in loads {
        let handle = load
            .await
            .map_err(|join| CaseError::Check(format!("load task panicked: {join}")))??;
        handles.push(handle);
    }
    check(host.append_count() == 1, "single-flight: one append")?;
    check(
        handles.iter().all(|handle| handle.ptr_eq(&handles[0])),
        "all loads share one handle",
    )?;
    check(
        host.attrs(0).src == script_url(&config),
        "script src matches the built URL",
    )?;
    info!(src = %host.attrs(0).src, "load case: single-flight ok");

    // Stream form: distinct configurations get distinct cached instances,
    // and re-emitting one restores its instance without a new fetch.
    let host = MockScriptHost::browser();
    let (configs, stream) = watch::channel(ApiConfig::default());
    let _loader = ApiLoader::with_stream(host.clone(), stream);

    let first_config = ApiConfig {
        enterprise: true,
        ..ApiConfig::default()
    };
    configs
        .send(first_config.clone())
        .map_err(|_| CaseError::Check("config stream closed".into()))?;
    eventually("first append", || host.append_count() == 1).await?;
    host.complete_load();
    let first_instance = host
        .current_global()
        .ok_or_else(|| CaseError::Check("first instance missing".into()))?;

    let second_config = ApiConfig {
        lang: Lang::EnUs,
        ..ApiConfig::default()
    };
    configs
        .send(second_config)
        .map_err(|_| CaseError::Check("config stream closed".into()))?;
    eventually("second append", || host.append_count() == 2).await?;
    host.complete_load();

    configs
        .send(first_config)
        .map_err(|_| CaseError::Check("config stream closed".into()))?;
    eventually("first instance restored", || {
        host.current_global()
            .is_some_and(|current| current.ptr_eq(&first_instance))
    })
    .await?;
    check(host.append_count() == 2, "restore is a cache hit")?;
    info!("load case: stream swap ok");
    Ok(())
}

/// Event case: lazy subscription, rebinding, teardown and recovery.
pub fn run_events() -> Result<(), CaseError> {
    let manager = EventManager::<u32>::direct();
    let target = MockEventTarget::<u32>::new();

    // Subscribe before any target exists.
    let mut stream = manager.lazy_emitter("click").subscribe();
    check(
        target.listener_count("click") == 0,
        "no native listener before a target",
    )?;

    manager.set_target(Some(target.clone() as Arc<dyn EventTarget<u32>>));
    check(
        target.listener_count("click") == 1,
        "one native listener after set_target",
    )?;
    check(
        manager.set_target(Some(target.clone() as Arc<dyn EventTarget<u32>>))
            == TargetSwap::Unchanged,
        "re-setting the current target reports unchanged",
    )?;

    target.fire("click", 7);
    check(
        stream.try_next().map(|event| event.native) == Some(7),
        "subscriber observes the fired event",
    )?;

    // Replacement target takes over the live subscription.
    let replacement = MockEventTarget::<u32>::new();
    manager.set_target(Some(replacement.clone() as Arc<dyn EventTarget<u32>>));
    check(target.listener_count("click") == 0, "old target unbound")?;
    check(
        replacement.listener_count("click") == 1,
        "new target bound",
    )?;
    target.fire("click", 8);
    check(
        stream.try_next().is_none(),
        "events from the old target are not delivered",
    )?;
    replacement.fire("click", 9);
    check(
        stream.try_next().map(|event| event.native) == Some(9),
        "events from the new target are delivered",
    )?;

    // Teardown detaches everything but keeps the manager usable.
    manager.destroy();
    check(
        replacement.listener_count("click") == 0,
        "destroy detaches native listeners",
    )?;
    let fresh = MockEventTarget::<u32>::new();
    manager.set_target(Some(fresh.clone() as Arc<dyn EventTarget<u32>>));
    check(
        fresh.listener_count("click") == 1,
        "subscriptions rebind after destroy",
    )?;
    fresh.fire("click", 10);
    check(
        stream.try_next().map(|event| event.native) == Some(10),
        "deliveries resume after destroy",
    )?;

    drop(stream);
    check(
        fresh.listener_count("click") == 0,
        "dropping the last stream detaches",
    )?;
    info!("events case: ok");
    Ok(())
}
