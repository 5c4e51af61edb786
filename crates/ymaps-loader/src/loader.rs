//! Cache-aware, single-flight API loader.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use ymaps_config::{ApiConfig, script_url};

use crate::{
    cache::{ApiCache, Begin},
    error::{Error, Result},
    fetch::fetch_script,
    host::{ApiHandle, HostKind, ScriptAttrs, ScriptHost},
};

/// Where the loader reads its current configuration from.
enum ConfigSource {
    /// One configuration for the loader's whole lifetime.
    Fixed(ApiConfig),
    /// Live stream; the latest value is the current configuration.
    Stream(watch::Receiver<ApiConfig>),
}

/// Loads the API script at most once per distinct configuration and hands
/// out the cached handle to every caller.
///
/// Construct with a fixed [`ApiConfig`] or with a `watch` stream of them.
/// In stream form a driver task re-runs the cache logic for every change,
/// so the host global slot always reflects the most recently emitted
/// configuration, including restoring the cached instance when an earlier
/// configuration is emitted again.
pub struct ApiLoader {
    inner: Arc<LoaderInner>,
    source: ConfigSource,
    /// Stops the stream driver when the loader goes away.
    shutdown: CancellationToken,
}

struct LoaderInner {
    host: Arc<dyn ScriptHost>,
    cache: ApiCache,
}

impl ApiLoader {
    /// Loader over a fixed configuration.
    #[must_use]
    pub fn new(host: Arc<dyn ScriptHost>, config: ApiConfig) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                host,
                cache: ApiCache::default(),
            }),
            source: ConfigSource::Fixed(config),
            shutdown: CancellationToken::new(),
        }
    }

    /// Loader over a live configuration stream.
    ///
    /// The value in the channel at construction time counts as already
    /// current; the driver reacts to changes from here on. Requires a tokio
    /// runtime on browser hosts (the driver is spawned immediately).
    #[must_use]
    pub fn with_stream(host: Arc<dyn ScriptHost>, configs: watch::Receiver<ApiConfig>) -> Self {
        let inner = Arc::new(LoaderInner {
            host,
            cache: ApiCache::default(),
        });
        let shutdown = CancellationToken::new();
        if inner.host.kind() == HostKind::Browser {
            tokio::spawn(drive(inner.clone(), configs.clone(), shutdown.clone()));
        }
        Self {
            inner,
            source: ConfigSource::Stream(configs),
            shutdown,
        }
    }

    /// Resolve the handle for the current configuration.
    ///
    /// On a headless host this never resolves: there is no document to
    /// append the script to, and callers embed the loader unconditionally
    /// and simply see no completion server-side.
    ///
    /// An incompatible configuration fails immediately, before the cache or
    /// the host is consulted. A configuration whose fetch failed earlier
    /// replays that failure until [`Self::evict`] clears the entry.
    pub async fn load(&self) -> Result<ApiHandle> {
        if self.inner.host.kind() == HostKind::Headless {
            trace!("headless host; load never resolves");
            return std::future::pending().await;
        }
        let config = self.current_config();
        self.inner.activate(&config).await
    }

    /// Drop the cache entry for `config`, if any, so the next `load` is a
    /// fresh miss. Returns whether an entry was removed.
    pub fn evict(&self, config: &ApiConfig) -> bool {
        self.inner.cache.evict(&config.cache_key())
    }

    fn current_config(&self) -> ApiConfig {
        match &self.source {
            ConfigSource::Fixed(config) => config.clone(),
            ConfigSource::Stream(configs) => configs.borrow().clone(),
        }
    }
}

impl Drop for ApiLoader {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl LoaderInner {
    /// Resolve `config` through the cache, fetching on a miss.
    async fn activate(self: &Arc<Self>, config: &ApiConfig) -> Result<ApiHandle> {
        config.validate()?;
        let key = config.cache_key();
        loop {
            match self.cache.begin(&key) {
                Begin::Ready(handle) => {
                    trace!(key = %key, "cache hit");
                    // Re-point the slot at the cached instance so the most
                    // recently requested configuration is the one scripts see.
                    self.host.set_global(Some(handle.clone()));
                    return Ok(handle);
                }
                Begin::Failed(error) => {
                    trace!(key = %key, "replaying cached failure");
                    return Err(error);
                }
                Begin::Wait(ticket) => {
                    trace!(key = %key, "joining in-flight fetch");
                    return ticket.await.unwrap_or(Err(Error::Cancelled));
                }
                Begin::Miss => {
                    // Fetch in a detached task: the caller that happened to
                    // open the entry may stop observing, and the entry must
                    // still complete for every other waiter. The next loop
                    // iteration joins the in-flight entry like anyone else.
                    debug!(key = %key, "cache miss, fetching");
                    let owner = Arc::clone(self);
                    let config = config.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        let result = owner.fetch(&config).await;
                        owner.cache.complete(&key, result);
                    });
                }
            }
        }
    }

    /// Perform the one fetch a Miss entitles us to.
    async fn fetch(&self, config: &ApiConfig) -> Result<ApiHandle> {
        // A previous load may have left an instance in the slot under any
        // key; the new script must never observe it.
        self.host.set_global(None);
        let src = script_url(config);
        fetch_script(self.host.as_ref(), ScriptAttrs::for_api(src.clone())).await?;
        match self.host.global() {
            Some(handle) => Ok(handle),
            None => Err(Error::MissingGlobal { src }),
        }
    }
}

/// Stream driver: re-runs the cache logic for every configuration change.
async fn drive(
    inner: Arc<LoaderInner>,
    mut configs: watch::Receiver<ApiConfig>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            changed = configs.changed() => {
                if changed.is_err() {
                    // Config sender dropped; the last value stays current.
                    break;
                }
                let config = configs.borrow_and_update().clone();
                if let Err(error) = inner.activate(&config).await {
                    warn!(%error, "configuration change failed to load");
                }
            }
        }
    }
    trace!("loader driver stopped");
}
