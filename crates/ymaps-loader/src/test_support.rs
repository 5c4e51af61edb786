//! Mock host for tests and the smoketest harness.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::host::{
    ApiHandle, HostKind, ScriptAttrs, ScriptError, ScriptHost, ScriptListeners,
};

/// One script appended to the mock document.
struct AppendedScript {
    attrs: ScriptAttrs,
    loaded: Option<oneshot::Sender<()>>,
    failed: Option<oneshot::Sender<ScriptError>>,
}

/// In-memory [`ScriptHost`] that records appended scripts and lets tests
/// fire their load/error signals by hand.
pub struct MockScriptHost {
    kind: HostKind,
    scripts: Mutex<Vec<AppendedScript>>,
    global: Mutex<Option<ApiHandle>>,
}

impl MockScriptHost {
    /// Host that behaves like a full browser document.
    #[must_use]
    pub fn browser() -> Arc<Self> {
        Arc::new(Self {
            kind: HostKind::Browser,
            scripts: Mutex::new(Vec::new()),
            global: Mutex::new(None),
        })
    }

    /// Host that behaves like a server-side rendering context.
    #[must_use]
    pub fn headless() -> Arc<Self> {
        Arc::new(Self {
            kind: HostKind::Headless,
            scripts: Mutex::new(Vec::new()),
            global: Mutex::new(None),
        })
    }

    /// Number of scripts appended so far.
    #[must_use]
    pub fn append_count(&self) -> usize {
        self.scripts.lock().len()
    }

    /// Attributes of the `index`-th appended script.
    ///
    /// # Panics
    /// Panics when no script with that index was appended.
    #[must_use]
    pub fn attrs(&self, index: usize) -> ScriptAttrs {
        self.scripts.lock()[index].attrs.clone()
    }

    /// Fire the load signal of the most recent script, first populating the
    /// global slot with a fresh API instance, which is what the real script
    /// does as it executes.
    pub fn complete_load(&self) {
        let loaded = {
            let mut scripts = self.scripts.lock();
            let script = scripts.last_mut().expect("a script was appended");
            *self.global.lock() = Some(ApiHandle::new(script.attrs.src.clone()));
            script.loaded.take()
        };
        if let Some(loaded) = loaded {
            let _ = loaded.send(());
        }
    }

    /// Fire the load signal of the most recent script without populating
    /// the global slot, imitating a script that executes but defines
    /// nothing.
    pub fn complete_load_without_global(&self) {
        let loaded = {
            let mut scripts = self.scripts.lock();
            let script = scripts.last_mut().expect("a script was appended");
            script.loaded.take()
        };
        if let Some(loaded) = loaded {
            let _ = loaded.send(());
        }
    }

    /// Fire the error signal of the most recent script.
    pub fn fail_load(&self, message: &str) {
        let failed = {
            let mut scripts = self.scripts.lock();
            let script = scripts.last_mut().expect("a script was appended");
            script.failed.take()
        };
        if let Some(failed) = failed {
            let _ = failed.send(ScriptError::new(message));
        }
    }

    /// Whether both listeners of the `index`-th script are gone: fired and
    /// consumed, or dropped by the fetcher.
    #[must_use]
    pub fn listeners_detached(&self, index: usize) -> bool {
        let scripts = self.scripts.lock();
        let script = &scripts[index];
        let loaded_gone = script.loaded.as_ref().is_none_or(oneshot::Sender::is_closed);
        let failed_gone = script.failed.as_ref().is_none_or(oneshot::Sender::is_closed);
        loaded_gone && failed_gone
    }

    /// Current value of the mock global slot.
    #[must_use]
    pub fn current_global(&self) -> Option<ApiHandle> {
        self.global.lock().clone()
    }
}

impl ScriptHost for MockScriptHost {
    fn kind(&self) -> HostKind {
        self.kind
    }

    fn append_script(&self, attrs: &ScriptAttrs) -> ScriptListeners {
        let (loaded_tx, loaded_rx) = oneshot::channel();
        let (failed_tx, failed_rx) = oneshot::channel();
        self.scripts.lock().push(AppendedScript {
            attrs: attrs.clone(),
            loaded: Some(loaded_tx),
            failed: Some(failed_tx),
        });
        ScriptListeners {
            loaded: loaded_rx,
            failed: failed_rx,
        }
    }

    fn global(&self) -> Option<ApiHandle> {
        self.global.lock().clone()
    }

    fn set_global(&self, handle: Option<ApiHandle>) {
        *self.global.lock() = handle;
    }
}
