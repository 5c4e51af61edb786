//! Host environment seam: script insertion and the API global slot.
//!
//! The loader itself has no notion of a DOM. Callers supply a [`ScriptHost`]
//! that can append one script-like node to its document and report the
//! node's load-or-error signal; everything else (URL construction, caching,
//! deduplication) happens on this side of the seam.

use std::{fmt, sync::Arc};

use thiserror::Error;
use tokio::sync::oneshot;

/// What kind of runtime the host document lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKind {
    /// A document that can execute appended scripts.
    Browser,
    /// A server-side or test context with no executable document. The
    /// loader never touches a headless host.
    Headless,
}

/// Element id given to the API script node.
pub const SCRIPT_ID: &str = "yandexMapsApiScript";

/// MIME type given to the API script node.
pub const SCRIPT_KIND: &str = "text/javascript";

/// Attributes applied to a script node before it is appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptAttrs {
    /// Script URL.
    pub src: String,
    /// Element id.
    pub id: String,
    /// Fetch without blocking document parsing.
    pub load_async: bool,
    /// Execute after the document has been parsed.
    pub defer: bool,
    /// MIME type of the node.
    pub kind: String,
}

impl ScriptAttrs {
    /// Attributes for the API bootstrap script at `src`.
    #[must_use]
    pub fn for_api(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            id: SCRIPT_ID.to_string(),
            load_async: true,
            defer: true,
            kind: SCRIPT_KIND.to_string(),
        }
    }
}

/// Native script failure, surfaced verbatim to every waiter of the fetch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("script load failed: {message}")]
pub struct ScriptError {
    /// Host-reported failure description.
    pub message: String,
}

impl ScriptError {
    /// Wrap a host-reported failure description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Load / error signal pair for one appended script.
///
/// Dropping the pair detaches both listeners on the host side. The fetcher
/// drops it as soon as either signal fires, so a late second signal has
/// nowhere to land. Hosts must keep the senders alive until then; a sender
/// dropped without firing reads as the host going away mid-fetch.
#[derive(Debug)]
pub struct ScriptListeners {
    /// Fires when the script finished executing.
    pub loaded: oneshot::Receiver<()>,
    /// Fires when the script failed to fetch or execute.
    pub failed: oneshot::Receiver<ScriptError>,
}

/// Opaque handle to the API object a loaded script exposed.
///
/// Equality is by instance: two handles compare equal under
/// [`ApiHandle::ptr_eq`] only if they came from the same script execution.
#[derive(Clone)]
pub struct ApiHandle(Arc<ApiInstance>);

struct ApiInstance {
    /// URL of the script execution that produced this instance.
    script_src: String,
}

impl ApiHandle {
    /// Handle for a fresh API instance populated by the script at `src`.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self(Arc::new(ApiInstance {
            script_src: src.into(),
        }))
    }

    /// URL of the script execution that produced this instance.
    #[must_use]
    pub fn script_src(&self) -> &str {
        &self.0.script_src
    }

    /// Whether two handles refer to the same API instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ApiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHandle")
            .field("script_src", &self.0.script_src)
            .field("instance", &Arc::as_ptr(&self.0))
            .finish()
    }
}

/// Host environment the loader operates against.
///
/// The global slot is part of this seam on purpose: it is process-wide
/// mutable state, and routing every read and write through the host object
/// keeps it owned by the loader instead of becoming ambient.
pub trait ScriptHost: Send + Sync {
    /// Runtime kind. [`HostKind::Headless`] hosts are never touched.
    fn kind(&self) -> HostKind;

    /// Create a script node with `attrs`, append it to the document, and
    /// return the listener pair for its load-or-error signal.
    fn append_script(&self, attrs: &ScriptAttrs) -> ScriptListeners;

    /// Current value of the API global slot.
    fn global(&self) -> Option<ApiHandle>;

    /// Replace the API global slot.
    fn set_global(&self, handle: Option<ApiHandle>);
}
