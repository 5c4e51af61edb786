//! Single-flight loader for the Yandex.Maps JS API script.
//!
//! The API arrives as a script the host document executes; running it
//! populates a well-known global slot with the API object. This crate turns
//! that bootstrap into a cached, deduplicated operation:
//! - [`ApiLoader`]: `load()` resolves the handle for the current
//!   configuration, fetching at most once per distinct configuration and
//!   coalescing concurrent calls into one fetch
//! - [`ScriptHost`]: the host-environment seam callers implement (append a
//!   script node, surface its load/error signal, own the global slot)
//! - [`MockScriptHost`]: in-memory host for tests and the smoketest harness
//!
//! The loader never retries by itself: a configuration that failed stays
//! failed for that key until [`ApiLoader::evict`] clears it.

mod cache;
mod error;
mod fetch;
mod host;
mod loader;
mod test_support;

pub use error::{Error, Result};
pub use host::{
    ApiHandle, HostKind, SCRIPT_ID, SCRIPT_KIND, ScriptAttrs, ScriptError, ScriptHost,
    ScriptListeners,
};
pub use loader::ApiLoader;
pub use test_support::MockScriptHost;
