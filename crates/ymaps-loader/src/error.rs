//! Error types for API loading.

use std::result::Result as StdResult;

use thiserror::Error;

use crate::host::ScriptError;

/// Convenient result type for the loader crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for API loading.
///
/// `Clone` because one fetch outcome fans out to every waiter that joined
/// the in-flight entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The configuration was rejected before the cache or the network was
    /// consulted.
    #[error(transparent)]
    Config(#[from] ymaps_config::Error),

    /// The script fetch failed; carries the native error verbatim.
    #[error(transparent)]
    Fetch(#[from] ScriptError),

    /// The script's load signal fired but the API global slot stayed empty.
    #[error("script at {src} loaded without defining the API global")]
    MissingGlobal {
        /// URL of the script that misbehaved.
        src: String,
    },

    /// The entry this call was waiting on was evicted before it resolved.
    #[error("cache entry evicted while its fetch was in flight")]
    Cancelled,
}
