//! Error types for configuration validation.

use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for configuration operations.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while validating a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The configuration requests an API generation this loader cannot
    /// bootstrap. The next major generation ships as an NPM package with its
    /// own loader and is not script-URL compatible.
    #[error(
        "API version {version:?} is not supported by this loader; \
         versions prior to 3.0 use the script bootstrap, later ones do not"
    )]
    IncompatibleVersion {
        /// The rejected version marker as the caller supplied it.
        version: String,
    },
}
