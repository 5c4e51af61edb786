//! Configuration types for the Yandex.Maps JS API loader.
//!
//! The API is delivered as a script that the host document fetches from a
//! versioned URL; every knob the script accepts travels in that URL's query
//! string. This crate owns the value types for those knobs and the two pure
//! derivations the loader builds on:
//! - [`script_url`]: configuration -> fetchable script URL
//! - [`ApiConfig::cache_key`]: configuration -> cache index
//!
//! Validation lives here too: a configuration requesting the incompatible
//! next major generation of the API is rejected before any key or URL is
//! derived.

mod config;
mod error;
mod url;

pub use config::{ApiConfig, ConfigKey, CoordOrder, Lang, Mode};
pub use error::{Error, Result};
pub use url::{DEFAULT_VERSION, ENTERPRISE_HOST, STANDARD_HOST, script_url};
