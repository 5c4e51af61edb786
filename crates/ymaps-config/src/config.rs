//! The configuration value type and its derived cache key.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::Error, url::script_url};

/// Version marker used by the next major API generation. That generation is
/// bootstrapped through a package import, not a script URL, so a
/// configuration carrying it can never be satisfied by this loader.
const NEXT_GENERATION_MARKER: &str = "v3";

/// Interface language of the loaded API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lang {
    /// Russian, Russia.
    #[default]
    #[serde(rename = "ru_RU")]
    RuRu,
    /// English, United States.
    #[serde(rename = "en_US")]
    EnUs,
    /// English, Russia.
    #[serde(rename = "en_RU")]
    EnRu,
    /// Russian, Ukraine.
    #[serde(rename = "ru_UA")]
    RuUa,
    /// Ukrainian, Ukraine.
    #[serde(rename = "uk_UA")]
    UkUa,
    /// Turkish, Turkey.
    #[serde(rename = "tr_TR")]
    TrTr,
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::RuRu => "ru_RU",
            Self::EnUs => "en_US",
            Self::EnRu => "en_RU",
            Self::RuUa => "ru_UA",
            Self::UkUa => "uk_UA",
            Self::TrTr => "tr_TR",
        };
        f.write_str(code)
    }
}

/// Order of coordinates passed to API functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordOrder {
    /// Latitude first (the API default).
    #[serde(rename = "latlong")]
    LatLong,
    /// Longitude first.
    #[serde(rename = "longlat")]
    LongLat,
}

impl fmt::Display for CoordOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LatLong => "latlong",
            Self::LongLat => "longlat",
        })
    }
}

/// Which build of the API script to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Minified production build.
    #[serde(rename = "release")]
    Release,
    /// Readable build with debug assertions.
    #[serde(rename = "debug")]
    Debug,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Release => "release",
            Self::Debug => "debug",
        })
    }
}

/// Everything the script URL can carry, plus the enterprise host switch.
///
/// Two configurations are interchangeable exactly when they build the same
/// script URL; [`ApiConfig::cache_key`] is derived from the URL so that
/// equivalence is what the loader caches on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key issued by the developer dashboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
    /// Separate key for the suggest service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggest_apikey: Option<String>,
    /// Interface language.
    #[serde(default)]
    pub lang: Lang,
    /// Coordinate order for API calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordorder: Option<CoordOrder>,
    /// Comma-separated package list to load, e.g. `package.full`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<String>,
    /// Script build to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Request the Content-Security-Policy-compatible build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csp: Option<bool>,
    /// API version; [`crate::DEFAULT_VERSION`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Fetch from the commercial host instead of the public one.
    #[serde(default)]
    pub enterprise: bool,
}

impl ApiConfig {
    /// Reject configurations this loader cannot satisfy.
    ///
    /// Runs before key derivation, so an incompatible configuration never
    /// reaches the cache or the network.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(version) = &self.version {
            if version == NEXT_GENERATION_MARKER {
                warn!(version = %version, "rejecting configuration for unsupported API generation");
                return Err(Error::IncompatibleVersion {
                    version: version.clone(),
                });
            }
        }
        Ok(())
    }

    /// Derive the cache index for this configuration.
    ///
    /// The built script URL is the key: configurations that fetch the same
    /// script are the same entry by construction.
    #[must_use]
    pub fn cache_key(&self) -> ConfigKey {
        ConfigKey(script_url(self))
    }
}

/// Deterministic cache index derived from an [`ApiConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// The key as a string, which is also the script URL it was derived from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
