//! Script URL construction.

use std::fmt::Write as _;

use crate::config::ApiConfig;

/// Public script host.
pub const STANDARD_HOST: &str = "https://api-maps.yandex.ru";

/// Commercial script host used when the enterprise flag is set.
pub const ENTERPRISE_HOST: &str = "https://enterprise.api-maps.yandex.ru";

/// API version fetched when the configuration does not pin one.
pub const DEFAULT_VERSION: &str = "2.1";

/// Build the fetchable script URL for a configuration.
///
/// The query parameters appear in a fixed declared order, and only when the
/// corresponding field is present:
/// `lang`, `apikey`, `suggest_apikey`, `coordorder`, `load`, `mode`, `csp`.
#[must_use]
pub fn script_url(config: &ApiConfig) -> String {
    let host = if config.enterprise {
        ENTERPRISE_HOST
    } else {
        STANDARD_HOST
    };
    let version = config.version.as_deref().unwrap_or(DEFAULT_VERSION);

    let mut url = format!("{}/{}/?lang={}", host, version, config.lang);
    let mut push = |name: &str, value: &str| {
        // Writing to a String cannot fail.
        let _ = write!(url, "&{}={}", name, value);
    };

    if let Some(apikey) = &config.apikey {
        push("apikey", apikey);
    }
    if let Some(suggest_apikey) = &config.suggest_apikey {
        push("suggest_apikey", suggest_apikey);
    }
    if let Some(coordorder) = &config.coordorder {
        push("coordorder", &coordorder.to_string());
    }
    if let Some(load) = &config.load {
        push("load", load);
    }
    if let Some(mode) = &config.mode {
        push("mode", &mode.to_string());
    }
    if let Some(csp) = config.csp {
        push("csp", if csp { "true" } else { "false" });
    }

    url
}
