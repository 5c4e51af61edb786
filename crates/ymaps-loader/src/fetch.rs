//! One-shot script fetch against a host.

use tracing::{debug, trace};

use crate::host::{ScriptAttrs, ScriptError, ScriptHost};

/// Append one script and await its load-or-error signal exactly once.
///
/// Both listeners are dropped as soon as either fires. Retry policy, if
/// any, belongs to the caller issuing a new fetch.
pub(crate) async fn fetch_script(
    host: &dyn ScriptHost,
    attrs: ScriptAttrs,
) -> Result<(), ScriptError> {
    debug!(src = %attrs.src, "appending api script");
    let mut listeners = host.append_script(&attrs);
    let outcome = tokio::select! {
        biased;
        loaded = &mut listeners.loaded => match loaded {
            Ok(()) => Ok(()),
            Err(_) => Err(ScriptError::new("host dropped the load signal")),
        },
        failed = &mut listeners.failed => match failed {
            Ok(error) => Err(error),
            Err(_) => Err(ScriptError::new("host dropped the error signal")),
        },
    };
    drop(listeners);
    trace!(ok = outcome.is_ok(), "script signal received, listeners detached");
    outcome
}
