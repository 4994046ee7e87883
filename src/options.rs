use serde::Deserialize;

use crate::env::{env_flag, CALL_SITE_PREPEND_ENV, CALL_SITE_REMOVE_EXTENSION_ENV};

/// Options for one call-site formatting step.
///
/// **Fields**
/// - `prepend`: if `true`, the message is rewritten as `<source>: <message>`
///   instead of adding `typeName` / `functionName` / `methodName` /
///   `fileName` / `lineNumber` fields.
/// - `remove_extension`: if `true`, the file name in the prepended label
///   loses its extension (`main.rs` becomes `main`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallSiteOptions {
    pub prepend: bool,
    pub remove_extension: bool,
}

impl CallSiteOptions {
    /// Options read from `CALL_SITE_PREPEND` and `CALL_SITE_REMOVE_EXTENSION`.
    pub fn from_env() -> Self {
        Self {
            prepend: env_flag(CALL_SITE_PREPEND_ENV, false),
            remove_extension: env_flag(CALL_SITE_REMOVE_EXTENSION_ENV, false),
        }
    }
}
