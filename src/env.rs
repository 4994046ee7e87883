//! Environment variable names used by this crate for configuring the
//! call-site step without code changes.
//!
//! These are purely helpers; [`CallSiteOptions`](crate::options::CallSiteOptions)
//! can always be built explicitly.

/// Prepend the call-site label to the message instead of adding fields.
pub const CALL_SITE_PREPEND_ENV: &str = "CALL_SITE_PREPEND";

/// Strip the extension from the file name shown in prepended labels.
pub const CALL_SITE_REMOVE_EXTENSION_ENV: &str = "CALL_SITE_REMOVE_EXTENSION";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a boolean flag; `1`, `true`, `yes` and `on` (any case) are true,
/// anything else, including an unset variable, is `default`.
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => parse_flag(&value).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("No"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn unset_variable_uses_default() {
        assert!(env_flag("CALL_SITE_TEST_SURELY_UNSET_FLAG", true));
        assert_eq!(env_or("CALL_SITE_TEST_SURELY_UNSET_VALUE", "x"), "x");
    }
}
