use crate::capture::CaptureSettings;

/// Failures absorbed by the call-site step.
///
/// None of these ever reach the caller of
/// [`resolve`](crate::resolver::resolve); they are written to the
/// diagnostics channel and the record is passed on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CallSiteError {
    #[error("failed to capture stack trace: {0}")]
    Capture(String),

    #[error("failed to filter stack trace: {0}")]
    Filter(String),

    #[error("unable to find callee")]
    CalleeNotFound,

    #[error("failed to add call-site details to record: {0}")]
    Enrich(String),

    #[error("capture settings were not restored (expected {expected:?}, found {found:?})")]
    CaptureSettingsNotRestored {
        expected: CaptureSettings,
        found: CaptureSettings,
    },
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Write one line describing `err` to the diagnostics channel (stderr).
///
/// Tracing macros are not used here: this runs inside the subscriber and
/// would re-enter it.
pub(crate) fn report(err: &CallSiteError) {
    eprintln!("tracing-call-site: {}", err);
}

/// Best-effort text of a panic payload caught with `catch_unwind`.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload), "code 7");
    }

    #[test]
    fn error_messages_are_single_line() {
        let err = CallSiteError::Capture("no frames".to_string());
        assert_eq!(err.to_string(), "failed to capture stack trace: no frames");
        assert!(!CallSiteError::CalleeNotFound.to_string().contains('\n'));
    }
}
