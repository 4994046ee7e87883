//! Call-site resolution.
//!
//! Each call is one self-contained transaction: capture the stack with the
//! structured capture mode borrowed for the duration of the capture, pick
//! the first frame the [`FrameFilter`] accepts, then either prepend a label
//! to the message or copy the frame's location into the record's fields.
//! Nothing escapes to the caller; failures go to the diagnostics channel.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::capture::{self, capture_settings, CaptureGuard, CaptureSettings, Trace};
use crate::error::{panic_message, report, CallSiteError};
use crate::filter::{FrameFilter, UNKNOWN_FILE};
use crate::frame::{StackFrame, GENERIC_TYPE_NAME};
use crate::options::CallSiteOptions;
use crate::record::LogRecord;

pub const TYPE_NAME_FIELD: &str = "typeName";
pub const FUNCTION_NAME_FIELD: &str = "functionName";
pub const METHOD_NAME_FIELD: &str = "methodName";
pub const FILE_NAME_FIELD: &str = "fileName";
pub const LINE_NUMBER_FIELD: &str = "lineNumber";

/// Attach the caller's location to `record` using the default frame filter.
///
/// Always returns the record it was given, enriched if a call site was found
/// and unchanged otherwise.
pub fn resolve<'r>(record: &'r mut LogRecord, options: &CallSiteOptions) -> &'r mut LogRecord {
    resolve_with_filter(record, options, &FrameFilter::DEFAULT)
}

/// [`resolve`] with a caller-supplied [`FrameFilter`].
pub fn resolve_with_filter<'r>(
    record: &'r mut LogRecord,
    options: &CallSiteOptions,
    filter: &FrameFilter,
) -> &'r mut LogRecord {
    let before = capture_settings();

    let trace = {
        let _guard = CaptureGuard::engage(CaptureSettings::STRUCTURED);
        panic::catch_unwind(capture::capture)
    };

    match find_callee(trace, filter) {
        Ok(callee) => {
            if let Err(err) = enrich(record, &callee, options) {
                report(&err);
            }
        }
        Err(err) => report(&err),
    }

    if let Some(err) = check_restored(before, capture_settings()) {
        report(&err);
    }

    record
}

/// Error to report when the capture settings differ from the ones seen
/// before the call.
fn check_restored(before: CaptureSettings, after: CaptureSettings) -> Option<CallSiteError> {
    (after != before).then_some(CallSiteError::CaptureSettingsNotRestored {
        expected: before,
        found: after,
    })
}

/// First application frame of a capture.
fn find_callee(
    trace: std::thread::Result<Result<Trace, CallSiteError>>,
    filter: &FrameFilter,
) -> Result<StackFrame, CallSiteError> {
    let frames = match trace {
        Err(payload) => return Err(CallSiteError::Capture(panic_message(payload))),
        Ok(Err(err)) => return Err(err),
        Ok(Ok(Trace::Text(_))) => {
            return Err(CallSiteError::Capture(
                "capture produced text instead of structured frames".to_string(),
            ))
        }
        Ok(Ok(Trace::Structured(frames))) => frames,
    };

    panic::catch_unwind(AssertUnwindSafe(|| {
        frames
            .into_iter()
            .find(|frame| filter.is_application_frame(frame))
    }))
    .map_err(|payload| CallSiteError::Filter(panic_message(payload)))?
    .ok_or(CallSiteError::CalleeNotFound)
}

fn enrich(
    record: &mut LogRecord,
    callee: &StackFrame,
    options: &CallSiteOptions,
) -> Result<(), CallSiteError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        if options.prepend {
            let source = derive_label(callee, options);
            record.message = format!("{}: {}", source, record.message);
        } else {
            record.set_field(TYPE_NAME_FIELD, callee.type_name.clone());
            record.set_field(FUNCTION_NAME_FIELD, callee.function_name.clone());
            record.set_field(METHOD_NAME_FIELD, callee.method_name.clone());
            record.set_field(FILE_NAME_FIELD, callee.file_name.clone());
            record.set_field(LINE_NUMBER_FIELD, callee.line_number);
        }
    }))
    .map_err(|payload| CallSiteError::Enrich(panic_message(payload)))
}

/// Single-line source label for `frame`; first matching rule wins:
///
/// 1. anonymous frame with a dotted function path: the path as-is
///    (`handle.{closure}`);
/// 2. type and method: `Type.method`;
/// 3. function: `<file>.function`;
/// 4. otherwise: `<file>:<line>`.
pub fn derive_label(frame: &StackFrame, options: &CallSiteOptions) -> String {
    let type_name = frame.type_name.as_deref();
    let method_name = frame.method_name.as_deref();
    let function_name = frame.function_name.as_deref();

    match (type_name, method_name, function_name) {
        (Some(GENERIC_TYPE_NAME), _, Some(function)) if function.contains('.') => {
            function.to_string()
        }
        (Some(ty), Some(method), _) => format!("{}.{}", ty, method),
        (_, _, Some(function)) => format!(
            "{}.{}",
            display_file_name(frame.file_name.as_deref(), options.remove_extension),
            function
        ),
        _ => {
            let file = display_file_name(frame.file_name.as_deref(), options.remove_extension);
            match frame.line_number {
                Some(line) => format!("{}:{}", file, line),
                None => format!("{}:?", file),
            }
        }
    }
}

/// Last path segment of `path`, optionally without its extension.
pub fn display_file_name(path: Option<&str>, remove_extension: bool) -> String {
    let Some(path) = path else {
        return UNKNOWN_FILE.to_string();
    };
    let normalized = path.replace('\\', "/");
    let path = Path::new(&normalized);
    let name = if remove_extension {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| normalized.clone())
}
