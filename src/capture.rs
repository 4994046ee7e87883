//! Stack capture and the shared capture configuration.
//!
//! The configuration (output format plus depth limit) is shared by every
//! capture on a thread. Code that needs a particular mode borrows it with a
//! [`CaptureGuard`], which puts the previous value back when dropped, also
//! while unwinding.

use std::cell::Cell;
use std::fmt::Write as _;

use crate::error::CallSiteError;
use crate::frame::StackFrame;

/// Depth used by the call-site resolver; deep enough to get past the
/// subscriber and dispatcher frames.
pub const CAPTURE_DEPTH_LIMIT: usize = 50;

/// Shape of the value produced by [`capture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// One human-readable line per frame.
    Text,
    /// Structured [`StackFrame`] descriptors.
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub format: TraceFormat,
    /// Maximum number of frames kept by a capture.
    pub depth_limit: usize,
}

impl CaptureSettings {
    /// Settings the call-site resolver installs for its capture.
    pub const STRUCTURED: Self = Self {
        format: TraceFormat::Structured,
        depth_limit: CAPTURE_DEPTH_LIMIT,
    };
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            format: TraceFormat::Text,
            depth_limit: 10,
        }
    }
}

thread_local! {
    static SETTINGS: Cell<CaptureSettings> = Cell::new(CaptureSettings::default());
}

/// Current capture settings of this thread.
pub fn capture_settings() -> CaptureSettings {
    SETTINGS.try_with(Cell::get).unwrap_or_default()
}

/// Replace the capture settings of this thread, returning the previous ones.
pub fn set_capture_settings(settings: CaptureSettings) -> CaptureSettings {
    SETTINGS
        .try_with(|s| s.replace(settings))
        .unwrap_or_default()
}

/// Scoped override of the capture settings.
///
/// ```rust
/// use tracing_call_site::capture::{capture_settings, CaptureGuard, CaptureSettings};
///
/// let before = capture_settings();
/// {
///     let _guard = CaptureGuard::engage(CaptureSettings::STRUCTURED);
///     assert_eq!(capture_settings(), CaptureSettings::STRUCTURED);
/// }
/// assert_eq!(capture_settings(), before);
/// ```
#[must_use = "the previous settings are restored as soon as the guard is dropped"]
pub struct CaptureGuard {
    saved: CaptureSettings,
}

impl CaptureGuard {
    pub fn engage(settings: CaptureSettings) -> Self {
        let saved = set_capture_settings(settings);
        Self { saved }
    }

    /// Settings that will be restored on drop.
    pub fn saved(&self) -> CaptureSettings {
        self.saved
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        set_capture_settings(self.saved);
    }
}

/// Result of a capture, shaped by [`CaptureSettings::format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    Text(String),
    Structured(Vec<StackFrame>),
}

/// Capture the current call stack using this thread's settings.
///
/// Frames are ordered innermost first; index 0 is the caller of `capture`.
/// Frames of the stack walker and of this module are skipped, and at most
/// `depth_limit` frames are kept.
pub fn capture() -> Result<Trace, CallSiteError> {
    let settings = capture_settings();
    let own_module = module_path!();
    let mut frames: Vec<StackFrame> = Vec::new();
    let mut leading = true;

    backtrace::trace(|raw| {
        backtrace::resolve_frame(raw, |symbol| {
            if frames.len() >= settings.depth_limit {
                return;
            }
            let Some(frame) = StackFrame::from_symbol(symbol) else {
                return;
            };
            if leading {
                let module = frame.module_path.as_deref().unwrap_or_default();
                if module == own_module || module.split("::").next() == Some("backtrace") {
                    return;
                }
                leading = false;
            }
            frames.push(frame);
        });

        frames.len() < settings.depth_limit
    });

    if frames.is_empty() {
        return Err(CallSiteError::Capture("no frames captured".to_string()));
    }

    Ok(match settings.format {
        TraceFormat::Structured => Trace::Structured(frames),
        TraceFormat::Text => {
            let mut text = String::new();
            for frame in &frames {
                // Writing to a String cannot fail.
                let _ = writeln!(text, "    at {}", frame);
            }
            Trace::Text(text)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_text_with_small_depth() {
        std::thread::spawn(|| {
            assert_eq!(
                capture_settings(),
                CaptureSettings {
                    format: TraceFormat::Text,
                    depth_limit: 10
                }
            );
        })
        .join()
        .unwrap();
    }

    #[test]
    fn nested_guards_restore_in_order() {
        let outer_before = capture_settings();
        {
            let outer = CaptureGuard::engage(CaptureSettings::STRUCTURED);
            assert_eq!(outer.saved(), outer_before);
            {
                let inner = CaptureGuard::engage(CaptureSettings {
                    format: TraceFormat::Text,
                    depth_limit: 3,
                });
                assert_eq!(inner.saved(), CaptureSettings::STRUCTURED);
                assert_eq!(capture_settings().depth_limit, 3);
            }
            assert_eq!(capture_settings(), CaptureSettings::STRUCTURED);
        }
        assert_eq!(capture_settings(), outer_before);
    }

    #[test]
    fn guard_restores_while_unwinding() {
        let before = capture_settings();
        let result = std::panic::catch_unwind(|| {
            let _guard = CaptureGuard::engage(CaptureSettings::STRUCTURED);
            panic!("capture blew up");
        });
        assert!(result.is_err());
        assert_eq!(capture_settings(), before);
    }

    #[test]
    fn settings_are_per_thread() {
        let _guard = CaptureGuard::engage(CaptureSettings::STRUCTURED);
        let other = std::thread::spawn(capture_settings).join().unwrap();
        assert_eq!(other, CaptureSettings::default());
        assert_eq!(capture_settings(), CaptureSettings::STRUCTURED);
    }

    #[test]
    fn structured_capture_respects_depth_limit() {
        let _guard = CaptureGuard::engage(CaptureSettings {
            format: TraceFormat::Structured,
            depth_limit: 2,
        });
        match capture().unwrap() {
            Trace::Structured(frames) => assert!(!frames.is_empty() && frames.len() <= 2),
            Trace::Text(_) => panic!("expected structured trace"),
        }
    }

    #[test]
    fn text_capture_renders_lines() {
        let _guard = CaptureGuard::engage(CaptureSettings {
            format: TraceFormat::Text,
            depth_limit: 5,
        });
        match capture().unwrap() {
            Trace::Text(text) => {
                assert!(text.lines().count() <= 5);
                assert!(text.lines().all(|l| l.starts_with("    at ")));
            }
            Trace::Structured(_) => panic!("expected text trace"),
        }
    }
}
