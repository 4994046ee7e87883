use crate::frame::StackFrame;

/// Stand-in for frames without a source path so path checks stay total.
pub const UNKNOWN_FILE: &str = "<unknown file>";

const REGISTRY_ROOT: &str = "/.cargo/registry/src/";
const GIT_CHECKOUT_ROOT: &str = "/.cargo/git/checkouts/";
const VENDOR_ROOT: &str = "/vendor/";

/// Decides which frames belong to the logging pipeline itself.
///
/// Frames from the libraries listed here are skipped when looking for the
/// call site. Extending the filter only means adding entries to these lists.
///
/// ```rust
/// use tracing_call_site::filter::FrameFilter;
///
/// let filter = FrameFilter {
///     internal_libraries: &["tracing", "tracing-core", "tracing-subscriber", "my-log-facade"],
///     ..FrameFilter::DEFAULT
/// };
/// # let _ = filter;
/// ```
#[derive(Copy, Clone, Debug)]
pub struct FrameFilter {
    /// `(type, method)` pairs that are pipeline entry points.
    pub internal_entry_points: &'static [(&'static str, &'static str)],
    /// Types whose every method is pipeline plumbing.
    pub internal_types: &'static [&'static str],
    /// Crate names matched against dependency directories (`<name>-<version>`)
    /// and against the root of the frame's module path.
    pub internal_libraries: &'static [&'static str],
    /// Raw fragments matched as substrings of the normalized source path.
    pub internal_path_fragments: &'static [&'static str],
    /// Bare runtime symbols (no module path) such as the unwinding and
    /// thread start trampolines.
    pub internal_symbols: &'static [&'static str],
}

impl FrameFilter {
    pub const DEFAULT: Self = Self {
        internal_entry_points: &[("CallSiteFormat", "transform")],
        internal_types: &["CallSiteLayer"],
        internal_libraries: &[
            "tracing",
            "tracing-core",
            "tracing-subscriber",
            "tracing-log",
            "backtrace",
            "tracing-call-site",
            "std",
            "core",
            "alloc",
        ],
        internal_path_fragments: &["/library/std/src/", "/library/core/src/", "/library/alloc/src/"],
        internal_symbols: &[
            "__rust_try",
            "__rust_begin_short_backtrace",
            "__rust_end_short_backtrace",
            "start_thread",
            "clone",
            "clone3",
            "thread_start",
            "_start",
            "main",
            "__libc_start_main",
            "__libc_start_call_main",
            "__libc_start_main_impl",
            "BaseThreadInitThunk",
            "RtlUserThreadStart",
        ],
    };

    /// Returns `false` if `frame` is part of the logging pipeline and should
    /// be skipped, `true` if it is application code.
    pub fn is_application_frame(&self, frame: &StackFrame) -> bool {
        let type_name = frame.type_name.as_deref();
        let method_name = frame.method_name.as_deref();

        if let Some(ty) = type_name {
            if self.internal_types.contains(&ty) {
                return false;
            }
            if self
                .internal_entry_points
                .iter()
                .any(|&(t, m)| t == ty && method_name == Some(m))
            {
                return false;
            }
        }

        let file_name = frame
            .file_name
            .as_deref()
            .unwrap_or(UNKNOWN_FILE)
            .replace('\\', "/");
        if self
            .internal_path_fragments
            .iter()
            .any(|fragment| file_name.contains(fragment))
        {
            return false;
        }

        if self
            .internal_libraries
            .iter()
            .any(|lib| from_dependency(&file_name, lib))
        {
            return false;
        }

        if frame.module_path.is_none() && frame.type_name.is_none() {
            if let Some(function) = frame.function_name.as_deref() {
                if self.internal_symbols.contains(&function) {
                    return false;
                }
            }
        }

        if let Some(root) = frame
            .module_path
            .as_deref()
            .and_then(|m| m.split("::").next())
        {
            if self
                .internal_libraries
                .iter()
                .any(|lib| lib.replace('-', "_") == root)
            {
                return false;
            }
        }

        true
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// [`FrameFilter::is_application_frame`] with the default filter.
pub fn is_application_frame(frame: &StackFrame) -> bool {
    FrameFilter::DEFAULT.is_application_frame(frame)
}

/// Whether `path` lies in the source directory of the dependency `library`.
///
/// Only the crate directory directly under a dependency root counts:
/// `registry/src/<index>/<library>-<version>/`, `vendor/<library>/` and
/// `git/checkouts/<repo>-<hash>/<rev>/<library>/` (or the repo directory
/// itself when the checkout is a single crate).
fn from_dependency(path: &str, library: &str) -> bool {
    let after = |root: &'static str| {
        path.match_indices(root)
            .map(move |(at, _)| path[at + root.len()..].split('/').collect::<Vec<_>>())
    };

    let registry = after(REGISTRY_ROOT)
        .any(|segments| segments.get(1).is_some_and(|dir| is_crate_dir(dir, library)));
    let vendored = after(VENDOR_ROOT)
        .any(|segments| segments.first().is_some_and(|dir| is_crate_dir(dir, library)));
    let checkout = after(GIT_CHECKOUT_ROOT).any(|segments| match segments.get(2) {
        Some(&"src") => segments
            .first()
            .is_some_and(|repo| is_checkout_dir(repo, library)),
        Some(member) => is_crate_dir(member, library),
        None => false,
    });

    registry || vendored || checkout
}

/// `<library>` or `<library>-<version>`.
fn is_crate_dir(dir: &str, library: &str) -> bool {
    match dir.strip_prefix(library) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|version| version.starts_with(|c: char| c.is_ascii_digit())),
        None => false,
    }
}

/// `<library>-<hash>`, the layout cargo uses for git checkouts.
fn is_checkout_dir(dir: &str, library: &str) -> bool {
    dir.strip_prefix(library)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hash| !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame_in(file: &str) -> StackFrame {
        StackFrame {
            file_name: Some(file.to_string()),
            function_name: Some("f".to_string()),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/tracing-core-0.1.32/src/dispatcher.rs")]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/tracing-0.1.40/src/lib.rs")]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/tracing-subscriber-0.3.18/src/layer/layered.rs")]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/backtrace-0.3.71/src/backtrace/mod.rs")]
    #[case("C:\\Users\\u\\.cargo\\registry\\src\\index.crates.io-6f17d22bba15001f\\tracing-log-0.2.0\\src\\lib.rs")]
    #[case("/work/app/vendor/tracing-call-site/src/resolver.rs")]
    #[case("/home/u/.cargo/git/checkouts/tracing-3f1a2b9c0d4e5f67/5e6f7a8/tracing-subscriber/src/fmt/mod.rs")]
    #[case("/home/u/.cargo/git/checkouts/backtrace-0a1b2c3d4e5f6789/abc1234/src/lib.rs")]
    #[case("/rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/std/src/thread/local.rs")]
    #[case("/rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/core/src/ops/function.rs")]
    fn internal_paths_are_filtered(#[case] file: &str) {
        assert!(!is_application_frame(&frame_in(file)));
    }

    #[rstest]
    #[case("/work/app/src/main.rs")]
    #[case("/work/tracing-experiments/src/main.rs")]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/tracing-attributes-0.1.27/src/lib.rs")]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/hyper-1.4.1/src/server/conn.rs")]
    #[case("/work/vendor/shop/src/tracing/mod.rs")]
    #[case("/work/vendor/shop/src/core/orders.rs")]
    #[case("/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/shop-0.2.0/src/tracing/mod.rs")]
    fn application_paths_are_kept(#[case] file: &str) {
        assert!(is_application_frame(&frame_in(file)));
    }

    #[test]
    fn format_transform_entry_point_is_filtered() {
        let frame = StackFrame {
            type_name: Some("CallSiteFormat".to_string()),
            method_name: Some("transform".to_string()),
            file_name: Some("/work/app/src/main.rs".to_string()),
            ..Default::default()
        };
        assert!(!is_application_frame(&frame));

        let other_method = StackFrame {
            method_name: Some("new".to_string()),
            ..frame
        };
        assert!(is_application_frame(&other_method));
    }

    #[test]
    fn layer_type_is_filtered_for_any_method() {
        let frame = StackFrame {
            type_name: Some("CallSiteLayer".to_string()),
            method_name: Some("on_event".to_string()),
            ..Default::default()
        };
        assert!(!is_application_frame(&frame));
    }

    #[test]
    fn module_root_filters_frames_without_files() {
        let frame = StackFrame::from_symbol_name("tracing_core::event::Event::dispatch");
        assert_eq!(frame.file_name, None);
        assert!(!is_application_frame(&frame));

        let app = StackFrame::from_symbol_name("billing::invoice::Invoice::send");
        assert!(is_application_frame(&app));
    }

    #[rstest]
    #[case("__rust_try")]
    #[case("start_thread")]
    #[case("clone3")]
    #[case("__libc_start_main")]
    #[case("_start")]
    fn runtime_trampolines_are_filtered(#[case] symbol: &str) {
        let frame = StackFrame::from_symbol_name(symbol);
        assert_eq!(frame.module_path, None);
        assert_eq!(frame.file_name, None);
        assert!(!is_application_frame(&frame));
    }

    #[test]
    fn same_name_inside_a_module_is_application_code() {
        assert!(is_application_frame(&StackFrame::from_symbol_name("shop::main")));
        assert!(is_application_frame(&StackFrame::from_symbol_name("shop::jobs::start_thread")));
    }

    #[test]
    fn frame_without_symbol_is_handled() {
        assert!(is_application_frame(&StackFrame::default()));
    }

    #[test]
    fn custom_fragment_extends_default() {
        let filter = FrameFilter {
            internal_path_fragments: &["/library/std/src/", "/src/log_facade/"],
            ..FrameFilter::DEFAULT
        };
        assert!(!filter.is_application_frame(&frame_in("/work/app/src/log_facade/mod.rs")));
        assert!(filter.is_application_frame(&frame_in("/work/app/src/main.rs")));
    }
}
