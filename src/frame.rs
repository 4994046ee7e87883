use std::fmt;

/// Type name given to anonymous frames (closures, async blocks).
///
/// For such frames `function_name` holds the dotted path of the named items
/// enclosing the closure, e.g. `Service.call.{closure}`.
pub const GENERIC_TYPE_NAME: &str = "{closure}";

/// Read-only view of one entry of a captured call stack.
///
/// Every field is optional: frames without debug info have no file or
/// line, and frames of free functions have no type or method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    /// Demangled symbol, without the trailing hash.
    pub symbol: Option<String>,
    /// Module the frame's item lives in, e.g. `tracing_core::event`.
    pub module_path: Option<String>,
    pub type_name: Option<String>,
    pub method_name: Option<String>,
    pub function_name: Option<String>,
    /// Full source path as recorded in debug info.
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
}

impl StackFrame {
    /// Build a descriptor from a resolved `backtrace` symbol.
    ///
    /// Returns `None` when the symbol carries neither a name nor a file.
    pub fn from_symbol(symbol: &backtrace::Symbol) -> Option<Self> {
        let name = symbol.name().map(|n| format!("{:#}", n));
        let file_name = symbol
            .filename()
            .map(|p| p.to_string_lossy().into_owned());
        if name.is_none() && file_name.is_none() {
            return None;
        }

        let mut frame = name
            .as_deref()
            .map(Self::from_symbol_name)
            .unwrap_or_default();
        frame.file_name = file_name;
        frame.line_number = symbol.lineno();
        Some(frame)
    }

    /// Split a demangled symbol path into module, type, method and function.
    ///
    /// Handles qualified paths (`<app::Foo as Trait>::bar`, `<app::Foo<T>>::bar`),
    /// generic arguments and closure markers of both mangling schemes
    /// (`{{closure}}`, `{closure#0}`).
    pub fn from_symbol_name(symbol: &str) -> Self {
        let symbol = symbol.trim();
        let (segments, explicit_type) = path_segments(symbol);

        let mut frame = StackFrame {
            symbol: Some(symbol.to_string()),
            ..Default::default()
        };

        let Some(item) = segments.iter().rposition(|s| !is_anonymous(s)) else {
            // Nothing but anonymous segments.
            if !segments.is_empty() {
                frame.type_name = Some(GENERIC_TYPE_NAME.to_string());
                frame.function_name = Some(segments.join("."));
            }
            return frame;
        };

        let type_index = explicit_type.or_else(|| {
            (item > 0 && starts_uppercase(&segments[item - 1])).then(|| item - 1)
        });
        let start = type_index.unwrap_or(item);
        let last = segments.len() - 1;

        if start > 0 {
            frame.module_path = Some(segments[..start].join("::"));
        }

        if item < last {
            frame.type_name = Some(GENERIC_TYPE_NAME.to_string());
            frame.function_name = Some(segments[start..].join("."));
        } else if type_index.is_some() && start + 1 == last {
            frame.type_name = Some(segments[start].clone());
            frame.method_name = Some(segments[last].clone());
            frame.function_name = Some(segments[last].clone());
        } else {
            frame.function_name = Some(segments[last].clone());
        }

        frame
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol.as_deref().unwrap_or("<unknown>"))?;
        if let Some(file) = &self.file_name {
            write!(f, " ({}", file)?;
            if let Some(line) = self.line_number {
                write!(f, ":{}", line)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Segments of a symbol path with generics removed and closure markers
/// normalized, plus the index of the impl self type when the path is
/// qualified.
fn path_segments(path: &str) -> (Vec<String>, Option<usize>) {
    let raw = split_top_level(path, "::");
    let mut segments = Vec::with_capacity(raw.len());
    let mut explicit_type = None;

    for (i, segment) in raw.iter().enumerate() {
        if i == 0 && segment.starts_with('<') && segment.ends_with('>') {
            let inner = &segment[1..segment.len() - 1];
            let self_ty = split_top_level(inner, " as ")[0];
            let (self_segments, _) = path_segments(strip_type_prefix(self_ty));
            if !self_segments.is_empty() {
                segments.extend(self_segments);
                explicit_type = Some(segments.len() - 1);
            }
            continue;
        }

        if is_anonymous(segment) {
            segments.push(GENERIC_TYPE_NAME.to_string());
        } else {
            let name = strip_generics(segment);
            if !name.is_empty() {
                segments.push(name.to_string());
            }
        }
    }

    (segments, explicit_type)
}

/// Split `path` on `separator` outside of `<>`, `()` and `[]`.
fn split_top_level<'a>(path: &'a str, separator: &str) -> Vec<&'a str> {
    let bytes = path.as_bytes();
    let sep = separator.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            // `->` in fn pointer types is not a closing bracket.
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && bytes[i..].starts_with(sep) => {
                parts.push(&path[start..i]);
                i += sep.len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&path[start..]);
    parts
}

fn strip_type_prefix(ty: &str) -> &str {
    let mut ty = ty.trim();
    for prefix in ["&", "mut ", "*const ", "*mut ", "dyn "] {
        while let Some(rest) = ty.strip_prefix(prefix) {
            ty = rest.trim_start();
        }
    }
    ty
}

fn strip_generics(segment: &str) -> &str {
    match segment.find('<') {
        Some(i) => &segment[..i],
        None => segment,
    }
}

fn is_anonymous(segment: &str) -> bool {
    segment.starts_with('{')
}

fn starts_uppercase(segment: &str) -> bool {
    segment.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}
