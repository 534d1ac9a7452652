//! Source capture for the test-run bundle.
//!
//! The browser reports failures with stack positions into the bundle. To show
//! the offending lines, the run page needs the bundle's own source text, which
//! is stored in a global right before the source-map trailer.

/// Marker that starts the source-map trailer emitted by the bundler.
pub const SOURCE_MAP_MARKER: &str = "//# sourceMappingURL";

/// Global that receives the captured bundle text.
pub const SOURCE_CAPTURE_GLOBAL: &str = "window.__source_code = window.parent.__source_code";

/// Splice a source-capture assignment into a bundle.
///
/// The assignment is inserted immediately before the last source-map marker
/// and its value is the bundle text that precedes the marker. When the bundle
/// has no marker the whole text is captured and the assignment is appended at
/// the end.
///
/// # Examples
///
/// ```
/// use harness_bundler::inject_source_capture;
///
/// let out = inject_source_capture("var a = 1;\n//# sourceMappingURL=data:x");
/// assert!(out.starts_with("var a = 1;\n\n\nwindow.__source_code"));
/// assert!(out.ends_with("//# sourceMappingURL=data:x"));
/// ```
pub fn inject_source_capture(code: &str) -> String {
    let split = code.rfind(SOURCE_MAP_MARKER).unwrap_or(code.len());
    let (source, trailer) = code.split_at(split);

    // A str always serializes to JSON.
    let captured = serde_json::to_string(source).unwrap_or_else(|_| "\"\"".to_string());

    let mut out = String::with_capacity(code.len() * 2 + SOURCE_CAPTURE_GLOBAL.len() + 16);
    out.push_str(source);
    out.push_str("\n\n");
    out.push_str(SOURCE_CAPTURE_GLOBAL);
    out.push_str(" = ");
    out.push_str(&captured);
    out.push_str(";\n\n");
    out.push_str(trailer);
    out
}
