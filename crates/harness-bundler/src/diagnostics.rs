//! Diagnostic extraction from Rolldown errors.
//!
//! Rolldown's batched errors are flattened into [`ExtractedDiagnostic`]s that
//! the harness can log without depending on upstream error types. Each
//! diagnostic can be turned into a [`DiagnosticError`] for miette rendering.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};

/// Extracted diagnostic information from Rolldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDiagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub help: Option<String>,
}

/// Diagnostic kind (mirrors Rolldown's EventKind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingExport,
    ParseError,
    CircularDependency,
    UnresolvedEntry,
    UnresolvedImport,
    Plugin,
    Transform,
    Other,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticKind::MissingExport => "MissingExport",
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::CircularDependency => "CircularDependency",
            DiagnosticKind::UnresolvedEntry => "UnresolvedEntry",
            DiagnosticKind::UnresolvedImport => "UnresolvedImport",
            DiagnosticKind::Plugin => "Plugin",
            DiagnosticKind::Transform => "Transform",
            DiagnosticKind::Other => "Error",
        };
        f.write_str(name)
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// Extract diagnostics from Rolldown error types.
///
/// Rolldown does not expose a stable structured error API, so this works on
/// the debug representation and falls back to a single `Other` diagnostic.
pub fn extract_from_rolldown_error(error: &dyn std::fmt::Debug) -> Vec<ExtractedDiagnostic> {
    let error_str = format!("{error:?}");

    let parts: Vec<&str> = error_str
        .split("BuildDiagnostic")
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "Batched")
        .collect();

    if parts.len() > 1 {
        parts.into_iter().map(extract_single_from_string).collect()
    } else {
        vec![extract_single_from_string(&error_str)]
    }
}

/// Extract a single diagnostic from a formatted error string.
fn extract_single_from_string(error_str: &str) -> ExtractedDiagnostic {
    let kind = classify(error_str);

    let severity = if error_str.contains("Warning") || error_str.contains("warning") {
        DiagnosticSeverity::Warning
    } else {
        DiagnosticSeverity::Error
    };

    let (line, column) = extract_location(error_str);

    let help = match kind {
        DiagnosticKind::UnresolvedImport | DiagnosticKind::UnresolvedEntry => Some(
            "We're probably missing a module that a test requires. Check the import path or install the package."
                .to_string(),
        ),
        DiagnosticKind::ParseError => Some("Fix the syntax error and save the file.".to_string()),
        _ => None,
    };

    ExtractedDiagnostic {
        kind,
        severity,
        message: error_str.to_string(),
        file: extract_file_path(error_str),
        line,
        column,
        help,
    }
}

fn classify(error_str: &str) -> DiagnosticKind {
    if error_str.contains("MissingExport") {
        DiagnosticKind::MissingExport
    } else if error_str.contains("UnresolvedEntry") {
        DiagnosticKind::UnresolvedEntry
    } else if error_str.contains("UnresolvedImport")
        || error_str.contains("Could not resolve")
        || error_str.contains("Cannot resolve")
    {
        DiagnosticKind::UnresolvedImport
    } else if error_str.contains("Parse error")
        || error_str.contains("ParseError")
        || error_str.contains("Syntax")
        || error_str.contains("Expected")
    {
        DiagnosticKind::ParseError
    } else if error_str.contains("Circular") {
        DiagnosticKind::CircularDependency
    } else if error_str.contains("Plugin") {
        DiagnosticKind::Plugin
    } else if error_str.contains("Transform") {
        DiagnosticKind::Transform
    } else {
        DiagnosticKind::Other
    }
}

/// Extract the first file path that looks like a script module.
fn extract_file_path(text: &str) -> Option<String> {
    for ext in [".js", ".ts", ".jsx", ".tsx", ".mjs", ".cjs"] {
        let Some(pos) = text.find(ext) else {
            continue;
        };
        let before = &text[..pos + ext.len()];
        let start = before
            .rfind([' ', '"', '\'', '(', '\n'])
            .map_or(0, |idx| idx + 1);
        let path = before[start..].trim();
        if !path.is_empty() {
            return Some(path.to_string());
        }
    }
    None
}

/// Extract `line:column` from the first `:<n>:<m>` occurrence.
fn extract_location(text: &str) -> (Option<u32>, Option<u32>) {
    let bytes = text.as_bytes();
    for (idx, _) in text.match_indices(':') {
        let rest = &text[idx + 1..];
        let line: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if line.is_empty() {
            continue;
        }
        let after_line = idx + 1 + line.len();
        if bytes.get(after_line) != Some(&b':') {
            continue;
        }
        let column: String = text[after_line + 1..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if column.is_empty() {
            continue;
        }
        return (line.parse().ok(), column.parse().ok());
    }
    (None, None)
}

/// Miette-renderable wrapper around an [`ExtractedDiagnostic`].
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DiagnosticError {
    kind: DiagnosticKind,
    message: String,
    help: Option<String>,
    severity: DiagnosticSeverity,
}

impl Diagnostic for DiagnosticError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("harness::bundle::{}", self.kind)))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            DiagnosticSeverity::Error => miette::Severity::Error,
            DiagnosticSeverity::Warning => miette::Severity::Warning,
        })
    }
}

/// Convert an extracted diagnostic into a miette diagnostic.
pub fn to_diagnostic_error(diag: &ExtractedDiagnostic) -> DiagnosticError {
    let message = match (&diag.file, diag.line, diag.column) {
        (Some(file), Some(line), Some(column)) => {
            format!("{}\n  at {}:{}:{}", diag.message, file, line, column)
        }
        (Some(file), _, _) => format!("{}\n  in {}", diag.message, file),
        _ => diag.message.clone(),
    };

    DiagnosticError {
        kind: diag.kind.clone(),
        message,
        help: diag.help.clone(),
        severity: diag.severity.clone(),
    }
}
