//! Text rendering for results and failures.

use super::UserAgent;
use crate::session::protocol::{FailMessage, ResultMessage, TestFailure};
use owo_colors::OwoColorize;
use regex::Regex;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::sync::LazyLock;

/// Source lines shown above the failing line.
const CONTEXT_LINES: usize = 2;

static FRAME_LOCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r":(\d+):(\d+)\)?\s*$").ok());

/// One line summarising a finished run.
pub fn format_result(message: &ResultMessage) -> String {
    let ua = UserAgent::parse(&message.user_agent);
    let summary = &message.result;
    let failed = summary.count("failed").unwrap_or(0);
    let passed = summary.count("passed");

    let mut counts = Vec::new();
    if let Some(passed) = passed {
        counts.push(format!("{passed} passed"));
    }
    counts.push(format!("{failed} failed"));
    if let Some(total) = summary.count("total") {
        counts.push(format!("{total} total"));
    }
    let counts = counts.join(", ");

    if summary.exit_code() == 0 {
        format!("{} {} {}", "✓".green().bold(), counts.green(), format!("({ua})").dimmed())
    } else {
        format!("{} {} {}", "✗".red().bold(), counts.red(), format!("({ua})").dimmed())
    }
}

/// Multi-line report of one failing test.
pub fn format_failure(message: &FailMessage) -> String {
    let ua = UserAgent::parse(&message.user_agent);
    let failure = &message.fail;
    let headline = match &failure.message {
        Some(text) if !text.is_empty() => format!("{}: {}", failure.name, text),
        _ => failure.name.clone(),
    };

    let stack = failure.stack.as_deref().filter(|s| !s.trim().is_empty());

    let mut out = match stack {
        Some(stack) => {
            let mut out = format!(
                "{} {} {}\n",
                "✗".red().bold(),
                failure.test.bold(),
                format!("({ua})").dimmed()
            );
            out.push_str(&indent(&prettify_stack(&headline, stack), "    "));

            if let Some(excerpt) =
                failure.source.as_deref().and_then(|src| source_excerpt(src, stack))
            {
                out.push('\n');
                out.push_str(&indent(&excerpt, "    "));
            }
            out
        }
        None => format!(
            "{} {}: {} {}",
            "✗".red().bold(),
            failure.test.bold(),
            headline.red(),
            format!("({ua})").dimmed()
        ),
    };

    if let Some(diff) = comparison(failure) {
        out.push('\n');
        out.push_str(&indent(&diff, "    "));
    }

    out
}

/// Headline first, then the frames, without repeating the headline when the
/// browser already put it on the first stack line.
fn prettify_stack(headline: &str, stack: &str) -> String {
    let mut lines = stack.lines().map(str::trim_end).peekable();
    if lines.peek().is_some_and(|first| first.trim() == headline.trim()) {
        lines.next();
    }

    let mut out = headline.red().to_string();
    for line in lines.filter(|l| !l.trim().is_empty()) {
        out.push('\n');
        out.push_str(&format!("  {}", line.trim_start().dimmed()));
    }
    out
}

/// Code around the first stack frame that has a line and column.
fn source_excerpt(source: &str, stack: &str) -> Option<String> {
    let pattern = FRAME_LOCATION.as_ref()?;
    let (line, column) = stack.lines().find_map(|frame| {
        let caps = pattern.captures(frame)?;
        let line: usize = caps.get(1)?.as_str().parse().ok()?;
        let column: usize = caps.get(2)?.as_str().parse().ok()?;
        Some((line, column))
    })?;

    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || line > lines.len() {
        return None;
    }

    let first = line.saturating_sub(CONTEXT_LINES).max(1);
    let width = line.to_string().len();
    let mut out = String::new();
    for number in first..=line {
        let marker = if number == line { ">" } else { " " };
        out.push_str(&format!("{marker} {number:>width$} | {}\n", lines[number - 1]));
    }
    out.push_str(&format!(
        "  {:>width$} | {}{}",
        "",
        " ".repeat(column.saturating_sub(1)),
        "^".red()
    ));
    Some(out)
}

/// Line diff of `expected` against `actual`.
fn comparison(failure: &TestFailure) -> Option<String> {
    let (expected, actual) = (failure.expected.as_ref()?, failure.actual.as_ref()?);
    let expected = display_value(expected);
    let actual = display_value(actual);

    let mut out = format!("{} {}", "- expected".green(), "+ actual".red());
    let diff = TextDiff::from_lines(&expected, &actual);
    for change in diff.iter_all_changes() {
        let text = change.value().trim_end_matches('\n');
        let line = match change.tag() {
            ChangeTag::Delete => format!("- {text}").green().to_string(),
            ChangeTag::Insert => format!("+ {text}").red().to_string(),
            ChangeTag::Equal => format!("  {text}"),
        };
        out.push('\n');
        out.push_str(&line);
    }
    Some(out)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::protocol::{TestFailure, TestSummary};

    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    fn failure(fail: TestFailure) -> FailMessage {
        FailMessage {
            fail,
            user_agent: UA.to_string(),
        }
    }

    #[test]
    fn test_result_line_counts() {
        let message: ResultMessage = serde_json::from_str(
            r#"{"result": {"passed": 7, "failed": 0, "total": 7}, "userAgent": ""}"#,
        )
        .unwrap();
        let line = format_result(&message);
        assert!(line.contains("7 passed, 0 failed, 7 total"));
        assert!(line.contains("✓"));
        assert!(line.contains("? ? (? ?) on ? ?"));
    }

    #[test]
    fn test_result_line_with_failures() {
        let message = ResultMessage {
            result: TestSummary {
                failed: Some(Value::from(2)),
                ..TestSummary::default()
            },
            user_agent: UA.to_string(),
        };
        let line = format_result(&message);
        assert!(line.contains("2 failed"));
        assert!(line.contains("✗"));
        assert!(line.contains("Firefox 121"));
    }

    #[test]
    fn test_failure_without_stack_is_one_line() {
        let text = format_failure(&failure(TestFailure {
            name: "TypeError".to_string(),
            test: "loads config".to_string(),
            ..TestFailure::default()
        }));
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("loads config"));
        assert!(text.contains("TypeError"));
    }

    #[test]
    fn test_failure_with_stack_and_source() {
        let source = "var a = 1;\nvar b = 2;\nassert.equal(a, b);\n";
        let text = format_failure(&failure(TestFailure {
            name: "AssertionError".to_string(),
            message: Some("1 == 2".to_string()),
            test: "compares".to_string(),
            stack: Some("AssertionError: 1 == 2\n    at http://localhost:7559/assets/run.js:3:8".to_string()),
            source: Some(source.to_string()),
            ..TestFailure::default()
        }));

        assert!(text.contains("compares"));
        assert_eq!(text.matches("AssertionError: 1 == 2").count(), 1);
        assert!(text.contains("at http://localhost:7559/assets/run.js:3:8"));
        assert!(text.contains("> 3 | assert.equal(a, b);"));
        assert!(text.contains("  1 | var a = 1;"));
    }

    #[test]
    fn test_failure_diff() {
        let text = format_failure(&failure(TestFailure {
            name: "AssertionError".to_string(),
            test: "deep equal".to_string(),
            stack: Some("at run.js:1:1".to_string()),
            expected: Some(serde_json::json!({"a": 1})),
            actual: Some(serde_json::json!({"a": 2})),
            ..TestFailure::default()
        }));

        assert!(text.contains("\"a\": 1"));
        assert!(text.contains("\"a\": 2"));
        assert!(text.contains("expected"));
    }

    #[test]
    fn test_failure_without_stack_keeps_diff() {
        let text = format_failure(&failure(TestFailure {
            name: "AssertionError".to_string(),
            test: "deep equal".to_string(),
            expected: Some(serde_json::json!({"a": 1})),
            actual: Some(serde_json::json!({"a": 2})),
            ..TestFailure::default()
        }));

        let headline = text.lines().next().unwrap();
        assert!(headline.contains("deep equal"));
        assert!(headline.contains("AssertionError"));
        assert!(text.contains("\"a\": 1"));
        assert!(text.contains("\"a\": 2"));
    }

    #[test]
    fn test_excerpt_out_of_range() {
        assert!(source_excerpt("one line", "at run.js:40:2").is_none());
        assert!(source_excerpt("one line", "no location").is_none());
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::from("text")), "text");
        assert_eq!(display_value(&Value::from(3)), "3");
    }
}
