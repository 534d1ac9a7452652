//! Websocket message shapes exchanged with the harness page.
//!
//! Outbound messages are flag objects (`{"start": true, "url": ...}`,
//! `{"restart": true}`). Inbound messages are recognised by their top-level
//! key: `result` or `fail`. Anything else is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server to browser messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Load the run frame at `url`.
    Start { start: bool, url: String },
    /// Reload the run frame.
    Restart { restart: bool },
}

impl ServerMessage {
    pub fn start(url: impl Into<String>) -> Self {
        ServerMessage::Start {
            start: true,
            url: url.into(),
        }
    }

    pub fn restart() -> Self {
        ServerMessage::Restart { restart: true }
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> String {
        match self {
            ServerMessage::Start { url, .. } => {
                serde_json::json!({ "start": true, "url": url }).to_string()
            }
            ServerMessage::Restart { .. } => r#"{"restart":true}"#.to_string(),
        }
    }
}

/// Browser to server messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Result(ResultMessage),
    Fail(FailMessage),
}

/// Summary of a finished test run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultMessage {
    pub result: TestSummary,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
}

/// Counters reported by the in-browser runner.
///
/// Only `failed` drives behavior; every other field is kept for display.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TestSummary {
    #[serde(default)]
    pub failed: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl TestSummary {
    /// Process exit status for this summary.
    ///
    /// A number is clamped to `0..=255`, `true` maps to 1, anything else to 0.
    pub fn exit_code(&self) -> i32 {
        match &self.failed {
            Some(Value::Number(n)) => {
                let count = n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f as i64))
                    .unwrap_or(0);
                count.clamp(0, 255) as i32
            }
            Some(Value::Bool(true)) => 1,
            _ => 0,
        }
    }

    /// Numeric counter by name, for display.
    pub fn count(&self, key: &str) -> Option<u64> {
        if key == "failed" {
            return match &self.failed {
                Some(Value::Bool(b)) => Some(u64::from(*b)),
                Some(value) => as_count(value),
                None => None,
            };
        }
        self.extra.get(key).and_then(as_count)
    }
}

/// Non-negative count from an integer or float (`2.0` reads as 2).
fn as_count(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64()
        .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// One failing assertion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FailMessage {
    pub fail: TestFailure,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TestFailure {
    /// Error name or message headline.
    pub name: String,
    pub message: Option<String>,
    pub stack: Option<String>,
    /// Title of the failing test.
    pub test: String,
    /// Captured bundle source, used to show code around the failing frame.
    pub source: Option<String>,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

/// Why an inbound frame was not turned into a [`ClientMessage`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("'{key}' message has an unexpected shape: {source}")]
    Shape {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("frame has neither 'result' nor 'fail'")]
    Unrecognised,
}

/// Parse one inbound text frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(ParseError::Json)?;

    if is_present(&value, "result") {
        return serde_json::from_value(value)
            .map(ClientMessage::Result)
            .map_err(|source| ParseError::Shape {
                key: "result",
                source,
            });
    }

    if is_present(&value, "fail") {
        return serde_json::from_value(value)
            .map(ClientMessage::Fail)
            .map_err(|source| ParseError::Shape { key: "fail", source });
    }

    Err(ParseError::Unrecognised)
}

fn is_present(value: &Value, key: &str) -> bool {
    match value.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(_) => true,
    }
}
