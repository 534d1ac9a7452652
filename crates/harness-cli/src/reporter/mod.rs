//! Console reporting of browser test output.

mod format;
mod user_agent;

pub use format::{format_failure, format_result};
pub use user_agent::UserAgent;

use crate::session::protocol::{FailMessage, ResultMessage};

/// Sink for messages coming back from the browsers.
pub trait ConsoleReporter: Send + Sync {
    fn result(&self, message: &ResultMessage);
    fn failure(&self, message: &FailMessage);
}

/// Prints results and failures to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalReporter;

impl ConsoleReporter for TerminalReporter {
    fn result(&self, message: &ResultMessage) {
        println!("{}", format_result(message));
    }

    fn failure(&self, message: &FailMessage) {
        println!("{}\n", format_failure(message));
    }
}
