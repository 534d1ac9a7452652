use super::protocol::{ClientMessage, ParseError, parse_client_message};
use crate::reporter::ConsoleReporter;
use std::sync::Arc;
use tokio::sync::watch;

/// Process-exit request shared between sessions and the serve loop.
///
/// The first request wins. Later requests are ignored.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    tx: Arc<watch::Sender<Option<i32>>>,
}

/// Waiting half of an [`ExitSignal`].
#[derive(Debug)]
pub struct ExitReceiver {
    rx: watch::Receiver<Option<i32>>,
}

impl ExitSignal {
    pub fn channel() -> (Self, ExitReceiver) {
        let (tx, rx) = watch::channel(None);
        (Self { tx: Arc::new(tx) }, ExitReceiver { rx })
    }

    /// Ask the process to exit with `code`.
    pub fn request(&self, code: i32) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(code);
            true
        });
    }
}

impl ExitReceiver {
    /// Wait until an exit is requested.
    ///
    /// Returns `None` once every [`ExitSignal`] is gone without a request.
    pub async fn wait(&mut self) -> Option<i32> {
        self.rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|code| *code)
    }
}

/// What a session did with one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Result { exit_requested: bool },
    Failure,
    Ignored,
}

/// Dispatches inbound frames to the reporter.
///
/// Shared by every connection; frames are handled independently.
#[derive(Clone)]
pub struct SessionHandler {
    reporter: Arc<dyn ConsoleReporter>,
    quit_on_result: bool,
    exit: ExitSignal,
}

impl SessionHandler {
    pub fn new(reporter: Arc<dyn ConsoleReporter>, quit_on_result: bool, exit: ExitSignal) -> Self {
        Self {
            reporter,
            quit_on_result,
            exit,
        }
    }

    /// Handle one text frame.
    pub fn handle_text(&self, text: &str) -> Handled {
        match parse_client_message(text) {
            Ok(ClientMessage::Result(message)) => {
                self.reporter.result(&message);
                if self.quit_on_result {
                    let code = message.result.exit_code();
                    tracing::debug!(code, "test run finished, exiting");
                    self.exit.request(code);
                }
                Handled::Result {
                    exit_requested: self.quit_on_result,
                }
            }
            Ok(ClientMessage::Fail(message)) => {
                self.reporter.failure(&message);
                Handled::Failure
            }
            Err(ParseError::Unrecognised) => {
                tracing::debug!("ignoring message without result or fail");
                Handled::Ignored
            }
            Err(e) => {
                tracing::debug!("ignoring message: {e}");
                Handled::Ignored
            }
        }
    }
}
