//! Operator commands and the line-oriented sources they arrive from.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionCommand {
    Continue,
    Pause,
    Stop,
}

impl ExecutionCommand {
    /// `"P"` pauses, `"S"` stops (case-insensitive, surrounding whitespace
    /// ignored); anything else, including an empty line, continues.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.eq_ignore_ascii_case("P") {
            Self::Pause
        } else if input.eq_ignore_ascii_case("S") {
            Self::Stop
        } else {
            Self::Continue
        }
    }
}

impl std::fmt::Display for ExecutionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => write!(f, "CONTINUE"),
            Self::Pause => write!(f, "PAUSE"),
            Self::Stop => write!(f, "STOP"),
        }
    }
}

/// A source of operator input lines.
pub trait CommandSource {
    /// Wait at most `timeout` for a line. Must not return early without
    /// waiting when no input can ever arrive, so callers may poll in a loop.
    fn poll(&mut self, timeout: Duration) -> Option<String>;

    /// Block until a line arrives; `None` once the source is exhausted.
    fn wait(&mut self) -> Option<String>;
}

impl CommandSource for Receiver<String> {
    fn poll(&mut self, timeout: Duration) -> Option<String> {
        match self.recv_timeout(timeout) {
            Ok(line) => Some(line),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                None
            }
        }
    }

    fn wait(&mut self) -> Option<String> {
        self.recv().ok()
    }
}

/// A source with no operator: polls just wait out the interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl CommandSource for Unattended {
    fn poll(&mut self, timeout: Duration) -> Option<String> {
        thread::sleep(timeout);
        None
    }

    fn wait(&mut self) -> Option<String> {
        None
    }
}

/// Read lines from `reader` on a background thread and deliver them over a
/// channel, so the supervisor can poll without blocking.
pub fn spawn_line_reader<R>(reader: R) -> Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let spawned = thread::Builder::new()
        .name("sz-commands".into())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "command input failed");
                        break;
                    }
                }
            }
            debug!("command input closed");
        });

    if let Err(e) = spawned {
        // The receiver reports disconnection, which reads as "no operator".
        warn!(error = %e, "could not start command reader");
    }
    rx
}

/// Operator commands typed on standard input.
pub fn stdin_commands() -> Receiver<String> {
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()))
}
