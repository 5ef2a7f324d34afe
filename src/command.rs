//! Running external tools with a time bound.
//!
//! The metadata probe and the download collaborator both shell out. Each
//! invocation captures stdout and stderr on reader threads so a chatty child
//! cannot block on a full pipe, polls for exit until the deadline, and kills
//! the child once the deadline passes. The deadline also covers draining the
//! pipes after exit, since a grandchild left running can keep them open.

use std::io::{ErrorKind, Read};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ToolError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// Minimum wait for the pipes of a child that exits right at its deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Run `command` to completion, or kill it after `timeout`.
///
/// `tool` names the program in error messages.
///
/// # Errors
///
/// - [`ToolError::Missing`] if the program does not exist.
/// - [`ToolError::Timeout`] if it runs longer than `timeout`.
/// - [`ToolError::Failed`] if it exits non-zero.
/// - [`ToolError::Io`] for any other spawn or wait failure.
pub fn run_with_timeout(
    command: &mut Command,
    tool: &str,
    timeout: Duration,
) -> Result<Output, ToolError> {
    log::debug!("Running {tool} with a {}s bound: {command:?}", timeout.as_secs());

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => ToolError::Missing {
                tool: tool.to_string(),
            },
            _ => ToolError::Io {
                tool: tool.to_string(),
                source,
            },
        })?;

    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!("{tool} exceeded {}s and was killed", timeout.as_secs());
                return Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                return Err(ToolError::Io {
                    tool: tool.to_string(),
                    source,
                });
            }
        }
    };

    let deadline = started + timeout;
    let (Some(stdout), Some(stderr)) = (
        drain(stdout_reader, deadline),
        drain(stderr_reader, deadline),
    ) else {
        log::warn!(
            "{tool} exited but its output stayed open past {}s",
            timeout.as_secs()
        );
        return Err(ToolError::Timeout {
            tool: tool.to_string(),
            timeout,
        });
    };

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        log::debug!("{tool} exited with status {code}: {stderr}");
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            code,
            stderr,
        });
    }

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        let _ = sender.send(buffer);
    });
    receiver
}

/// Wait for a reader's buffer until `deadline`. `None` means the pipe was
/// still open when time ran out.
fn drain(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(reader) = reader else {
        return Some(Vec::new());
    };
    let remaining = deadline
        .saturating_duration_since(Instant::now())
        .max(DRAIN_GRACE);
    match reader.recv_timeout(remaining) {
        Ok(buffer) => Some(buffer),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(Vec::new()),
    }
}
