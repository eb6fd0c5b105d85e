//! Child-process plumbing shared by the SSH and playbook backends.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::traits::{BackendError, BackendResult};

/// Longest stderr excerpt, in bytes, carried in a [`BackendError::Process`].
const STDERR_EXCERPT_BYTES: usize = 500;

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `command` to completion, feeding `stdin` if given.
///
/// The child is killed if the returned future is dropped, so an outer timeout
/// does not leave stray sessions behind.
pub async fn run_process(mut command: Command, stdin: Option<&[u8]>) -> BackendResult<ProcessOutput> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .to_string();

    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let child_stdin = child.stdin.take();

    // Feed stdin while draining stdout so neither pipe can fill up and stall.
    let writer = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, child_stdin) {
            let written = match pipe.write_all(input).await {
                Ok(()) => pipe.shutdown().await,
                Err(e) => Err(e),
            };
            // A child that exits early is reported through its exit status.
            if let Err(e) = written {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e);
                }
            }
        }
        Ok::<(), std::io::Error>(())
    };
    let ((), output) = tokio::try_join!(writer, child.wait_with_output())?;
    if !output.status.success() {
        return Err(BackendError::Process {
            program,
            code: output.status.code(),
            stderr: excerpt(&output.stderr),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    tracing::debug!(
        program = %program,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "Child process finished"
    );
    Ok(ProcessOutput { stdout, stderr })
}

fn excerpt(bytes: &[u8]) -> String {
    let total_len = bytes.len();
    if total_len <= STDERR_EXCERPT_BYTES {
        return String::from_utf8_lossy(bytes).trim().to_string();
    }
    // Back off to a char boundary so the cut never splits a UTF-8 sequence.
    let mut end = STDERR_EXCERPT_BYTES;
    while end > 0 && (bytes[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    format!(
        "{}... [{total_len} bytes total]",
        String::from_utf8_lossy(&bytes[..end]).trim()
    )
}
