//! Generic command execution with timeout and guaranteed process kill.

use std::future::Future;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Default timeout for adb invocations. Package listing is fast; an
/// uninstall can take a few seconds per package on slow devices.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Async process execution behind a trait so infrastructure can be swapped
/// or mocked. The production implementation uses tokio; test doubles return
/// canned results without spawning processes.
pub trait CommandRunner {
    /// Run a command with the runner's default timeout.
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<Output>> + Send;

    /// Run a command with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds
    /// `timeout`. On timeout the child must be killed, not left orphaned.
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> impl Future<Output = Result<Output>> + Send;
}

/// Production `CommandRunner`.
///
/// `tokio::time::timeout` around `.output().await` does not kill the child
/// on every platform when the timeout fires — the future is dropped but the
/// OS process keeps running. This implementation uses `tokio::select!` with
/// an explicit `child.kill()` so the process is always terminated.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Drain stdout/stderr concurrently with wait(): a child that writes
        // more than the OS pipe buffer blocks on write, and wait() alone
        // would then never resolve.
        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    drain(&mut stdout_handle),
                    drain(&mut stderr_handle),
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}

async fn drain<R: AsyncReadExt + Unpin>(handle: &mut Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(reader) = handle.as_mut() {
        let _ = reader.read_to_end(&mut buf).await;
    }
    buf
}
