//! External process runner
//!
//! Runs one command with captured output and a hard deadline. On expiry the
//! child gets SIGTERM, a grace period, then SIGKILL.

use crate::error::{ProvisionError, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Notify;

/// How long output is still collected after the child exits
///
/// Grandchildren that inherit stdout can hold the pipes open indefinitely.
const PIPE_DRAIN: Duration = Duration::from_secs(2);

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A command line to run
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Process runner with a configurable kill grace period
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    kill_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ProcessRunner {
    pub fn new(kill_grace: Duration) -> Self {
        Self { kill_grace }
    }

    /// Run `spec` in `workdir` with extra environment variables
    ///
    /// Non-zero exit becomes `ProcessFailed` carrying stderr verbatim.
    /// Completion is the child's exit, not the closing of its pipes.
    /// The child is killed if this future is dropped before it finishes.
    pub async fn run<'a>(
        &self,
        spec: &CommandSpec,
        workdir: &Path,
        env: impl IntoIterator<Item = (&'a str, &'a str)>,
        timeout: Duration,
    ) -> Result<ProcessResult> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.current_dir(workdir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        tracing::debug!("Running: {} (in {})", spec, workdir.display());
        let started = Instant::now();

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProvisionError::ToolNotFound(spec.program.clone()),
            _ => ProvisionError::Io(e),
        })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let exited = Notify::new();
        let waited = {
            let collect = async {
                let reads = async {
                    tokio::select! {
                        (out, err) = async {
                            tokio::join!(
                                read_all(stdout_pipe.as_mut(), &mut stdout),
                                read_all(stderr_pipe.as_mut(), &mut stderr)
                            )
                        } => out.and(err).map(drop),
                        _ = async {
                            exited.notified().await;
                            tokio::time::sleep(PIPE_DRAIN).await;
                        } => {
                            tracing::debug!(
                                "{} exited but its output pipes are still open",
                                spec.program
                            );
                            Ok(())
                        }
                    }
                };
                let wait = async {
                    let status = child.wait().await;
                    exited.notify_one();
                    status
                };
                let (read, status) = tokio::join!(reads, wait);
                read?;
                status
            };
            tokio::time::timeout(timeout, collect).await
        };

        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!("{} exceeded {}s, terminating", spec, timeout.as_secs());
                self.terminate(&mut child).await;
                return Err(ProvisionError::ProcessTimeout {
                    command: spec.to_string(),
                    timeout,
                });
            }
        };

        let result = ProcessResult {
            exit_code: exit_code(status),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };
        tracing::debug!(
            "{} exited with {} after {:.1}s",
            spec.program,
            result.exit_code,
            started.elapsed().as_secs_f64()
        );

        if result.exit_code != 0 {
            return Err(ProvisionError::ProcessFailed {
                command: spec.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }

    /// SIGTERM, wait out the grace period, then SIGKILL
    async fn terminate(&self, child: &mut Child) {
        if let Some(pid) = child.id() {
            let pid = Pid::from_raw(pid as i32);
            match signal::kill(pid, Signal::SIGTERM) {
                Ok(()) => {
                    if tokio::time::timeout(self.kill_grace, child.wait()).await.is_ok() {
                        tracing::debug!("Process {} exited after SIGTERM", pid);
                        return;
                    }
                    tracing::warn!("Process {} ignored SIGTERM, sending SIGKILL", pid);
                }
                Err(e) => tracing::debug!("Failed to send SIGTERM to {}: {}", pid, e),
            }
        }
        if let Err(e) = child.kill().await {
            tracing::debug!("Failed to kill child process: {}", e);
        }
    }
}

async fn read_all<R>(pipe: Option<&mut R>, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match pipe {
        Some(pipe) => pipe.read_to_end(buf).await,
        None => Ok(0),
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(-1)
}
