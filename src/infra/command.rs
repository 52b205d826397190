//! # Command Execution Module / 命令执行模块
//!
//! Spawns external processes, captures their combined output and supervises
//! them with an optional timeout.
//!
//! 派生外部进程，捕获其合并输出，并可选地施加超时监督。

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Result of a supervised command.
#[derive(Debug)]
pub struct CommandOutcome {
    /// `None` when the process was killed by a signal or the timeout.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawns a command and appends its stdout and stderr to `output` as lines
/// arrive, so a caller that gives up early still sees what was printed so far.
///
/// 派生一个命令，stdout 和 stderr 并发读取并按到达顺序追加到 `output`。
async fn capture_into(
    mut cmd: Command,
    output: Arc<tokio::sync::Mutex<String>>,
) -> std::io::Result<ExitStatus> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(std::io::Error::other("Failed to capture the output streams"));
    };

    // Both readers append to the same buffer so lines keep their arrival order.

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stdout_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stderr_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let status = child.wait().await;

    if let Err(e) = stdout_handle.await {
        warn!("Failed to join stdout task: {}", e);
    }
    if let Err(e) = stderr_handle.await {
        warn!("Failed to join stderr task: {}", e);
    }
    status
}

/// Builds a command from an already split argument vector.
pub fn build_command(args: &[String], workdir: Option<&Path>) -> std::io::Result<Command> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Empty command"))?;
    let mut cmd = Command::new(program);
    cmd.args(rest);
    if let Some(dir) = workdir {
        cmd.current_dir(dir);
    }
    Ok(cmd)
}

/// Runs `cmd`, killing it when `timeout` elapses first.
///
/// # Errors
/// Returns the spawn error when the process could not be started.
pub async fn run_supervised(
    cmd: Command,
    timeout: Option<Duration>,
) -> std::io::Result<CommandOutcome> {
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));
    let future = capture_into(cmd, Arc::clone(&output));
    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => {
                // Dropping the future drops the child, and `kill_on_drop` reaps it.
                debug!("Command timed out after {:?}", limit);
                return Ok(CommandOutcome {
                    exit_code: None,
                    output: output.lock().await.clone(),
                    timed_out: true,
                });
            }
        },
        None => future.await,
    }?;
    let output = output.lock().await.clone();
    Ok(CommandOutcome {
        exit_code: status.code(),
        output,
        timed_out: false,
    })
}

/// Blocking variant of [`run_supervised`] for synchronous callers such as test
/// actions. Uses the ambient runtime when called from a blocking task, or a
/// private current-thread runtime otherwise.
///
/// Must not be called from inside an async task.
pub fn run_supervised_blocking(
    cmd: Command,
    timeout: Option<Duration>,
) -> std::io::Result<CommandOutcome> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.block_on(run_supervised(cmd, timeout)),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(run_supervised(cmd, timeout)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        build_command(&["sh".to_string(), "-c".to_string(), script.to_string()], None).unwrap()
    }

    #[tokio::test]
    async fn test_combined_output_is_captured() {
        let outcome = run_supervised(sh("echo out; echo err 1>&2"), None).await.unwrap();
        assert!(outcome.success());
        assert!(outcome.output.contains("out"));
        assert!(outcome.output.contains("err"));
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let outcome = run_supervised(sh("exit 3"), None).await.unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.timed_out);
    }

    #[tokio::test]
    async fn test_timeout_kills_the_process() {
        let outcome = run_supervised(sh("sleep 5"), Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
    }

    #[tokio::test]
    async fn test_timeout_keeps_output_printed_so_far() {
        let outcome = run_supervised(sh("echo partial; sleep 5"), Some(Duration::from_millis(500)))
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.output.trim(), "partial");
    }

    #[test]
    fn test_blocking_without_runtime() {
        let outcome = run_supervised_blocking(sh("echo hello"), None).unwrap();
        assert_eq!(outcome.output.trim(), "hello");
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(build_command(&[], None).is_err());
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let cmd = build_command(&["prova-no-such-program-xyz".to_string()], None).unwrap();
        assert!(run_supervised(cmd, None).await.is_err());
    }
}
