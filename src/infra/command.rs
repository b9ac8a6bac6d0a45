//! # Command Execution Module / 命令执行模块
//!
//! Spawns external processes (`esrally`, `elastic-package`, `git`) and captures
//! their output. Every call is awaited to completion; there are no timeouts.
//!
//! 派生外部进程（`esrally`、`elastic-package`、`git`）并捕获其输出。
//! 每个调用都会等待完成；没有超时。

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Output captured from a finished process.
/// 已结束进程的捕获输出。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Standard output only / 仅标准输出
    pub stdout: String,
    /// Standard error only / 仅标准错误
    pub stderr: String,
    /// Both streams interleaved in arrival order / 按到达顺序交错的两个流
    pub combined: String,
}

/// Errors raised by [`run_checked`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {}: {}", exit_label(.code), .stderr.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl CommandError {
    /// The captured stderr for a failed process, empty for spawn errors.
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Failed { stderr, .. } => stderr,
            CommandError::Spawn { .. } => "",
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// Renders a command as a shell-quoted line for logs and error messages.
/// 将命令渲染为带 shell 引号的行，用于日志和错误消息。
pub fn describe(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let parts: Vec<String> = std::iter::once(std_cmd.get_program())
        .chain(std_cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect();
    shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| parts.join(" "))
}

/// Spawns a command and captures stdout and stderr.
/// Both streams are read concurrently; each is kept separately and the
/// interleaved transcript is kept as `combined`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 两个流被并发读取；分别保存，并将交错的记录保存为 `combined`。
pub async fn spawn_and_capture(
    mut cmd: Command,
) -> (std::io::Result<ExitStatus>, CapturedOutput) {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), CapturedOutput::default()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other("failed to capture process output")),
            CapturedOutput::default(),
        );
    };

    let combined = Arc::new(Mutex::new(String::new()));
    let stdout_handle = tokio::spawn(read_stream(stdout, Arc::clone(&combined)));
    let stderr_handle = tokio::spawn(read_stream(stderr, Arc::clone(&combined)));

    let status = child.wait().await;

    // Join the readers so no trailing output is lost.
    // 等待读取任务结束，以确保不丢失任何输出。
    let stdout = stdout_handle.await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to join stdout reader");
        String::new()
    });
    let stderr = stderr_handle.await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to join stderr reader");
        String::new()
    });
    let combined = combined.lock().await.clone();

    (
        status,
        CapturedOutput {
            stdout,
            stderr,
            combined,
        },
    )
}

/// Reads `stream` to EOF line by line; invalid UTF-8 is replaced, not fatal.
async fn read_stream<R>(stream: R, combined: Arc<Mutex<String>>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut own = String::new();
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
                let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
                let line = String::from_utf8_lossy(raw);
                own.push_str(&line);
                own.push('\n');
                let mut combined = combined.lock().await;
                combined.push_str(&line);
                combined.push('\n');
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read process output");
                break;
            }
        }
    }
    own
}

/// Runs a command and fails unless it exits successfully.
/// 运行命令，除非成功退出，否则返回错误。
pub async fn run_checked(cmd: Command) -> Result<CapturedOutput, CommandError> {
    let command = describe(&cmd);
    tracing::debug!(%command, "running command");
    let (status, output) = spawn_and_capture(cmd).await;
    let status = status.map_err(|source| CommandError::Spawn {
        command: command.clone(),
        source,
    })?;
    if status.success() {
        Ok(output)
    } else {
        Err(CommandError::Failed {
            command,
            code: status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
