//! # Race Invoker Module / 比赛调用模块
//!
//! Runs one `esrally race` for a (track, challenge) pair. A non-zero exit is
//! not an error here: the exit code is returned and judged by the caller.
//!
//! 为一个 (track, challenge) 对运行一次 `esrally race`。
//! 非零退出在这里不是错误：退出码会被返回并由调用方判断。

use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::core::params::RaceParams;
use crate::core::rally::RallyCli;
use crate::infra::command::{CommandError, describe, spawn_and_capture};

/// Exit code reported when the race process was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// What one race produced.
/// 一次比赛的产出。
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    pub exit_code: i32,
    /// The command line followed by the interleaved process output.
    pub output: String,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct RaceInvoker {
    rally: RallyCli,
    revision: Option<String>,
    extra_args: Vec<String>,
}

impl RaceInvoker {
    pub fn new(rally: RallyCli) -> Self {
        Self {
            rally,
            revision: None,
            extra_args: Vec::new(),
        }
    }

    /// Pins races to a track repository revision (`--track-revision`).
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Flags appended verbatim to every race, e.g. `--on-error=abort`.
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Builds the `esrally race` command line.
    /// 构建 `esrally race` 命令行。
    pub fn command(&self, track: &str, challenge: &str, params: &RaceParams) -> Command {
        let mut cmd = self.rally.configured_command(&["race"]);
        cmd.arg(format!("--track={track}"))
            .arg(format!("--challenge={challenge}"));
        if let Some(revision) = &self.revision {
            cmd.arg(format!("--track-revision={revision}"));
        }
        cmd.args(params.to_flags()).args(&self.extra_args);
        cmd
    }

    /// Runs the race to completion. Fails only if the process cannot be spawned.
    /// 运行比赛直至完成。仅在无法派生进程时失败。
    pub async fn race(
        &self,
        track: &str,
        challenge: &str,
        params: &RaceParams,
    ) -> Result<RaceOutcome, CommandError> {
        let cmd = self.command(track, challenge, params);
        let command = describe(&cmd);
        tracing::info!(%track, %challenge, %command, "starting race");

        let start = Instant::now();
        let (status, output) = spawn_and_capture(cmd).await;
        let duration = start.elapsed();
        let status = status.map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;

        let exit_code = status.code().unwrap_or(SIGNALLED_EXIT_CODE);
        tracing::info!(%track, %challenge, exit_code, elapsed = ?duration, "race finished");
        Ok(RaceOutcome {
            exit_code,
            output: format!("$ {command}\n{}", output.combined),
            duration,
        })
    }
}
