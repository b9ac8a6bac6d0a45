//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout race-matrix:
//! tracks read from the catalog, the test cases built from them and the
//! results of racing each case.
//!
//! 此模块定义了整个 race-matrix 中使用的核心数据结构：
//! 从目录中读取的 track、由它们构建的测试用例，以及每个用例的比赛结果。

use crate::core::params::RaceParams;
use crate::infra::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A benchmark track and its challenges, in catalog order.
/// 一个基准 track 及其 challenge（按目录顺序）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub challenges: Vec<String>,
}

impl Track {
    pub fn new(name: impl Into<String>, challenges: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            challenges: challenges.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_challenge(&self, challenge: &str) -> bool {
        self.challenges.iter().any(|c| c == challenge)
    }
}

/// One race to run: a (track, challenge) pair with fully resolved parameters.
/// 一次要运行的比赛：带有完全解析参数的 (track, challenge) 对。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Display name, `track/challenge` unless configured explicitly.
    /// 显示名称，除非显式配置，否则为 `track/challenge`。
    pub name: String,
    pub track: String,
    pub challenge: String,
    /// Base parameters merged with the override entry, if any.
    /// 与覆盖条目（如果有）合并后的基础参数。
    pub params: RaceParams,
}

impl TestCase {
    pub fn new(track: &str, challenge: &str, params: RaceParams) -> Self {
        Self {
            name: format!("{track}/{challenge}"),
            track: track.to_string(),
            challenge: challenge.to_string(),
            params,
        }
    }
}

/// Why a case counts as failed.
/// 用例被视为失败的原因。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// The race ran but its exit code differed from the expected one.
    /// 比赛已运行，但其退出码与预期不同。
    ExitCode,
    /// `esrally race` could not be started at all.
    /// 根本无法启动 `esrally race`。
    Spawn,
}

/// The final result of a single case.
///
/// 单个用例的最终结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TestResult {
    Passed {
        case: TestCase,
        exit_code: i32,
        output: String,
        duration: Duration,
    },
    Failed {
        case: TestCase,
        /// `None` when the process never started / 进程从未启动时为 `None`
        exit_code: Option<i32>,
        output: String,
        reason: FailureReason,
        duration: Duration,
    },
    /// Not run because the run was interrupted.
    /// 由于运行被中断而未执行。
    Skipped { case: TestCase },
}

impl TestResult {
    pub fn case(&self) -> &TestCase {
        match self {
            TestResult::Passed { case, .. }
            | TestResult::Failed { case, .. }
            | TestResult::Skipped { case } => case,
        }
    }

    pub fn case_name(&self) -> &str {
        &self.case().name
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TestResult::Failed { .. })
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, TestResult::Passed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestResult::Skipped { .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TestResult::Passed { exit_code, .. } => Some(*exit_code),
            TestResult::Failed { exit_code, .. } => *exit_code,
            TestResult::Skipped { .. } => None,
        }
    }

    pub fn get_duration(&self) -> Option<Duration> {
        match self {
            TestResult::Passed { duration, .. } | TestResult::Failed { duration, .. } => {
                Some(*duration)
            }
            TestResult::Skipped { .. } => None,
        }
    }

    pub fn get_output(&self) -> &str {
        match self {
            TestResult::Passed { output, .. } | TestResult::Failed { output, .. } => output,
            TestResult::Skipped { .. } => "",
        }
    }

    /// CSS class used by the HTML report.
    pub fn get_status_class(&self) -> &'static str {
        match self {
            TestResult::Passed { .. } => "status-Passed",
            TestResult::Failed { .. } => "status-Failed",
            TestResult::Skipped { .. } => "status-Skipped",
        }
    }

    /// Localized status label.
    /// 本地化的状态标签。
    pub fn get_status_str(&self, locale: &str) -> String {
        match self {
            TestResult::Passed { .. } => t!("report.status_passed", locale = locale).to_string(),
            TestResult::Failed { .. } => t!("report.status_failed", locale = locale).to_string(),
            TestResult::Skipped { .. } => t!("report.status_skipped", locale = locale).to_string(),
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code() {
            Some(code) => write!(f, "{} (exit code {code})", self.case_name()),
            None => write!(f, "{}", self.case_name()),
        }
    }
}
