//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! Runs test cases one after another with the race invoker and compares each
//! race's exit code with the expected one.
//!
//! 使用比赛调用器依次运行测试用例，并将每次比赛的退出码与预期退出码进行比较。

use colored::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        models::{FailureReason, TestCase, TestResult},
        race::{RaceInvoker, RaceOutcome},
    },
    infra::{command::CommandError, t},
};

/// Turns the outcome of one race into a test result.
///
/// # Arguments
/// * `case` - The case that was raced
/// * `outcome` - The race outcome, or the error if `esrally` never started
/// * `expected_exit_code` - Exit code that counts as a pass
pub fn judge(
    case: TestCase,
    outcome: Result<RaceOutcome, CommandError>,
    expected_exit_code: i32,
) -> TestResult {
    match outcome {
        Ok(RaceOutcome {
            exit_code,
            output,
            duration,
        }) if exit_code == expected_exit_code => TestResult::Passed {
            case,
            exit_code,
            output,
            duration,
        },
        Ok(RaceOutcome {
            exit_code,
            output,
            duration,
        }) => TestResult::Failed {
            case,
            exit_code: Some(exit_code),
            output,
            reason: FailureReason::ExitCode,
            duration,
        },
        Err(e) => TestResult::Failed {
            case,
            exit_code: None,
            output: e.to_string(),
            reason: FailureReason::Spawn,
            duration: Duration::ZERO,
        },
    }
}

/// Races a single case and prints its progress.
/// 运行单个用例并打印其进度。
pub async fn run_test_case(
    invoker: &RaceInvoker,
    case: TestCase,
    expected_exit_code: i32,
) -> TestResult {
    println!("{}", t!("run.running_case", name = &case.name).blue());
    let outcome = invoker.race(&case.track, &case.challenge, &case.params).await;
    let result = judge(case, outcome, expected_exit_code);

    match &result {
        TestResult::Passed { duration, .. } => println!(
            "{}",
            t!(
                "run.case_passed",
                name = result.case_name(),
                duration = format!("{:.2}", duration.as_secs_f64())
            )
            .green()
        ),
        TestResult::Failed {
            exit_code: Some(code),
            duration,
            ..
        } => println!(
            "{}",
            t!(
                "run.case_failed",
                name = result.case_name(),
                code = code,
                expected = expected_exit_code,
                duration = format!("{:.2}", duration.as_secs_f64())
            )
            .red()
        ),
        TestResult::Failed { output, .. } => println!(
            "{}",
            t!("run.case_spawn_failed", name = result.case_name(), error = output).red()
        ),
        TestResult::Skipped { .. } => {}
    }
    result
}

/// Runs `cases` strictly in order. Once `cancel` fires, the running race is
/// killed and every case not yet finished is reported as skipped.
///
/// 严格按顺序运行 `cases`。一旦 `cancel` 触发，正在运行的比赛会被终止，
/// 所有尚未完成的用例都会被报告为跳过。
pub async fn run_cases(
    invoker: &RaceInvoker,
    cases: Vec<TestCase>,
    expected_exit_code: i32,
    cancel: &CancellationToken,
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        if cancel.is_cancelled() {
            results.push(TestResult::Skipped { case });
            continue;
        }

        let race = run_test_case(invoker, case.clone(), expected_exit_code);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                println!("{}", t!("run.case_interrupted", name = &case.name).yellow());
                tracing::warn!(case = %case.name, "race interrupted");
                results.push(TestResult::Skipped { case });
            }
            result = race => results.push(result),
        }
    }
    results
}
