//! # Console Reporting Module / 控制台报告模块
//!
//! Prints the end-of-run summary table and the captured output of every
//! failed race.
//!
//! 打印运行结束时的摘要表，以及每个失败比赛的捕获输出。

use colored::*;
use crate::core::models::{FailureReason, TestResult};
use crate::infra::t;

/// Counts per status, in the order passed / failed / skipped.
/// 按状态计数，顺序为通过 / 失败 / 跳过。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn of(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut tally, result| {
            match result {
                TestResult::Passed { .. } => tally.passed += 1,
                TestResult::Failed { .. } => tally.failed += 1,
                TestResult::Skipped { .. } => tally.skipped += 1,
            }
            tally
        })
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Prints a formatted summary of race results to the console.
///
/// 在控制台打印格式化的比赛结果摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Race Summary ---
///   - Passed     | geonames/append-no-conflicts             |      0 |   812.40s
///   - Failed     | http_logs/runtime-fields                 |     64 |    41.07s
///   - Skipped    | sql/sql                                  |      - |       N/A
/// ```
pub fn print_summary(results: &[TestResult], locale: &str) {
    println!("\n{}", t!("race_summary_banner", locale = locale).bold());

    for result in results {
        let status_str = result.get_status_str(locale);
        let duration_str = result
            .get_duration()
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());
        let exit_str = result
            .exit_code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());

        let status_colored = match result {
            TestResult::Passed { .. } => status_str.green(),
            TestResult::Failed { .. } => status_str.red(),
            TestResult::Skipped { .. } => status_str.dimmed(),
        };

        println!(
            "  - {:<10} | {:<40} | {:>6} | {:>9}",
            status_colored,
            result.case_name(),
            exit_str,
            duration_str
        );
    }

    let tally = Tally::of(results);
    println!(
        "\n{}",
        t!(
            "race_summary_counts",
            locale = locale,
            passed = tally.passed,
            failed = tally.failed,
            skipped = tally.skipped
        )
    );
}

/// Prints the captured output of each failed race.
///
/// 打印每个失败比赛的捕获输出。
pub fn print_failure_details(failures: &[&TestResult], locale: &str) {
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, result) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report_header_failure", locale = locale).red(),
            result.case_name().cyan()
        );

        if let TestResult::Failed { output, reason, .. } = result {
            let log_header = match reason {
                FailureReason::Spawn => t!("spawn_log", locale = locale),
                FailureReason::ExitCode => t!("race_log", locale = locale),
            };
            println!("\n--- {} ---\n", log_header.yellow());
            println!("{}", output.trim_end());
            println!("\n{}", "-".repeat(80));
        }
    }
}
