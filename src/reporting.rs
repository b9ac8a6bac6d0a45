//! # Reporting Module / 报告模块
//!
//! This module handles the display of race results: a colored console
//! summary with failure details, and an optional HTML report.
//!
//! 此模块处理比赛结果的展示：带失败详情的彩色控制台摘要，以及可选的 HTML 报告。

pub mod console;
pub mod html;

// Re-export common reporting functions
pub use console::{Tally, print_failure_details, print_summary};
pub use html::generate_html_report;
