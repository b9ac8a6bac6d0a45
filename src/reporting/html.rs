//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders the race results as a standalone HTML page with a summary,
//! a results table and the captured output of failed races.
//!
//! 将比赛结果渲染为独立的 HTML 页面，包含摘要、结果表格以及失败比赛的捕获输出。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::models::TestResult;
use crate::infra::t;
use crate::reporting::console::Tally;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// Embedded JavaScript for HTML report interactivity / HTML 报告交互性的嵌入式 JavaScript
const HTML_SCRIPT: &str = include_str!("assets/report.js");

/// Context printed in the report header.
/// 报告头部打印的上下文信息。
#[derive(Debug, Clone)]
pub struct ReportMeta<'a> {
    pub generated_at: DateTime<Local>,
    /// Track repository revision the races ran against, if known.
    pub revision: Option<&'a str>,
}

fn summary_item(count: usize, label: String, class: &str) -> Markup {
    html! {
        div.summary-item {
            span class={ "count " (class) } { (count) }
            span.label { (label) }
        }
    }
}

/// Renders the report page.
/// 渲染报告页面。
pub fn render_html_report(results: &[TestResult], meta: &ReportMeta<'_>, locale: &str) -> String {
    let tally = Tally::of(results);
    let title = t!("html_report.title", locale = locale).to_string();

    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale).to_string()) }
                p.meta {
                    (t!("html_report.generated_at", locale = locale).to_string()) " "
                    (meta.generated_at.format("%Y-%m-%d %H:%M:%S %Z").to_string())
                    @if let Some(revision) = meta.revision {
                        " · " (t!("html_report.revision", locale = locale).to_string()) " "
                        code { (revision) }
                    }
                }
                div.summary-container {
                    (summary_item(results.len(), t!("html_report.summary.total", locale = locale).to_string(), ""))
                    (summary_item(tally.passed, t!("html_report.summary.passed", locale = locale).to_string(), "passed-text"))
                    (summary_item(tally.failed, t!("html_report.summary.failed", locale = locale).to_string(), "failed-text"))
                    (summary_item(tally.skipped, t!("html_report.summary.skipped", locale = locale).to_string(), "skipped-text"))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.header.name", locale = locale).to_string()) }
                            th { (t!("html_report.table.header.status", locale = locale).to_string()) }
                            th.numeric { (t!("html_report.table.header.exit_code", locale = locale).to_string()) }
                            th.numeric { (t!("html_report.table.header.duration", locale = locale).to_string()) }
                        }
                    }
                    tbody {
                        @for (i, result) in results.iter().enumerate() {
                            @let output_id = format!("output-{i}");
                            tr {
                                td { (result.case_name()) }
                                td {
                                    div class={ "status-cell " (result.get_status_class()) } {
                                        (result.get_status_str(locale))
                                    }
                                    @if result.is_failure() {
                                        div.output-toggle onclick=(format!("toggleOutput('{output_id}')")) {
                                            (t!("html_report.toggle_output", locale = locale).to_string())
                                        }
                                    }
                                }
                                td.numeric {
                                    @match result.exit_code() {
                                        Some(code) => { (code) },
                                        None => { "-" },
                                    }
                                }
                                td.numeric {
                                    @match result.get_duration() {
                                        Some(d) => { (format!("{:.2}s", d.as_secs_f64())) },
                                        None => { "N/A" },
                                    }
                                }
                            }
                            @if result.is_failure() {
                                tr id=(output_id) style="display:none;" {
                                    td colspan="4" {
                                        pre.output-content { (result.get_output()) }
                                    }
                                }
                            }
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    };
    page.into_string()
}

/// Writes the HTML report to `output_path`.
///
/// # Errors
/// Fails if the file cannot be written.
pub fn generate_html_report(
    results: &[TestResult],
    output_path: &Path,
    locale: &str,
    revision: Option<&str>,
) -> Result<()> {
    let meta = ReportMeta {
        generated_at: Local::now(),
        revision,
    };
    let page = render_html_report(results, &meta, locale);
    fs::write(output_path, page)
        .with_context(|| format!("Failed to write HTML report to {}", output_path.display()))?;
    Ok(())
}
