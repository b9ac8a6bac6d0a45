//! # Race Matrix Library / Race Matrix 库
//!
//! Integration-test scaffolding for Rally track repositories: discovers every
//! track/challenge pair from `esrally list tracks`, races each of them with
//! `esrally race` against a locally managed cluster, and reports the results.
//!
//! Rally track 仓库的集成测试脚手架：通过 `esrally list tracks` 发现所有
//! track/challenge 组合，针对本地管理的集群使用 `esrally race` 逐一运行，并报告结果。
//!
//! ## Modules / 模块
//!
//! - `core` - Catalog, matrix, cluster and stack lifecycles, race invocation, template updater
//! - `infra` - Process execution, file system helpers, git and the Elasticsearch client
//! - `reporting` - Console summary and HTML report
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 目录、矩阵、集群和 stack 生命周期、比赛调用、模板更新器
//! - `infra` - 进程执行、文件系统工具、git 以及 Elasticsearch 客户端
//! - `reporting` - 控制台摘要和 HTML 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;
pub use rust_i18n::t;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale.as_str()) {
        &locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
