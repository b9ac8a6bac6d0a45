//! # Configuration Initialization Module / 配置初始化模块
//!
//! Creates a `RaceMatrix.toml` through an interactive wizard, or writes the
//! default configuration straight away with `--non-interactive`.
//!
//! 通过交互式向导创建 `RaceMatrix.toml`，或使用 `--non-interactive` 直接写入默认配置。
//!
//! ## Features / 功能特性
//!
//! - **Track Detection**: tracks of the current repository are offered for selection
//! - **Cluster Setup**: optional local cluster managed with `esrally install/start/stop`
//! - **Stack Setup**: optional `elastic-package` stack with integration packages
//! - **Overwrite Protection**: confirmation prompt before overwriting an existing file;
//!   without a prompt only `--force` overwrites
//!
//! - **Track 检测**: 提供当前仓库中的 track 供选择
//! - **集群设置**: 可选的由 `esrally install/start/stop` 管理的本地集群
//! - **Stack 设置**: 可选的带集成包的 `elastic-package` stack
//! - **覆盖保护**: 覆盖现有文件前的确认提示；不提示时只有 `--force` 才会覆盖

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::core::cluster::ClusterSettings;
use crate::core::config::RaceMatrixConfig;
use crate::core::stack::StackSettings;
use crate::t;

/// Runs the wizard and writes the configuration to `config_path`.
/// An existing file is only replaced after confirmation or with `force`.
///
/// 运行向导并将配置写入 `config_path`。已有文件只在确认后或使用 `force` 时被替换。
pub fn run_init_wizard(config_path: &Path, language: &str, non_interactive: bool, force: bool) -> Result<()> {
    let theme = ColorfulTheme::default();
    let shown_path = config_path.display().to_string();

    if non_interactive {
        if config_path.exists() && !force {
            anyhow::bail!(t!("init_exists_use_force", locale = language, path = &shown_path).to_string());
        }
        let config = RaceMatrixConfig {
            language: language.to_string(),
            ..RaceMatrixConfig::default()
        };
        return write_config(config_path, &config, language);
    }

    println!("\n{}", t!("init_wizard_welcome", locale = language).cyan().bold());
    println!("{}", t!("init_wizard_description", locale = language));

    if config_path.exists() && !force {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init_overwrite_prompt", locale = language, path = &shown_path))
            .default(false)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init_aborted", locale = language));
            return Ok(());
        }
    }

    let mut config = RaceMatrixConfig {
        language: language.to_string(),
        ..RaceMatrixConfig::default()
    };

    let detected = detect_track_names(Path::new("."));
    if detected.is_empty() {
        println!("{}", t!("init_no_tracks_detected", locale = language).yellow());
    } else {
        println!(
            "{}",
            t!("init_detected_tracks", locale = language, count = detected.len()).green()
        );
        let selections = MultiSelect::with_theme(&theme)
            .with_prompt(t!("init_track_selection_prompt", locale = language))
            .items(&detected)
            .interact()
            .context(t!("init_user_confirmation_failed", locale = language).to_string())?;
        config.tracks = selections.into_iter().map(|i| detected[i].clone()).collect();
        if config.tracks.is_empty() {
            println!("{}", t!("init_all_tracks_selected", locale = language));
        }
    }

    let manage_cluster = Confirm::with_theme(&theme)
        .with_prompt(t!("init_cluster_prompt", locale = language))
        .default(true)
        .interact()?;
    config.cluster = if manage_cluster {
        let http_port: u16 = Input::with_theme(&theme)
            .with_prompt(t!("init_http_port_prompt", locale = language))
            .default(ClusterSettings::default().http_port)
            .interact_text()?;
        Some(ClusterSettings {
            http_port,
            ..ClusterSettings::default()
        })
    } else {
        None
    };

    let test_mode = Confirm::with_theme(&theme)
        .with_prompt(t!("init_test_mode_prompt", locale = language))
        .default(true)
        .interact()?;
    config.race.test_mode = Some(test_mode);

    let use_stack = Confirm::with_theme(&theme)
        .with_prompt(t!("init_stack_prompt", locale = language))
        .default(false)
        .interact()?;
    if use_stack {
        config.stack = Some(StackSettings::default());
    }

    write_config(config_path, &config, language)
}

fn write_config(path: &Path, config: &RaceMatrixConfig, language: &str) -> Result<()> {
    let shown_path = path.display().to_string();
    let toml_string = toml::to_string_pretty(config)
        .context(t!("init_serialize_failed", locale = language).to_string())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| t!("init_write_failed", locale = language, path = &shown_path).to_string())?;
    }
    fs::write(path, toml_string)
        .with_context(|| t!("init_write_failed", locale = language, path = &shown_path).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init_success_created", locale = language, path = &shown_path).bold()
    );
    println!("{}", t!("init_usage_hint", locale = language));

    Ok(())
}

/// Names of the subdirectories of `root` that contain a `track.json`.
/// `root` 下包含 `track.json` 的子目录名称。
pub fn detect_track_names(root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().join("track.json").is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
