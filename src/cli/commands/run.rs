//! # Run Command Module / 运行命令模块
//!
//! Implements `race-matrix run`: installs the Rally configuration, prepares
//! the optional stack and cluster, races every case of the matrix and
//! reports the results.
//!
//! 实现 `race-matrix run`：安装 Rally 配置，准备可选的 stack 和集群，
//! 运行矩阵中的每个用例并报告结果。

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        catalog,
        cluster::{self, ClusterController},
        config::RaceMatrixConfig,
        execution::run_cases,
        models::{TestCase, TestResult},
        planner,
        race::RaceInvoker,
        rally::RallyCli,
        rally_config::{self, InstalledRallyConfig},
        stack::{self, StackController, StackSettings},
    },
    infra::{fs, git, t},
    reporting::{Tally, generate_html_report, print_failure_details, print_summary},
};

/// Options of `race-matrix run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: PathBuf,
    /// Replaces `tracks` from the configuration when not empty.
    pub tracks: Vec<String>,
    pub revision: Option<String>,
    pub html: Option<PathBuf>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub lang: Option<String>,
}

/// Loads the configuration and applies the command line on top of it.
/// Returns the configuration and the locale to use.
pub fn load_config(config_path: &Path, tracks: &[String], lang: Option<&str>) -> Result<(RaceMatrixConfig, String)> {
    let mut config = RaceMatrixConfig::load(config_path)
        .with_context(|| t!("config_load_failed", path = config_path.display()).to_string())?;
    let locale = lang.map(str::to_string).unwrap_or_else(|| config.language.clone());
    rust_i18n::set_locale(&locale);

    if !tracks.is_empty() {
        config.tracks = tracks.to_vec();
    }
    Ok((config, locale))
}

/// Rally files prepared for a run.
pub struct RallyEnvironment {
    pub installed: InstalledRallyConfig,
    /// `<rally home>/.rally`
    pub config_dir: PathBuf,
    pub repo_root: PathBuf,
}

/// Resolves the Rally home and installs the rendered INI file into it.
/// 解析 Rally 主目录并将渲染后的 INI 文件安装到其中。
pub fn install_rally_config(config: &RaceMatrixConfig, locale: &str) -> Result<RallyEnvironment> {
    let home = fs::rally_home(config.rally.home.as_deref())?;
    let config_dir = fs::rally_config_dir(&home);
    let repo_root = fs::absolute_path(&fs::expand_path(&config.rally.track_repo_root)?)?;

    let template_path = config
        .rally
        .config_template
        .as_deref()
        .map(fs::expand_path)
        .transpose()?;
    let template = rally_config::load_template(template_path.as_deref())?;
    let installed = rally_config::install(&template, &config_dir, &config.rally.config_name, &repo_root)
        .context(t!("rally_config_install_failed", locale = locale).to_string())?;

    println!(
        "{}",
        t!("rally_config_installed", locale = locale, path = installed.path().display()).cyan()
    );
    Ok(RallyEnvironment {
        installed,
        config_dir,
        repo_root,
    })
}

/// Discovers the matrix (when enabled) and appends the explicit cases.
/// 发现矩阵（如果启用）并追加显式用例。
pub async fn collect_cases(config: &RaceMatrixConfig, rally: &RallyCli, locale: &str) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();

    if config.discover {
        let tracks = catalog::list_tracks_and_challenges(rally, &config.catalog)
            .await
            .context(t!("catalog_failed", locale = locale).to_string())?;
        println!("{}", t!("catalog_loaded", locale = locale, count = tracks.len()));

        let pairs = planner::build_matrix(&config.tracks, &tracks, config.unknown_tracks)?;
        cases = planner::resolve_cases(&pairs, &config.base_params(), &config.override_table());
    }

    cases.extend(config.explicit_cases());
    Ok(cases)
}

async fn resolve_revision(provided: Option<String>, repo_root: &Path, locale: &str) -> Option<String> {
    if provided.is_some() {
        return provided;
    }
    match git::head_revision(repo_root).await {
        Ok(revision) => Some(revision),
        Err(e) => {
            tracing::warn!(error = %e, "track revision unknown, races will use the checked out tracks");
            println!("{}", t!("revision_unknown", locale = locale).yellow());
            None
        }
    }
}

/// Executes the run command.
pub async fn execute(options: RunOptions) -> Result<()> {
    let (config, locale) = load_config(&options.config, &options.tracks, options.lang.as_deref())?;
    println!(
        "{}",
        t!("loading_config", locale = locale, path = options.config.display())
    );

    let env = install_rally_config(&config, &locale)?;
    let revision = resolve_revision(options.revision.clone(), &env.repo_root, &locale).await;
    if let Some(revision) = &revision {
        println!("{}", t!("track_revision", locale = locale, revision = revision).cyan());
    }

    let cancel = setup_signal_handler(&locale);

    let outcome = match &config.stack {
        Some(settings) => {
            with_stack(&config, settings, &env.config_dir, &options, revision.as_deref(), &cancel, &locale).await
        }
        None => race_matrix(&config, &options, revision.as_deref(), &cancel, &locale).await,
    };

    if let Err(e) = env.installed.remove() {
        tracing::warn!(error = %e, "failed to remove Rally config");
    }
    let results = outcome?;

    report(&results, &options, revision.as_deref(), &cancel, &locale)
}

async fn with_stack(
    config: &RaceMatrixConfig,
    settings: &StackSettings,
    config_dir: &Path,
    options: &RunOptions,
    revision: Option<&str>,
    cancel: &CancellationToken,
    locale: &str,
) -> Result<Vec<TestResult>> {
    let package_dir = settings.resolve_package_dir(config_dir)?;
    stack::ensure_package_repository(&package_dir, &settings.package_repository, &settings.package_branch).await?;

    println!("{}", t!("stack_starting", locale = locale).blue());
    let controller = StackController::new(settings.clone(), package_dir);
    let results = controller
        .scoped(|| race_matrix(config, options, revision, cancel, locale))
        .await??;
    println!("{}", t!("stack_stopped", locale = locale));
    Ok(results)
}

async fn race_matrix(
    config: &RaceMatrixConfig,
    options: &RunOptions,
    revision: Option<&str>,
    cancel: &CancellationToken,
    locale: &str,
) -> Result<Vec<TestResult>> {
    let rally = config.rally.cli();
    let cases = collect_cases(config, &rally, locale).await?;
    let plan = planner::plan_execution(cases, options.total_runners, options.runner_index)?;

    if let (Some(total), Some(index)) = (options.total_runners, options.runner_index) {
        println!(
            "{}",
            t!(
                "running_as_split_runner",
                locale = locale,
                index = index + 1,
                total = total,
                count = plan.cases_to_run.len(),
                elsewhere = plan.assigned_elsewhere
            )
            .bold()
        );
    } else {
        println!(
            "{}",
            t!("running_as_single_runner", locale = locale, count = plan.cases_to_run.len()).bold()
        );
    }

    if plan.cases_to_run.is_empty() {
        println!("{}", t!("no_cases_to_run", locale = locale).green());
        return Ok(Vec::new());
    }

    let invoker = RaceInvoker::new(rally)
        .with_revision(revision.map(str::to_string))
        .with_extra_args(config.rally.extra_race_args.clone());
    let expected = config.expected_exit_code;
    let cases = plan.cases_to_run;

    match &config.cluster {
        Some(settings) => {
            let controller = ClusterController::new(config.rally.cli(), settings.clone());
            let race_id = cluster::new_race_id();
            println!("{}", t!("cluster_starting", locale = locale, port = settings.http_port).blue());
            let results = controller
                .scoped(&race_id, |handle| {
                    println!(
                        "{}",
                        t!("cluster_ready", locale = locale, id = &handle.installation_id).green()
                    );
                    run_cases(&invoker, cases, expected, cancel)
                })
                .await
                .context(t!("cluster_failed", locale = locale).to_string())?;
            println!("{}", t!("cluster_stopped", locale = locale));
            Ok(results)
        }
        None => Ok(run_cases(&invoker, cases, expected, cancel).await),
    }
}

fn report(
    results: &[TestResult],
    options: &RunOptions,
    revision: Option<&str>,
    cancel: &CancellationToken,
    locale: &str,
) -> Result<()> {
    if results.is_empty() {
        return Ok(());
    }
    print_summary(results, locale);

    if let Some(report_path) = &options.html {
        println!("\n{}", t!("html_report_generating", locale = locale, path = report_path.display()));
        if let Err(e) = generate_html_report(results, report_path, locale, revision) {
            eprintln!("{} {:#}", t!("html_report_failed", locale = locale).red(), e);
        }
    }

    let failures: Vec<_> = results.iter().filter(|r| r.is_failure()).collect();
    print_failure_details(&failures, locale);

    let tally = Tally::of(results);
    if tally.failed > 0 {
        anyhow::bail!(t!("races_failed", locale = locale, count = tally.failed).to_string());
    }
    if cancel.is_cancelled() {
        anyhow::bail!(t!("run_interrupted", locale = locale, count = tally.skipped).to_string());
    }
    println!("\n{}", t!("all_races_passed", locale = locale).green().bold());
    Ok(())
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn commit_in(repo: &Path) -> String {
        let git = |args: &[&str]| {
            let output = std::process::Command::new("git")
                .arg("-C")
                .arg(repo)
                .args(["-c", "user.name=t", "-c", "user.email=t@localhost", "-c", "commit.gpgsign=false"])
                .args(args)
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap()
        };
        git(&["init", "-q"]);
        git(&["commit", "-q", "--allow-empty", "-m", "tracks"]);
        git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    #[tokio::test]
    async fn test_revision_comes_from_the_track_repository() {
        let dir = tempdir().unwrap();
        let head = commit_in(dir.path());

        let revision = resolve_revision(None, dir.path(), "en").await;
        assert_eq!(revision.as_deref(), Some(head.as_str()));
    }

    #[tokio::test]
    async fn test_provided_revision_wins_over_git() {
        let dir = tempdir().unwrap();
        let revision = resolve_revision(Some("abc123".to_string()), dir.path(), "en").await;
        assert_eq!(revision.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_revision_is_unknown_outside_a_repository() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_revision(None, dir.path(), "en").await, None);
        assert_eq!(resolve_revision(None, &dir.path().join("missing"), "en").await, None);
    }
}
