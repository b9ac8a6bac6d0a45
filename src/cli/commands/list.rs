//! `race-matrix list`: prints the cases a run would race, with their
//! `esrally race` command lines, without starting a cluster.
//!
//! `race-matrix list`：打印一次运行将要比赛的用例及其 `esrally race` 命令行，不启动集群。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::cli::commands::run::{collect_cases, install_rally_config, load_config};
use crate::core::race::RaceInvoker;
use crate::infra::command::describe;
use crate::t;

pub async fn execute(config_path: PathBuf, tracks: Vec<String>, lang: Option<String>) -> Result<()> {
    let (config, locale) = load_config(&config_path, &tracks, lang.as_deref())?;
    let env = install_rally_config(&config, &locale)?;

    let rally = config.rally.cli();
    let cases = collect_cases(&config, &rally, &locale).await;
    if let Err(e) = env.installed.remove() {
        tracing::warn!(error = %e, "failed to remove Rally config");
    }
    let cases = cases?;

    let invoker = RaceInvoker::new(rally).with_extra_args(config.rally.extra_race_args.clone());
    println!("\n{}", t!("list_banner", locale = &locale, count = cases.len()).bold());
    for case in &cases {
        let cmd = invoker.command(&case.track, &case.challenge, &case.params);
        println!("  - {}", case.name.cyan());
        println!("      {}", describe(&cmd).dimmed());
    }
    Ok(())
}
