//! # Command Line Interface / 命令行接口
//!
//! Builds the localized `race-matrix` command line and dispatches to the
//! subcommands.
//!
//! 构建本地化的 `race-matrix` 命令行并分派到各子命令。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::infra::es::EsConnection;
use crate::t;

pub mod commands;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` or `--lang=<VALUE>`.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(lang) = args.iter().find_map(|arg| arg.strip_prefix("--lang=")) {
        return Some(lang.to_string());
    }
    let pos = args.iter().position(|arg| arg == "--lang")?;
    args.get(pos + 1).cloned()
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("arg_config", locale = locale).to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn track_arg(locale: &str) -> Arg {
    Arg::new("track")
        .short('t')
        .long("track")
        .help(t!("arg_track", locale = locale).to_string())
        .value_name("TRACK")
        .action(ArgAction::Append)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("race-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(track_arg(locale))
                .arg(
                    Arg::new("revision")
                        .long("revision")
                        .help(t!("arg_revision", locale = locale).to_string())
                        .value_name("REVISION")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("arg_total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("arg_runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("list")
                .about(t!("cmd_list_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(track_arg(locale)),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("update-templates")
                .about(t!("cmd_update_templates_about", locale = locale).to_string())
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help(t!("arg_host", locale = locale).to_string())
                        .value_name("URL")
                        .default_value("http://127.0.0.1:9200")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .help(t!("arg_user", locale = locale).to_string())
                        .value_name("USER")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help(t!("arg_password", locale = locale).to_string())
                        .value_name("PASSWORD")
                        .env("RACE_MATRIX_ES_PASSWORD")
                        .hide_env_values(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("insecure")
                        .long("insecure")
                        .help(t!("arg_insecure", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("params")
                        .long("params")
                        .help(t!("arg_params", locale = locale).to_string())
                        .value_name("JSON")
                        .action(ArgAction::Set),
                ),
        )
}

fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn tracks(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("track")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_lang = pre_parse_language();
    let language = match &explicit_lang {
        Some(lang) => {
            rust_i18n::set_locale(lang);
            lang.clone()
        }
        None => {
            crate::init();
            rust_i18n::locale().to_string()
        }
    };

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let options = commands::run::RunOptions {
                config: config_path(run_matches),
                tracks: tracks(run_matches),
                revision: run_matches.get_one::<String>("revision").cloned(),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                total_runners: run_matches.get_one::<usize>("total-runners").copied(),
                runner_index: run_matches.get_one::<usize>("runner-index").copied(),
                lang: explicit_lang,
            };
            commands::run::execute(options).await?;
        }
        Some(("list", list_matches)) => {
            commands::list::execute(config_path(list_matches), tracks(list_matches), explicit_lang).await?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            if explicit_lang.is_none() && !non_interactive {
                println!(
                    "🌐 {}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(
                &config_path(init_matches),
                &language,
                non_interactive,
                init_matches.get_flag("force"),
            )?;
        }
        Some(("update-templates", tpl_matches)) => {
            let connection = EsConnection {
                url: tpl_matches
                    .get_one::<String>("host")
                    .cloned()
                    .unwrap_or_default(),
                username: tpl_matches.get_one::<String>("user").cloned(),
                password: tpl_matches.get_one::<String>("password").cloned(),
                insecure: tpl_matches.get_flag("insecure"),
            };
            let params = tpl_matches.get_one::<String>("params").cloned();
            commands::templates::execute(connection, params, &language).await?;
        }
        _ => {
            // Clap will have already printed help info.
        }
    }
    Ok(())
}
