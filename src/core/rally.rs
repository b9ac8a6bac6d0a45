//! The `esrally` command line shared by every Rally subcommand.

use std::path::PathBuf;

use tokio::process::Command;

/// Where `esrally` lives and which INI configuration it is pointed at.
/// `esrally` 的位置以及它所使用的 INI 配置。
#[derive(Debug, Clone)]
pub struct RallyCli {
    binary: PathBuf,
    config_name: Option<String>,
}

impl RallyCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            config_name: None,
        }
    }

    /// Passes `--config=<name>` to subcommands that read the INI file.
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = Some(name.into());
        self
    }

    /// `esrally <subcommand...>` without any configuration flag.
    pub fn command(&self, subcommand: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(subcommand);
        cmd
    }

    /// `esrally <subcommand...> --config=<name>` when a config name is set.
    pub fn configured_command(&self, subcommand: &[&str]) -> Command {
        let mut cmd = self.command(subcommand);
        if let Some(name) = &self.config_name {
            cmd.arg(format!("--config={name}"));
        }
        cmd
    }
}

impl Default for RallyCli {
    fn default() -> Self {
        Self::new("esrally")
    }
}
