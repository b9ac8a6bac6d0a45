//! # Configuration Module / 配置模块
//!
//! The `RaceMatrix.toml` model: which tracks to race, how to reach Rally,
//! the optional cluster and stack, base race parameters, overrides and
//! explicitly listed cases.
//!
//! `RaceMatrix.toml` 模型：要比赛的 track、如何调用 Rally、可选的集群和 stack、
//! 基础比赛参数、覆盖项以及显式列出的用例。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{
    catalog::CatalogLayout,
    cluster::ClusterSettings,
    models::TestCase,
    params::{OverrideEntry, OverrideTable, RaceParams},
    planner::UnknownTrackPolicy,
    rally::RallyCli,
    rally_config::DEFAULT_CONFIG_NAME,
    stack::StackSettings,
};

pub const DEFAULT_CONFIG_FILE: &str = "RaceMatrix.toml";

/// How to invoke Rally and where its files live.
/// 如何调用 Rally 以及其文件所在位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RallySettings {
    pub binary: String,
    /// File name below `<rally home>/.rally/`, passed as `--config`.
    pub config_name: String,
    /// Track repository substituted into the INI template.
    /// 替换到 INI 模板中的 track 仓库。
    pub track_repo_root: String,
    /// Rally home; `$RALLY_HOME`, then `~`, when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    /// INI template file; the built-in one when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_template: Option<String>,
    /// Appended to every `esrally race`.
    pub extra_race_args: Vec<String>,
}

impl Default for RallySettings {
    fn default() -> Self {
        Self {
            binary: "esrally".to_string(),
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            track_repo_root: ".".to_string(),
            home: None,
            config_template: None,
            extra_race_args: Vec::new(),
        }
    }
}

impl RallySettings {
    pub fn cli(&self) -> RallyCli {
        RallyCli::new(&self.binary).with_config_name(&self.config_name)
    }
}

/// A hand-written case raced in addition to the discovered matrix.
/// 除发现的矩阵之外额外运行的手写用例。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitCase {
    /// Defaults to `track/challenge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub track: String,
    pub challenge: String,
    #[serde(default)]
    pub params: RaceParams,
}

impl ExplicitCase {
    pub fn resolve(&self, base: &RaceParams) -> TestCase {
        let mut case = TestCase::new(&self.track, &self.challenge, base.merged_with(&self.params));
        if let Some(name) = &self.name {
            case.name = name.clone();
        }
        case
    }
}

/// Represents the entire configuration, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaceMatrixConfig {
    /// The language for output messages (e.g., "en", "zh-CN").
    /// 输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,

    /// Tracks to race; empty means every track in the catalog.
    /// 要比赛的 track；为空表示目录中的所有 track。
    #[serde(default)]
    pub tracks: Vec<String>,

    /// Read the catalog and build the matrix from it.
    #[serde(default = "default_true")]
    pub discover: bool,

    #[serde(default)]
    pub unknown_tracks: UnknownTrackPolicy,

    #[serde(default)]
    pub expected_exit_code: i32,

    /// Apply the built-in compatibility overrides before the configured ones.
    #[serde(default = "default_true")]
    pub builtin_overrides: bool,

    #[serde(default)]
    pub rally: RallySettings,

    #[serde(default)]
    pub catalog: CatalogLayout,

    /// Provision a local cluster with `esrally install/start/stop`.
    /// 使用 `esrally install/start/stop` 提供本地集群。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterSettings>,

    /// Base parameters for every race.
    /// 每次比赛的基础参数。
    #[serde(default)]
    pub race: RaceParams,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<ExplicitCase>,

    /// Bring up the `elastic-package` stack and install packages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackSettings>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RaceMatrixConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            tracks: Vec::new(),
            discover: true,
            unknown_tracks: UnknownTrackPolicy::default(),
            expected_exit_code: 0,
            builtin_overrides: true,
            rally: RallySettings::default(),
            catalog: CatalogLayout::default(),
            cluster: Some(ClusterSettings::default()),
            race: RaceParams::default(),
            overrides: Vec::new(),
            cases: Vec::new(),
            stack: None,
        }
    }
}

impl RaceMatrixConfig {
    /// Loads and validates a configuration file.
    /// 加载并验证配置文件。
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.discover && self.cases.is_empty() {
            bail!("Nothing to run: discovery is disabled and no [[cases]] are configured");
        }
        if let Some(track) = self.tracks.iter().find(|t| t.trim().is_empty()) {
            bail!("Invalid track name {track:?} in `tracks`");
        }
        for case in &self.cases {
            if case.track.trim().is_empty() || case.challenge.trim().is_empty() {
                bail!("Every [[cases]] entry needs a track and a challenge");
            }
        }
        if self.rally.config_name.contains(['/', '\\']) {
            bail!("rally.config_name must be a file name, got {:?}", self.rally.config_name);
        }
        if let Some(cluster) = &self.cluster {
            cluster.transport_port()?;
        }
        Ok(())
    }

    /// Built-in overrides (unless disabled) with the configured ones merged on top.
    /// 内置覆盖（除非禁用）以及合并在其上的配置覆盖。
    pub fn override_table(&self) -> OverrideTable {
        let mut table = if self.builtin_overrides {
            OverrideTable::compatibility_defaults()
        } else {
            OverrideTable::default()
        };
        table.extend(&self.overrides);
        table
    }

    /// Base race parameters, with `target_hosts` pointing at the managed
    /// cluster when one is configured and no host is set explicitly.
    pub fn base_params(&self) -> RaceParams {
        let mut base = self.race.clone();
        if base.target_hosts.is_none() {
            if let Some(cluster) = &self.cluster {
                base.target_hosts = Some(cluster.target_host());
            }
        }
        base
    }

    pub fn explicit_cases(&self) -> Vec<TestCase> {
        let base = self.base_params();
        self.cases.iter().map(|case| case.resolve(&base)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::TrackNameColumn;
    use crate::core::params::ParamValue;

    const FULL: &str = r#"
language = "zh-CN"
tracks = ["http_logs", "sql"]
unknown_tracks = "ignore"
expected_exit_code = 0

[rally]
binary = "/opt/rally/bin/esrally"
track_repo_root = "~/src/rally-tracks"
extra_race_args = ["--kill-running-processes"]

[catalog]
track_name = "first-token"

[cluster]
http_port = 29200

[race]
test_mode = true
track_params = "number_of_replicas:0"

[[overrides]]
track = "geonames"
challenge = "append-sorted"
[overrides.params]
exclude_tasks = "tag:setup"

[[cases]]
name = "logs-disk-usage"
track = "elastic/logs"
challenge = "logging-disk-usage"
[cases.params.track_params]
number_of_shards = 4
"#;

    #[test]
    fn test_full_config_parses() {
        let config: RaceMatrixConfig = toml::from_str(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.language, "zh-CN");
        assert!(config.discover);
        assert_eq!(config.unknown_tracks, UnknownTrackPolicy::Ignore);
        assert_eq!(config.rally.config_name, DEFAULT_CONFIG_NAME);
        assert_eq!(config.catalog.track_name, TrackNameColumn::FirstToken);
        assert_eq!(config.catalog.header_lines, 12);

        let cluster = config.cluster.as_ref().unwrap();
        assert_eq!(cluster.http_port, 29200);
        assert_eq!(cluster.transport_port().unwrap(), 29300);
        assert_eq!(cluster.car, "4gheap,basic-license");
        assert!(config.stack.is_none());
    }

    #[test]
    fn test_base_params_target_the_managed_cluster() {
        let config: RaceMatrixConfig = toml::from_str(FULL).unwrap();
        let base = config.base_params();
        assert_eq!(base.target_hosts.as_deref(), Some("127.0.0.1:29200"));
        assert_eq!(base.test_mode, Some(true));
    }

    #[test]
    fn test_override_table_keeps_builtin_entries() {
        let config: RaceMatrixConfig = toml::from_str(FULL).unwrap();
        let table = config.override_table();
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.get("http_logs", "runtime-fields").unwrap().enable_assertions,
            Some(false)
        );
        assert_eq!(
            table.get("geonames", "append-sorted").unwrap().exclude_tasks.as_deref(),
            Some("tag:setup")
        );

        let mut config = config;
        config.builtin_overrides = false;
        assert_eq!(config.override_table().len(), 1);
    }

    #[test]
    fn test_explicit_case_merges_track_params() {
        let config: RaceMatrixConfig = toml::from_str(FULL).unwrap();
        let cases = config.explicit_cases();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "logs-disk-usage");
        assert_eq!(cases[0].track, "elastic/logs");
        assert_eq!(
            cases[0].params.track_params.get("number_of_shards"),
            Some(&ParamValue::Integer(4))
        );
        assert_eq!(
            cases[0].params.track_params.get("number_of_replicas"),
            Some(&ParamValue::Text("0".to_string()))
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RaceMatrixConfig = toml::from_str("").unwrap();
        assert_eq!(config.language, "en");
        assert!(config.tracks.is_empty());
        assert!(config.discover);
        assert!(config.builtin_overrides);
        assert!(config.cluster.is_none());
        assert_eq!(config.rally.binary, "esrally");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<RaceMatrixConfig>("trakcs = [\"sql\"]").is_err());
        assert!(toml::from_str::<RaceMatrixConfig>("[race]\nenable_asserts = true").is_err());
    }

    #[test]
    fn test_validation() {
        let config: RaceMatrixConfig = toml::from_str("discover = false").unwrap();
        assert!(config.validate().is_err());

        let config: RaceMatrixConfig = toml::from_str("[rally]\nconfig_name = \"../x.ini\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_round_trips() {
        let config = RaceMatrixConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RaceMatrixConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_http_port_without_room_for_transport_is_rejected() {
        let config: RaceMatrixConfig = toml::from_str("[cluster]\nhttp_port = 65500").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("65500"));

        let config: RaceMatrixConfig = toml::from_str("[cluster]\nhttp_port = 65435").unwrap();
        assert!(config.validate().is_ok());
    }
}
