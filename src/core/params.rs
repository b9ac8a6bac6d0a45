//! # Race Parameters Module / 比赛参数模块
//!
//! The named parameters passed to `esrally race`, as an explicit typed
//! structure instead of free-form keyword arguments, plus the per
//! (track, challenge) override table.
//!
//! 传递给 `esrally race` 的命名参数（显式类型结构，而不是任意关键字参数），
//! 以及按 (track, challenge) 索引的覆盖表。

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid parameter entry `{entry}`: expected `key:value`")]
pub struct ParseParamsError {
    pub entry: String,
}

/// A single scalar parameter value.
/// 单个标量参数值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Integer(v) => write!(f, "{v}"),
            // `1.0` stays `1.0`; Rally reads `1` back as an integer.
            ParamValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// An ordered `key -> value` map rendered as `k:v,k2:v2` on the command line.
/// In configuration it may be written either as a table or as that inline string.
/// Rally splits the rendered list on every `,`, so no value may contain one,
/// in either form.
///
/// 有序的 `key -> value` 映射，在命令行上渲染为 `k:v,k2:v2`。
/// 在配置中可以写成表，也可以写成该内联字符串。
/// Rally 按每个 `,` 拆分渲染结果，因此任何值都不能包含逗号。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParamMapRepr")]
pub struct ParamMap(BTreeMap<String, ParamValue>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ParamMapRepr {
    Inline(String),
    Table(BTreeMap<String, ParamValue>),
}

impl TryFrom<ParamMapRepr> for ParamMap {
    type Error = ParseParamsError;

    fn try_from(repr: ParamMapRepr) -> Result<Self, Self::Error> {
        match repr {
            ParamMapRepr::Inline(text) => text.parse(),
            ParamMapRepr::Table(map) => Ok(ParamMap(map)),
        }
    }
}

/// Parses `k:v,k2:v2`. Every `,` ends an entry and the first `:` of an entry
/// separates key from value. Values stay text.
impl FromStr for ParamMap {
    type Err = ParseParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = BTreeMap::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry.split_once(':').ok_or_else(|| ParseParamsError {
                entry: entry.to_string(),
            })?;
            map.insert(key.trim().to_string(), ParamValue::from(value.trim()));
        }
        Ok(ParamMap(map))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ParamMap(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl ParamMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Copies every entry of `other` into `self`; `other` wins on collision.
    pub fn extend_from(&mut self, other: &ParamMap) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Renders as `k:v,k2:v2`, keys in sorted order.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Every parameter the race invoker understands. Unset fields produce no flag.
///
/// 比赛调用器能理解的所有参数。未设置的字段不产生标志。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RaceParams {
    /// `--track-params`, merged per key.
    #[serde(skip_serializing_if = "ParamMap::is_empty")]
    pub track_params: ParamMap,
    /// `--target-hosts`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_hosts: Option<String>,
    /// `--client-options`, merged per key.
    #[serde(skip_serializing_if = "ParamMap::is_empty")]
    pub client_options: ParamMap,
    /// `--include-tasks`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tasks: Option<String>,
    /// `--exclude-tasks`, e.g. `tag:setup`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_tasks: Option<String>,
    /// `--enable-assertions` when true, omitted when false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_assertions: Option<bool>,
    /// `--test-mode` when true, omitted when false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,
}

fn value_flag(name: &str, value: impl fmt::Display) -> String {
    format!("--{}={}", name.replace('_', "-"), value)
}

fn switch_flag(name: &str, enabled: Option<bool>) -> Option<String> {
    enabled
        .filter(|on| *on)
        .map(|_| format!("--{}", name.replace('_', "-")))
}

impl RaceParams {
    /// Returns `self` with every field set in `over` taking precedence.
    /// Map-valued fields are merged per key. Applying the same override twice
    /// gives the same result as applying it once.
    ///
    /// 返回以 `over` 中已设置字段为优先的 `self`。映射字段按键合并。
    pub fn merged_with(&self, over: &RaceParams) -> RaceParams {
        let mut track_params = self.track_params.clone();
        track_params.extend_from(&over.track_params);
        let mut client_options = self.client_options.clone();
        client_options.extend_from(&over.client_options);

        RaceParams {
            track_params,
            target_hosts: over.target_hosts.clone().or_else(|| self.target_hosts.clone()),
            client_options,
            include_tasks: over.include_tasks.clone().or_else(|| self.include_tasks.clone()),
            exclude_tasks: over.exclude_tasks.clone().or_else(|| self.exclude_tasks.clone()),
            enable_assertions: over.enable_assertions.or(self.enable_assertions),
            test_mode: over.test_mode.or(self.test_mode),
        }
    }

    /// Renders the set fields as `esrally` command-line flags.
    /// 将已设置的字段渲染为 `esrally` 命令行标志。
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if !self.track_params.is_empty() {
            flags.push(value_flag("track_params", self.track_params.render()));
        }
        if let Some(hosts) = &self.target_hosts {
            flags.push(value_flag("target_hosts", hosts));
        }
        if !self.client_options.is_empty() {
            flags.push(value_flag("client_options", self.client_options.render()));
        }
        if let Some(tasks) = &self.include_tasks {
            flags.push(value_flag("include_tasks", tasks));
        }
        if let Some(tasks) = &self.exclude_tasks {
            flags.push(value_flag("exclude_tasks", tasks));
        }
        flags.extend(switch_flag("enable_assertions", self.enable_assertions));
        flags.extend(switch_flag("test_mode", self.test_mode));
        flags
    }
}

/// One configured override, keyed by track and challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideEntry {
    pub track: String,
    pub challenge: String,
    #[serde(default)]
    pub params: RaceParams,
}

/// Overrides looked up at matrix-build time. Absent entries mean no overrides.
/// 在构建矩阵时查找的覆盖项。不存在的条目表示没有覆盖。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: BTreeMap<(String, String), RaceParams>,
}

static COMPATIBILITY_OVERRIDES: Lazy<OverrideTable> = Lazy::new(|| {
    let no_assertions = RaceParams {
        enable_assertions: Some(false),
        ..RaceParams::default()
    };
    let sql_mix = RaceParams {
        track_params: [("ingest_percentage", "1"), ("query_percentage", "2")]
            .into_iter()
            .collect(),
        ..RaceParams::default()
    };
    OverrideTable::default()
        .with("http_logs", "runtime-fields", no_assertions.clone())
        .with("http_logs", "append-no-conflicts", no_assertions)
        .with("sql", "sql", sql_mix)
});

impl OverrideTable {
    /// The overrides the track compatibility suite has always applied.
    pub fn compatibility_defaults() -> Self {
        COMPATIBILITY_OVERRIDES.clone()
    }

    /// Adds an override; if one already exists for the key the new one is
    /// merged on top of it.
    pub fn with(mut self, track: &str, challenge: &str, params: RaceParams) -> Self {
        self.insert(track, challenge, &params);
        self
    }

    pub fn insert(&mut self, track: &str, challenge: &str, params: &RaceParams) {
        let key = (track.to_string(), challenge.to_string());
        let merged = match self.entries.get(&key) {
            Some(existing) => existing.merged_with(params),
            None => params.clone(),
        };
        self.entries.insert(key, merged);
    }

    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a OverrideEntry>) {
        for entry in entries {
            self.insert(&entry.track, &entry.challenge, &entry.params);
        }
    }

    pub fn get(&self, track: &str, challenge: &str) -> Option<&RaceParams> {
        self.entries.get(&(track.to_string(), challenge.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Base parameters with the override for (track, challenge) applied.
    pub fn resolve(&self, base: &RaceParams, track: &str, challenge: &str) -> RaceParams {
        match self.get(track, challenge) {
            Some(over) => base.merged_with(over),
            None => base.clone(),
        }
    }
}
