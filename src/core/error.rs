//! # Error Types / 错误类型
//!
//! Typed errors for every component. The CLI layer wraps them in `anyhow`.
//!
//! 每个组件的类型化错误。CLI 层用 `anyhow` 包装它们。

use thiserror::Error;

use crate::core::cluster::ClusterState;
use crate::infra::command::CommandError;
use crate::infra::es::EsError;

/// The `list tracks` output did not have the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogParseError {
    #[error("track list has {actual} lines, expected at least {expected} (header and footer)")]
    Truncated { expected: usize, actual: usize },
    #[error("line {line} of the track list has no track/challenge split: {content:?}")]
    MalformedLine { line: usize, content: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to list tracks: {0}")]
    Command(#[from] CommandError),
    #[error(transparent)]
    Parse(#[from] CatalogParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("requested tracks not found in the catalog: {}", .tracks.join(", "))]
    UnknownTrack { tracks: Vec<String> },
    #[error("runner index {index} must be less than total runners {total}")]
    RunnerIndexOutOfRange { index: usize, total: usize },
    #[error("both --total-runners and --runner-index must be provided")]
    IncompleteSharding,
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Failed to install Elasticsearch: {source}")]
    Installation {
        #[source]
        source: CommandError,
    },
    #[error("Failed to read the installation id from `esrally install` output {output:?}: {source}")]
    InstallationOutput {
        output: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to start Elasticsearch test cluster: {source}")]
    Startup {
        #[source]
        source: CommandError,
    },
    #[error("Elasticsearch test cluster started but is not reachable: {0}")]
    RestLayerUnavailable(#[source] EsError),
    #[error("Failed to stop Elasticsearch test cluster: {source}")]
    Stop {
        #[source]
        source: CommandError,
    },
    #[error("http_port {http_port} leaves no room for the transport port (http_port + {offset})")]
    PortOutOfRange { http_port: u16, offset: u16 },
    #[error("cannot {operation} a cluster in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ClusterState,
    },
}

#[derive(Debug, Error)]
pub enum StackError {
    #[error("failed to prepare package repository at {path}: {source}")]
    Repository {
        path: String,
        #[source]
        source: CommandError,
    },
    #[error("failed to {action} the elastic-package stack: {source}")]
    Stack {
        action: &'static str,
        #[source]
        source: CommandError,
    },
    #[error("failed to install package {package}: {source}")]
    Package {
        package: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid stack command `{0}`")]
    InvalidCommand(String),
}

#[derive(Debug, Error)]
pub enum RallyConfigError {
    #[error("unknown placeholder ${0} in Rally config template")]
    UnknownPlaceholder(String),
    #[error("invalid placeholder at byte {0} in Rally config template")]
    InvalidPlaceholder(usize),
    #[error("line {line} of {path} is not a section, key or comment: {content:?}")]
    MalformedIni {
        path: String,
        line: usize,
        content: String,
    },
    #[error("I/O error on Rally config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
