//! # Cluster Controller Module / 集群控制器模块
//!
//! Owns the lifecycle of the benchmark target cluster through
//! `esrally install`, `esrally start` and `esrally stop`.
//!
//! 通过 `esrally install`、`esrally start` 和 `esrally stop` 管理基准目标集群的生命周期。
//!
//! ## Lifecycle / 生命周期
//!
//! `Uninstalled -> Installed -> Running -> Stopped`
//!
//! [`ClusterController::scoped`] runs install and start once, hands a
//! [`ClusterHandle`] to the body and always stops the cluster afterwards,
//! whether the body returned normally, returned an error or panicked.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::core::error::ClusterError;
use crate::core::rally::RallyCli;
use crate::infra::command::{describe, run_checked};
use crate::infra::es::{EsClient, EsConnection};

/// Offset between the HTTP port and the transport port of the node.
pub const TRANSPORT_PORT_OFFSET: u16 = 100;

/// Settings for the single-node cluster.
/// 单节点集群的设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterSettings {
    pub node_name: String,
    /// Rally car, e.g. `4gheap,basic-license`
    pub car: String,
    pub http_port: u16,
    pub runtime_jdk: String,
    /// REST layer probes after `esrally start` / `esrally start` 之后的 REST 层探测次数
    pub rest_layer_attempts: u32,
    pub rest_layer_interval_secs: u64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            node_name: "rally-node".to_string(),
            car: "4gheap,basic-license".to_string(),
            http_port: 19200,
            runtime_jdk: "bundled".to_string(),
            rest_layer_attempts: 40,
            rest_layer_interval_secs: 3,
        }
    }
}

impl ClusterSettings {
    pub fn transport_port(&self) -> Result<u16, ClusterError> {
        transport_port(self.http_port)
    }

    /// `host:port` the races should target.
    pub fn target_host(&self) -> String {
        format!("127.0.0.1:{}", self.http_port)
    }
}

pub fn transport_port(http_port: u16) -> Result<u16, ClusterError> {
    http_port
        .checked_add(TRANSPORT_PORT_OFFSET)
        .ok_or(ClusterError::PortOutOfRange {
            http_port,
            offset: TRANSPORT_PORT_OFFSET,
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Uninstalled,
    Installed,
    Running,
    Stopped,
}

/// Identifies the live cluster for the duration of a run.
/// 在运行期间标识当前集群。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub installation_id: String,
    pub race_id: String,
    pub http_port: u16,
}

#[derive(Deserialize)]
struct InstallOutput {
    #[serde(rename = "installation-id")]
    installation_id: String,
}

pub struct ClusterController {
    rally: RallyCli,
    settings: ClusterSettings,
    state: ClusterState,
    installation_id: Option<String>,
}

impl ClusterController {
    pub fn new(rally: RallyCli, settings: ClusterSettings) -> Self {
        Self {
            rally,
            settings,
            state: ClusterState::Uninstalled,
            installation_id: None,
        }
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn installation_id(&self) -> Option<&str> {
        self.installation_id.as_deref()
    }

    fn expect_state(&self, operation: &'static str, expected: ClusterState) -> Result<(), ClusterError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClusterError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Installs a node named `settings.node_name` with the configured car.
    /// 使用配置的 car 安装名为 `settings.node_name` 的节点。
    pub async fn install(&mut self) -> Result<&str, ClusterError> {
        self.expect_state("install", ClusterState::Uninstalled)?;
        let transport_port = self.settings.transport_port()?;
        let node = &self.settings.node_name;
        let mut cmd = self.rally.command(&["install", "--quiet"]);
        cmd.arg(format!("--http-port={}", self.settings.http_port))
            .arg(format!("--node={node}"))
            .arg(format!("--master-nodes={node}"))
            .arg(format!("--car={}", self.settings.car))
            .arg(format!("--seed-hosts=127.0.0.1:{transport_port}"));
        tracing::info!(command = %describe(&cmd), "installing Elasticsearch");

        let output = run_checked(cmd)
            .await
            .map_err(|source| ClusterError::Installation { source })?;
        let parsed: InstallOutput = serde_json::from_str(output.stdout.trim()).map_err(|source| {
            ClusterError::InstallationOutput {
                output: output.stdout.clone(),
                source,
            }
        })?;

        tracing::info!(installation_id = %parsed.installation_id, "Elasticsearch installed");
        self.state = ClusterState::Installed;
        Ok(self.installation_id.insert(parsed.installation_id).as_str())
    }

    /// Starts the installed node and waits for its REST layer.
    /// 启动已安装的节点并等待其 REST 层可用。
    pub async fn start(&mut self, race_id: &str) -> Result<ClusterHandle, ClusterError> {
        self.expect_state("start", ClusterState::Installed)?;
        let installation_id = self.installation_id.clone().unwrap_or_default();
        let mut cmd = self.rally.command(&["start"]);
        cmd.arg(format!("--runtime-jdk={}", self.settings.runtime_jdk))
            .arg(format!("--installation-id={installation_id}"))
            .arg(format!("--race-id={race_id}"));
        tracing::info!(command = %describe(&cmd), "starting Elasticsearch");
        run_checked(cmd)
            .await
            .map_err(|source| ClusterError::Startup { source })?;

        let client = EsClient::new(&EsConnection::local(self.settings.http_port))
            .map_err(ClusterError::RestLayerUnavailable)?;
        client
            .wait_for_rest_layer(
                self.settings.rest_layer_attempts,
                Duration::from_secs(self.settings.rest_layer_interval_secs),
            )
            .await
            .map_err(ClusterError::RestLayerUnavailable)?;

        self.state = ClusterState::Running;
        Ok(ClusterHandle {
            installation_id,
            race_id: race_id.to_string(),
            http_port: self.settings.http_port,
        })
    }

    /// Stops the node if it was ever installed. The state becomes `Stopped`
    /// even when `esrally stop` fails.
    ///
    /// 如果节点曾经安装过则停止它。即使 `esrally stop` 失败，状态也会变为 `Stopped`。
    pub async fn stop(&mut self) -> Result<(), ClusterError> {
        let result = match &self.installation_id {
            Some(id) => {
                let mut cmd = self.rally.command(&["stop"]);
                cmd.arg(format!("--installation-id={id}"));
                tracing::info!(command = %describe(&cmd), "stopping Elasticsearch");
                run_checked(cmd)
                    .await
                    .map(|_| ())
                    .map_err(|source| ClusterError::Stop { source })
            }
            None => Ok(()),
        };
        self.state = ClusterState::Stopped;
        result
    }

    /// Stop with failures logged instead of returned.
    async fn teardown(&mut self) {
        if let Err(e) = self.stop().await {
            tracing::warn!(error = %e, "ignoring failure while stopping the test cluster");
        }
    }

    /// Installs and starts the cluster, runs `body`, then stops the cluster on
    /// every exit path. Install and start errors are returned and `body` is
    /// not run; a panic in `body` is resumed after the cluster is stopped.
    ///
    /// 安装并启动集群，运行 `body`，然后在每条退出路径上停止集群。
    pub async fn scoped<F, Fut, T>(mut self, race_id: &str, body: F) -> Result<T, ClusterError>
    where
        F: FnOnce(ClusterHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        self.install().await?;
        let handle = match self.start(race_id).await {
            Ok(handle) => handle,
            Err(e) => {
                self.teardown().await;
                return Err(e);
            }
        };

        let outcome = AssertUnwindSafe(body(handle)).catch_unwind().await;
        self.teardown().await;
        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl std::fmt::Display for ClusterController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ESCluster[installation-id={}]",
            self.installation_id.as_deref().unwrap_or("None")
        )
    }
}

/// A fresh race id for `esrally start`.
pub fn new_race_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
