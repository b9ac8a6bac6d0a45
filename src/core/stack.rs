//! # Stack Controller Module / Stack 控制器模块
//!
//! Prepares the `elastic-package` stack that some tracks race against: a
//! `package-storage` checkout, `stack up`/`stack down` around the run and the
//! installation of integration packages.
//!
//! 准备某些 track 比赛所需的 `elastic-package` stack：`package-storage` 检出、
//! 运行前后的 `stack up`/`stack down`，以及集成包的安装。

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use anyhow::Context;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::core::error::StackError;
use crate::infra::command::{describe, run_checked};
use crate::infra::{fs, git};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackSettings {
    pub binary: String,
    /// Package names, or `name/version` to pin a version.
    /// 包名，或使用 `name/version` 固定版本。
    pub packages: Vec<String>,
    pub package_repository: String,
    pub package_branch: String,
    /// Checkout location; `<rally home>/.rally/benchmarks/package-storage` when unset.
    pub package_dir: Option<String>,
    pub up_command: String,
    pub down_command: String,
    /// Added to the environment of `elastic-package install`. Values may use `~` and `$VAR`.
    pub env: BTreeMap<String, String>,
}

impl Default for StackSettings {
    fn default() -> Self {
        let env = [
            ("ELASTIC_PACKAGE_ELASTICSEARCH_HOST", "https://127.0.0.1:9200"),
            ("ELASTIC_PACKAGE_ELASTICSEARCH_USERNAME", "elastic"),
            ("ELASTIC_PACKAGE_ELASTICSEARCH_PASSWORD", "changeme"),
            ("ELASTIC_PACKAGE_KIBANA_HOST", "https://127.0.0.1:5601"),
            (
                "ELASTIC_PACKAGE_CA_CERT",
                "~/.elastic-package/profiles/default/certs/ca-cert.pem",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            binary: "elastic-package".to_string(),
            packages: ["apache", "kafka", "mysql", "nginx", "postgresql", "redis", "system"]
                .into_iter()
                .map(String::from)
                .collect(),
            package_repository: "https://github.com/elastic/package-storage".to_string(),
            package_branch: "production".to_string(),
            package_dir: None,
            up_command: "stack up -d -v".to_string(),
            down_command: "stack down -v".to_string(),
            env,
        }
    }
}

impl StackSettings {
    /// Where the `package-storage` checkout lives.
    pub fn resolve_package_dir(&self, rally_config_dir: &Path) -> anyhow::Result<PathBuf> {
        match &self.package_dir {
            Some(dir) => fs::expand_path(dir),
            None => Ok(rally_config_dir.join("benchmarks").join("package-storage")),
        }
    }
}

/// Clones `remote` into `dir` unless it is already there, then checks out `branch`.
/// 除非 `dir` 已存在，否则将 `remote` 克隆到 `dir`，然后检出 `branch`。
pub async fn ensure_package_repository(dir: &Path, remote: &str, branch: &str) -> Result<(), StackError> {
    let repo_err = |source| StackError::Repository {
        path: dir.display().to_string(),
        source,
    };
    if fs::is_directory(dir) {
        tracing::info!(path = %dir.display(), "package repository already exists, skipping clone");
    } else {
        tracing::info!(path = %dir.display(), %remote, "cloning package repository");
        git::clone(remote, dir).await.map_err(repo_err)?;
    }
    tracing::info!(path = %dir.display(), %branch, "checking out branch");
    git::checkout(dir, branch).await.map_err(repo_err)
}

pub struct StackController {
    settings: StackSettings,
    package_dir: PathBuf,
}

impl StackController {
    pub fn new(settings: StackSettings, package_dir: PathBuf) -> Self {
        Self {
            settings,
            package_dir,
        }
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    fn command(&self, args: &str) -> Result<Command, StackError> {
        let args = shlex::split(args).ok_or_else(|| StackError::InvalidCommand(args.to_string()))?;
        let mut cmd = Command::new(&self.settings.binary);
        cmd.args(args);
        Ok(cmd)
    }

    async fn run_stack(&self, action: &'static str, args: &str) -> Result<(), StackError> {
        let cmd = self.command(args)?;
        tracing::info!(command = %describe(&cmd), "{action} stack services");
        let output = run_checked(cmd)
            .await
            .map_err(|source| StackError::Stack { action, source })?;
        tracing::debug!(output = %output.combined, "{action} finished");
        Ok(())
    }

    pub async fn up(&self) -> Result<(), StackError> {
        self.run_stack("start", &self.settings.up_command).await
    }

    pub async fn down(&self) -> Result<(), StackError> {
        self.run_stack("stop", &self.settings.down_command).await
    }

    /// The directory to install for one package entry.
    /// 一个包条目要安装的目录。
    pub fn package_path(&self, package: &str) -> anyhow::Result<PathBuf> {
        let root = self.package_dir.join("packages").join(package);
        if package.contains('/') {
            Ok(root)
        } else {
            fs::latest_version_dir(&root)
        }
    }

    fn install_command(&self, path: &Path) -> anyhow::Result<Command> {
        let mut cmd = Command::new(&self.settings.binary);
        cmd.arg("install").arg("-R").arg(path).arg("-v");
        for (key, value) in &self.settings.env {
            let value = shellexpand::full(value)
                .with_context(|| format!("Failed to expand {key}={value}"))?;
            cmd.env(key, value.as_ref());
        }
        Ok(cmd)
    }

    /// Installs every configured package in order. The first failure aborts.
    /// 按顺序安装每个配置的包。第一次失败即中止。
    pub async fn install_packages(&self) -> Result<usize, StackError> {
        for package in &self.settings.packages {
            let package_err = |source| StackError::Package {
                package: package.clone(),
                source,
            };
            let path = self.package_path(package).map_err(package_err)?;
            let cmd = self.install_command(&path).map_err(package_err)?;
            tracing::info!(command = %describe(&cmd), "installing package");
            run_checked(cmd)
                .await
                .map_err(|e| package_err(e.into()))?;
        }
        Ok(self.settings.packages.len())
    }

    async fn teardown(&self) {
        if let Err(e) = self.down().await {
            tracing::warn!(error = %e, "ignoring failure while stopping stack services");
        }
    }

    /// Brings the stack up, installs the packages, runs `body` and brings the
    /// stack down again on every exit path after a successful `up`.
    ///
    /// 启动 stack、安装包、运行 `body`，并在 `up` 成功后的每条退出路径上关闭 stack。
    pub async fn scoped<F, Fut, T>(self, body: F) -> Result<T, StackError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.up().await?;
        if let Err(e) = self.install_packages().await {
            self.teardown().await;
            return Err(e);
        }

        let outcome = AssertUnwindSafe(body()).catch_unwind().await;
        self.teardown().await;
        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
