//! Thin wrappers over the `git` CLI.

use std::path::Path;

use tokio::process::Command;

use crate::infra::command::{CommandError, run_checked};

/// Clones `remote` into `dest`.
pub async fn clone(remote: &str, dest: &Path) -> Result<(), CommandError> {
    let mut cmd = Command::new("git");
    cmd.arg("clone").arg(remote).arg(dest);
    run_checked(cmd).await.map(|_| ())
}

/// Checks out `branch` in the repository at `repo`.
pub async fn checkout(repo: &Path, branch: &str) -> Result<(), CommandError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo).arg("checkout").arg(branch);
    run_checked(cmd).await.map(|_| ())
}

/// Returns the commit hash `HEAD` points to.
pub async fn head_revision(repo: &Path) -> Result<String, CommandError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo).arg("rev-parse").arg("HEAD");
    let output = run_checked(cmd).await?;
    Ok(output.stdout.trim().to_string())
}
