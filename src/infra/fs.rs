//! # File System Operations Module / 文件系统操作模块
//!
//! Path helpers: resolving the Rally home directory, expanding `~` and
//! environment variables in configured paths, and picking package versions.
//!
//! 路径工具：解析 Rally 主目录、展开配置路径中的 `~` 和环境变量，以及选择包版本。

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the home directory Rally uses.
pub const RALLY_HOME_ENV: &str = "RALLY_HOME";

/// Name of Rally's configuration directory below the Rally home.
pub const RALLY_CONFIG_DIR_NAME: &str = ".rally";

/// Expands `~` and `$VAR` / `${VAR}` references in a configured path.
///
/// # Arguments
/// * `raw` - The path as written in the configuration
///
/// # Returns
/// The expanded path, or an error naming the undefined variable
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Resolves the Rally home: the configured value wins, then `$RALLY_HOME`,
/// then the user's home directory.
/// 解析 Rally 主目录：配置值优先，其次是 `$RALLY_HOME`，最后是用户主目录。
pub fn rally_home(configured: Option<&str>) -> Result<PathBuf> {
    rally_home_from(configured, std::env::var(RALLY_HOME_ENV).ok())
}

/// Same as [`rally_home`] with the environment value passed in explicitly.
pub fn rally_home_from(configured: Option<&str>, env_value: Option<String>) -> Result<PathBuf> {
    match (configured, env_value) {
        (Some(path), _) => expand_path(path),
        (None, Some(path)) if !path.is_empty() => expand_path(&path),
        _ => Ok(PathBuf::from(shellexpand::tilde("~").as_ref())),
    }
}

/// The `.rally` directory below a Rally home.
pub fn rally_config_dir(home: &Path) -> PathBuf {
    home.join(RALLY_CONFIG_DIR_NAME)
}

/// Checks if a path exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}

/// Gets the absolute path from a potentially relative path.
///
/// # Arguments
/// * `path` - Path to canonicalize
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

/// Returns the lexicographically last subdirectory of `package_root`, which
/// is the newest version in a `package-storage` checkout.
///
/// 返回 `package_root` 下按字典序排列的最后一个子目录，即 `package-storage` 检出中的最新版本。
pub fn latest_version_dir(package_root: &Path) -> Result<PathBuf> {
    let mut versions: Vec<String> = fs::read_dir(package_root)
        .with_context(|| format!("Failed to list package versions in {}", package_root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    versions.sort();
    match versions.pop() {
        Some(latest) => Ok(package_root.join(latest)),
        None => bail!("No package versions found in {}", package_root.display()),
    }
}
