//! # Rally Configuration Module / Rally 配置模块
//!
//! Renders the INI file Rally reads with `--config=<name>`, installs it into
//! `<rally home>/.rally/` and removes it again when the run is over.
//!
//! 渲染 Rally 通过 `--config=<name>` 读取的 INI 文件，将其安装到 `<rally home>/.rally/`，
//! 并在运行结束时再次删除。
//!
//! Templates use `$NAME` / `${NAME}` placeholders and `$$` for a literal `$`.
//! 模板使用 `$NAME` / `${NAME}` 占位符，`$$` 表示字面量 `$`。

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::error::RallyConfigError;

pub const DEFAULT_CONFIG_NAME: &str = "rally-tracks-compatibility.ini";

/// Template compiled into the binary.
pub const BUILTIN_TEMPLATE: &str = include_str!("../../resources/rally-tracks-compatibility.ini");

pub const TRACK_REPO_ROOT_VAR: &str = "LOCAL_TRACK_REPO_ROOT";
pub const CONFIG_DIR_VAR: &str = "CONFIG_DIR";

/// Sections of an INI file, each a map of keys to raw values.
pub type IniDocument = BTreeMap<String, BTreeMap<String, String>>;

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Substitutes every placeholder. A placeholder without a value is an error.
/// 替换每个占位符。没有值的占位符是错误。
pub fn render_template(
    template: &str,
    vars: &BTreeMap<&str, String>,
) -> Result<String, RallyConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let offset = template.len() - rest.len() + pos;
        let after = &rest[pos + 1..];

        let (name, consumed) = if after.starts_with('$') {
            out.push('$');
            rest = &after[1..];
            continue;
        } else if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or(RallyConfigError::InvalidPlaceholder(offset))?;
            let name = &braced[..end];
            let valid = name.starts_with(is_ident_start) && name.chars().all(is_ident_char);
            if !valid {
                return Err(RallyConfigError::InvalidPlaceholder(offset));
            }
            (name, end + 2)
        } else if after.starts_with(is_ident_start) {
            let end = after
                .find(|c: char| !is_ident_char(c))
                .unwrap_or(after.len());
            (&after[..end], end)
        } else {
            return Err(RallyConfigError::InvalidPlaceholder(offset));
        };

        let value = vars
            .get(name)
            .ok_or_else(|| RallyConfigError::UnknownPlaceholder(name.to_string()))?;
        out.push_str(value);
        rest = &after[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Reads a template file, or returns the built-in one.
pub fn load_template(path: Option<&Path>) -> Result<String, RallyConfigError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| RallyConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
        None => Ok(BUILTIN_TEMPLATE.to_string()),
    }
}

/// A Rally INI file written by [`install`]. Removed on [`remove`](Self::remove)
/// or, failing that, when dropped.
///
/// 由 [`install`] 写入的 Rally INI 文件。在调用 `remove` 时删除，否则在被丢弃时删除。
#[derive(Debug)]
pub struct InstalledRallyConfig {
    path: PathBuf,
    removed: bool,
}

impl InstalledRallyConfig {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(mut self) -> Result<(), RallyConfigError> {
        self.removed = true;
        std::fs::remove_file(&self.path).map_err(|source| RallyConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), "removed Rally config");
        Ok(())
    }
}

impl Drop for InstalledRallyConfig {
    fn drop(&mut self) {
        if !self.removed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove Rally config");
            }
        }
    }
}

/// Renders `template` and writes it atomically to `<config_dir>/<config_name>`.
///
/// # Arguments
/// * `config_dir` - Rally's configuration directory, substituted as `$CONFIG_DIR`
/// * `track_repo_root` - substituted as `$LOCAL_TRACK_REPO_ROOT`
pub fn install(
    template: &str,
    config_dir: &Path,
    config_name: &str,
    track_repo_root: &Path,
) -> Result<InstalledRallyConfig, RallyConfigError> {
    let vars = BTreeMap::from([
        (TRACK_REPO_ROOT_VAR, track_repo_root.display().to_string()),
        (CONFIG_DIR_VAR, config_dir.display().to_string()),
    ]);
    let contents = render_template(template, &vars)?;

    let io_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| RallyConfigError::Io { path, source }
    };
    std::fs::create_dir_all(config_dir).map_err(io_err(config_dir))?;

    let target = config_dir.join(config_name);
    let mut tmp = NamedTempFile::new_in(config_dir).map_err(io_err(config_dir))?;
    tmp.write_all(contents.as_bytes()).map_err(io_err(&target))?;
    tmp.persist(&target)
        .map_err(|e| io_err(&target)(e.error))?;

    tracing::info!(path = %target.display(), "installed Rally config");
    Ok(InstalledRallyConfig {
        path: target,
        removed: false,
    })
}

/// Parses INI text: `[section]` headers, `key = value` pairs, `#`/`;` comments.
pub fn parse_ini(text: &str, origin: &str) -> Result<IniDocument, RallyConfigError> {
    let mut doc = IniDocument::new();
    let mut section: Option<String> = None;

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let malformed = || RallyConfigError::MalformedIni {
            path: origin.to_string(),
            line: i + 1,
            content: raw.to_string(),
        };

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            doc.entry(name.trim().to_string()).or_default();
            section = Some(name.trim().to_string());
        } else if let Some((key, value)) = line.split_once('=') {
            let name = section.as_ref().ok_or_else(malformed)?;
            doc.entry(name.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        } else {
            return Err(malformed());
        }
    }
    Ok(doc)
}

pub fn read_ini(path: &Path) -> Result<IniDocument, RallyConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| RallyConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_ini(&text, &path.display().to_string())
}
