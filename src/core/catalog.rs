//! # Track Catalog Module / Track 目录模块
//!
//! Reads the tracks and challenges Rally knows about by running
//! `esrally list tracks` and parsing its table.
//!
//! 通过运行 `esrally list tracks` 并解析其表格，读取 Rally 已知的 track 和 challenge。

use serde::{Deserialize, Serialize};

use crate::core::error::{CatalogError, CatalogParseError};
use crate::core::models::Track;
use crate::core::rally::RallyCli;
use crate::infra::command::{describe, run_checked};

/// Which tokens of a table row form the track name.
/// 表格行中的哪些 token 构成 track 名称。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackNameColumn {
    /// Every token except the trailing challenge list.
    #[default]
    AllButLast,
    /// Only the first token; the columns in between are descriptive.
    FirstToken,
}

/// The fixed shape of the `list tracks` output.
/// `list tracks` 输出的固定格式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogLayout {
    /// Rally banner and table header lines / Rally 横幅和表头行
    pub header_lines: usize,
    /// Blank and informational lines after the table / 表格后的空行和信息行
    pub footer_lines: usize,
    pub track_name: TrackNameColumn,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            header_lines: 12,
            footer_lines: 5,
            track_name: TrackNameColumn::AllButLast,
        }
    }
}

/// Parses `list tracks` output into tracks in table order.
/// Any row that cannot be split into a name and a challenge list fails the
/// whole parse.
///
/// 将 `list tracks` 输出解析为按表格顺序排列的 track。
/// 任何无法拆分为名称和 challenge 列表的行都会导致整个解析失败。
pub fn parse_track_list(
    output: &str,
    layout: &CatalogLayout,
) -> Result<Vec<Track>, CatalogParseError> {
    let lines: Vec<&str> = output.split('\n').collect();
    let skipped = layout.header_lines + layout.footer_lines;
    if lines.len() < skipped {
        return Err(CatalogParseError::Truncated {
            expected: skipped,
            actual: lines.len(),
        });
    }

    let rows = &lines[layout.header_lines..lines.len() - layout.footer_lines];
    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_row(row, layout.header_lines + i + 1, layout.track_name))
        .collect()
}

fn parse_row(row: &str, line: usize, column: TrackNameColumn) -> Result<Track, CatalogParseError> {
    let malformed = || CatalogParseError::MalformedLine {
        line,
        content: row.to_string(),
    };

    let tokens: Vec<&str> = row.split_whitespace().collect();
    let Some((challenge_list, name_tokens)) = tokens.split_last() else {
        return Err(malformed());
    };
    if name_tokens.is_empty() {
        return Err(malformed());
    }

    let name = match column {
        TrackNameColumn::AllButLast => name_tokens.join(" "),
        TrackNameColumn::FirstToken => name_tokens[0].to_string(),
    };
    let challenges: Vec<&str> = challenge_list.split(',').collect();
    if challenges.iter().any(|c| c.is_empty()) {
        return Err(malformed());
    }

    Ok(Track::new(name, challenges))
}

/// Runs `esrally list tracks` and parses the result.
/// 运行 `esrally list tracks` 并解析结果。
pub async fn list_tracks_and_challenges(
    rally: &RallyCli,
    layout: &CatalogLayout,
) -> Result<Vec<Track>, CatalogError> {
    let cmd = rally.configured_command(&["list", "tracks"]);
    tracing::info!(command = %describe(&cmd), "listing tracks");
    let output = run_checked(cmd).await?;
    let tracks = parse_track_list(&output.stdout, layout)?;
    tracing::info!(tracks = tracks.len(), "track catalog loaded");
    Ok(tracks)
}
