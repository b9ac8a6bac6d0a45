//! # Test Matrix Planner Module / 测试矩阵计划模块
//!
//! This module turns the track catalog into the ordered list of races to run:
//! it selects the requested tracks, expands every challenge, applies the
//! override table and optionally splits the result across CI runners.
//!
//! 此模块将 track 目录转换为要运行的有序比赛列表：
//! 选择请求的 track、展开每个 challenge、应用覆盖表，并可选地在多个 CI 运行器之间拆分结果。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::error::MatrixError;
use crate::core::models::{TestCase, Track};
use crate::core::params::{OverrideTable, RaceParams};

/// What to do with a requested track that the catalog does not list.
/// 如何处理目录中未列出的请求 track。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownTrackPolicy {
    /// Abort with [`MatrixError::UnknownTrack`].
    #[default]
    Fail,
    /// Drop it silently.
    Ignore,
}

/// Builds the ordered (track, challenge) pairs for the requested tracks.
/// An empty request selects every track. Order follows the catalog.
///
/// 为请求的 track 构建有序的 (track, challenge) 对。空请求选择所有 track。顺序遵循目录。
///
/// # Arguments
/// * `requested` - Track names to run; empty means all
/// * `catalog` - Tracks as listed by Rally
/// * `policy` - Handling of requested names missing from the catalog
pub fn build_matrix(
    requested: &[String],
    catalog: &[Track],
    policy: UnknownTrackPolicy,
) -> Result<Vec<(String, String)>, MatrixError> {
    let wanted: BTreeSet<&str> = requested.iter().map(String::as_str).collect();

    if policy == UnknownTrackPolicy::Fail {
        let unknown: Vec<String> = wanted
            .iter()
            .filter(|name| !catalog.iter().any(|track| track.name == **name))
            .map(|name| name.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(MatrixError::UnknownTrack { tracks: unknown });
        }
    }

    Ok(catalog
        .iter()
        .filter(|track| wanted.is_empty() || wanted.contains(track.name.as_str()))
        .flat_map(|track| {
            track
                .challenges
                .iter()
                .map(move |challenge| (track.name.clone(), challenge.clone()))
        })
        .collect())
}

/// Turns pairs into test cases, applying the override for each pair.
/// 将配对转换为测试用例，并对每个配对应用覆盖。
pub fn resolve_cases(
    pairs: &[(String, String)],
    base: &RaceParams,
    overrides: &OverrideTable,
) -> Vec<TestCase> {
    pairs
        .iter()
        .map(|(track, challenge)| {
            TestCase::new(track, challenge, overrides.resolve(base, track, challenge))
        })
        .collect()
}

/// Represents the final list of cases for this runner.
/// 表示此运行器的最终用例列表。
#[derive(Debug)]
pub struct ExecutionPlan {
    pub cases_to_run: Vec<TestCase>,
    /// Cases assigned to other runners / 分配给其他运行器的用例
    pub assigned_elsewhere: usize,
    /// Whether the cases are distributed across multiple runners (CI environment).
    /// 用例是否分布在多个运行器上（CI 环境）。
    pub is_distributed: bool,
}

/// Creates an execution plan, optionally keeping every `total`-th case
/// starting at `index` so that parallel CI jobs share the matrix.
///
/// 创建执行计划，可选地从 `index` 开始每隔 `total` 个保留一个用例，以便并行 CI 作业共享矩阵。
pub fn plan_execution(
    cases: Vec<TestCase>,
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan, MatrixError> {
    match (total_runners, runner_index) {
        (Some(total), Some(index)) => {
            if index >= total {
                return Err(MatrixError::RunnerIndexOutOfRange { index, total });
            }
            let all = cases.len();
            let cases_to_run: Vec<_> = cases
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % total == index)
                .map(|(_, case)| case)
                .collect();
            Ok(ExecutionPlan {
                assigned_elsewhere: all - cases_to_run.len(),
                cases_to_run,
                is_distributed: true,
            })
        }
        (None, None) => Ok(ExecutionPlan {
            cases_to_run: cases,
            assigned_elsewhere: 0,
            is_distributed: false,
        }),
        _ => Err(MatrixError::IncompleteSharding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Track> {
        vec![
            Track::new("geonames", ["append-no-conflicts", "append-sorted"]),
            Track::new("http_logs", ["runtime-fields", "append-no-conflicts"]),
            Track::new("sql", ["sql"]),
        ]
    }

    fn pair(track: &str, challenge: &str) -> (String, String) {
        (track.to_string(), challenge.to_string())
    }

    #[test]
    fn test_empty_request_selects_everything_in_order() {
        let catalog = catalog();
        let matrix = build_matrix(&[], &catalog, UnknownTrackPolicy::Fail).unwrap();

        let expected: usize = catalog.iter().map(|t| t.challenges.len()).sum();
        assert_eq!(matrix.len(), expected);
        assert_eq!(
            matrix,
            vec![
                pair("geonames", "append-no-conflicts"),
                pair("geonames", "append-sorted"),
                pair("http_logs", "runtime-fields"),
                pair("http_logs", "append-no-conflicts"),
                pair("sql", "sql"),
            ]
        );
        let unique: BTreeSet<_> = matrix.iter().collect();
        assert_eq!(unique.len(), matrix.len());
    }

    #[test]
    fn test_subset_follows_catalog_order_not_request_order() {
        let requested = vec!["sql".to_string(), "geonames".to_string()];
        let catalog = catalog();
        let matrix = build_matrix(&requested, &catalog, UnknownTrackPolicy::Fail).unwrap();

        assert_eq!(
            matrix,
            vec![
                pair("geonames", "append-no-conflicts"),
                pair("geonames", "append-sorted"),
                pair("sql", "sql"),
            ]
        );
        for (track, challenge) in &matrix {
            assert!(requested.contains(track));
            let entry = catalog.iter().find(|t| &t.name == track).unwrap();
            assert!(entry.has_challenge(challenge));
        }
    }

    #[test]
    fn test_unknown_track_fails_by_default() {
        let requested = vec!["http_logs".to_string(), "nyc_taxis".to_string(), "so".to_string()];
        let err = build_matrix(&requested, &catalog(), UnknownTrackPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            MatrixError::UnknownTrack {
                tracks: vec!["nyc_taxis".to_string(), "so".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_track_ignored_when_configured() {
        let requested = vec!["nyc_taxis".to_string(), "sql".to_string()];
        let matrix = build_matrix(&requested, &catalog(), UnknownTrackPolicy::Ignore).unwrap();
        assert_eq!(matrix, vec![pair("sql", "sql")]);
    }

    #[test]
    fn test_http_logs_example_with_override() {
        let catalog = vec![Track::new("http_logs", ["runtime-fields", "append-no-conflicts"])];
        let requested = vec!["http_logs".to_string()];
        let matrix = build_matrix(&requested, &catalog, UnknownTrackPolicy::Fail).unwrap();
        assert_eq!(
            matrix,
            vec![pair("http_logs", "runtime-fields"), pair("http_logs", "append-no-conflicts")]
        );

        let base = RaceParams {
            enable_assertions: Some(true),
            test_mode: Some(true),
            ..RaceParams::default()
        };
        let cases = resolve_cases(&matrix, &base, &OverrideTable::compatibility_defaults());
        assert_eq!(cases[0].name, "http_logs/runtime-fields");
        assert_eq!(cases[0].params.enable_assertions, Some(false));
        assert_eq!(cases[0].params.test_mode, Some(true));
    }

    #[test]
    fn test_cases_without_override_keep_base() {
        let base = RaceParams {
            target_hosts: Some("127.0.0.1:19200".to_string()),
            ..RaceParams::default()
        };
        let cases = resolve_cases(
            &[pair("geonames", "append-sorted")],
            &base,
            &OverrideTable::compatibility_defaults(),
        );
        assert_eq!(cases[0].params, base);
    }

    fn names(n: usize) -> Vec<TestCase> {
        (0..n)
            .map(|i| TestCase::new("track", &format!("c{i}"), RaceParams::default()))
            .collect()
    }

    #[test]
    fn test_sharding_is_disjoint_and_covering() {
        let mut seen = Vec::new();
        for index in 0..3 {
            let plan = plan_execution(names(7), Some(3), Some(index)).unwrap();
            assert!(plan.is_distributed);
            assert_eq!(plan.cases_to_run.len() + plan.assigned_elsewhere, 7);
            seen.extend(plan.cases_to_run.into_iter().map(|c| c.challenge));
        }
        seen.sort();
        let mut all: Vec<_> = names(7).into_iter().map(|c| c.challenge).collect();
        all.sort();
        assert_eq!(seen, all);
    }

    #[test]
    fn test_sharding_validates_arguments() {
        assert_eq!(
            plan_execution(names(2), Some(2), Some(2)).unwrap_err(),
            MatrixError::RunnerIndexOutOfRange { index: 2, total: 2 }
        );
        assert_eq!(
            plan_execution(names(2), Some(2), None).unwrap_err(),
            MatrixError::IncompleteSharding
        );
        let plan = plan_execution(names(2), None, None).unwrap();
        assert!(!plan.is_distributed);
        assert_eq!(plan.cases_to_run.len(), 2);
    }
}
