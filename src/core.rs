//! # Core Module / 核心模块
//!
//! This module contains the core functionality of race-matrix: the track
//! catalog, the test matrix, the cluster and stack lifecycles, race
//! invocation, case execution and the template updater.
//!
//! 此模块包含 race-matrix 的核心功能：track 目录、测试矩阵、集群和 stack 生命周期、
//! 比赛调用、用例执行以及模板更新器。

pub mod catalog;
pub mod cluster;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod params;
pub mod planner;
pub mod race;
pub mod rally;
pub mod rally_config;
pub mod stack;
pub mod templates;

// Re-exports
pub use config::RaceMatrixConfig;
pub use execution::{run_cases, run_test_case};
pub use models::TestResult;
