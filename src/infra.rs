//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for race-matrix:
//! process execution, file system helpers, git and the Elasticsearch client.
//!
//! 此模块为 race-matrix 提供基础设施服务：
//! 进程执行、文件系统工具、git 以及 Elasticsearch 客户端。

pub mod command;
pub mod es;
pub mod fs;
pub mod git;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
