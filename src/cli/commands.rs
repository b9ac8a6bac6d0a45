//! # Commands Module / 命令模块
//!
//! One module per `race-matrix` subcommand.
//!
//! 每个 `race-matrix` 子命令对应一个模块。

pub mod init;
pub mod list;
pub mod run;
pub mod templates;
