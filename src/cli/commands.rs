//! # CLI Commands / CLI 命令
//!
//! - `run` - executes a Prova project / 执行 Prova 项目
//! - `init` - scaffolds a new project / 生成新项目骨架

pub mod init;
pub mod run;
