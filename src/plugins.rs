//! # Reference Plug-ins Module / 参考插件模块
//!
//! Plug-ins shipped with Prova:
//!
//! - `input::toml_dir` - test cases described by TOML files in a directory tree
//! - `output::shell` - shell command actions
//!
//! Reporting plug-ins live in [`crate::reporting`].
//!
//! Prova 自带的插件：基于目录树中 TOML 文件的输入插件，以及执行 shell 命令的输出插件。

pub mod input;
pub mod output;
