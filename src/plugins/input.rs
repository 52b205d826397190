//! # Input Plug-ins / 输入插件

pub mod toml_dir;

pub use toml_dir::TomlDirInput;
