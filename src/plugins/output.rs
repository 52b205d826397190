//! # Output Plug-ins / 输出插件

pub mod shell;

pub use shell::ShellOutput;
