//! # Prova Library / Prova 库
//!
//! Prova is a pluggable test automation engine. Test suites hold test cases,
//! test cases hold ordered lists of actions, and plug-ins supply the suites
//! (input), execute the actions against a technology (output) and record the
//! outcome (reporting).
//!
//! Prova 是一个可插拔的测试自动化引擎。测试套件包含测试用例，测试用例包含有序的
//! 动作列表；插件负责提供套件（输入）、针对某种技术执行动作（输出）并记录结果（报告）。
//!
//! ## Modules / 模块
//!
//! - `core` - Test model, property store, plug-in interfaces and execution engine
//! - `infra` - Infrastructure services like command execution, configuration files and logging
//! - `plugins` - Reference input and output plug-ins
//! - `reporting` - Console and HTML reporting plug-ins
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 测试模型、属性存储、插件接口和执行引擎
//! - `infra` - 基础设施服务，如命令执行、配置文件和日志
//! - `plugins` - 参考输入与输出插件
//! - `reporting` - 控制台与 HTML 报告插件
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod plugins;
pub mod reporting;

// Re-export commonly used items
pub use core::execution;
pub use core::{ProvaError, Result, TestStatus};

/// Picks the best available locale for the system language: the full locale
/// (e.g. "zh-CN"), then the language code (e.g. "en"), finally "en".
pub fn detect_locale() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&locale.as_str()) {
        return locale;
    }
    locale
        .split('-')
        .next()
        .filter(|lang_code| available_locales.contains(lang_code))
        .unwrap_or("en")
        .to_string()
}

/// Initializes the application's internationalization (i18n) based on the system locale.
pub fn init() {
    rust_i18n::set_locale(&detect_locale());
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
