//! # Reporting Module / 报告模块
//!
//! Reporting plug-ins shipped with Prova: a colored, localized console reporter
//! and an HTML summary reporter.
//!
//! 随 Prova 提供的报告插件：彩色、本地化的控制台报告器与 HTML 摘要报告器。

pub mod console;
pub mod html;

pub use console::ConsoleReporter;
pub use html::HtmlReporter;

use crate::core::status::TestStatus;
use crate::infra::t;

/// Localized label of a status. / 状态的本地化名称。
pub fn status_label(status: TestStatus, locale: &str) -> String {
    match status {
        TestStatus::NotRun => t!("status.not_run", locale = locale),
        TestStatus::Blocked => t!("status.blocked", locale = locale),
        TestStatus::Passed => t!("status.passed", locale = locale),
        TestStatus::Failed => t!("status.failed", locale = locale),
    }
    .to_string()
}

/// CSS class used for a status in the HTML report.
pub fn status_class(status: TestStatus) -> &'static str {
    match status {
        TestStatus::NotRun => "not-run",
        TestStatus::Blocked => "blocked",
        TestStatus::Passed => "passed",
        TestStatus::Failed => "failed",
    }
}
