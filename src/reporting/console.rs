//! # Console Reporting Module / 控制台报告模块
//!
//! A reporting plug-in that prints the progress of a run and a final summary
//! table, colored and localized.
//!
//! 在控制台打印运行进度与最终摘要表格的报告插件，支持颜色与国际化。
//!
//! # Output Format / 输出格式
//! ```text
//! ▶ demo/login
//!   ● login_ok
//!     [setup]    Passed   SET GREETING = 'hello'
//!     [test]     Failed   EXECUTE 'false'
//!   ■ login_ok: Failed (2 actions: 1 passed, 1 failed, 0 blocked, 0 not run)
//!
//! --- Test Summary ---
//!   - Status     | Test Case                                | Reason
//!   - Failed     | demo/login/login_ok                      | 2 actions: ...
//! ```

use anyhow::Result;
use colored::*;
use std::io::{self, Write};
use std::path::Path;

use crate::core::action::TestAction;
use crate::core::case::{ActionPhase, TestCase};
use crate::core::execution::StatusCounts;
use crate::core::plugins::{LogTarget, ReportingPlugin};
use crate::core::properties::{keys, PropertyStore};
use crate::core::status::TestStatus;
use crate::core::suite::{SuiteId, SuiteTree};
use crate::infra::t;
use crate::reporting::status_label;

/// Prints to stdout unless another writer is given.
pub struct ConsoleReporter {
    locale: String,
    project: String,
    out: Box<dyn Write + Send>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub const NAME: &'static str = "console";

    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            locale: "en".to_string(),
            project: String::new(),
            out,
        }
    }

    fn colored_status(&self, status: TestStatus, width: usize) -> ColoredString {
        let label = format!("{:<width$}", status_label(status, &self.locale));
        match status {
            TestStatus::Passed => label.green(),
            TestStatus::Failed => label.red(),
            TestStatus::Blocked => label.yellow(),
            TestStatus::NotRun => label.dimmed(),
        }
    }

    // Console output is best effort; a closed stdout must not abort the run.
    fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
    }

    fn log_action(&mut self, phase: ActionPhase, action: &dyn TestAction) {
        let status = self.colored_status(action.status(), 8);
        let duration = action
            .state()
            .execution_time()
            .map(|d| format!("{:.2?}", d))
            .unwrap_or_default();
        let tag = format!("[{}]", phase);
        self.line(format!(
            "    {:<10} {} {} {}",
            tag,
            status,
            action.describe(),
            duration.dimmed()
        ));
        if let Some(error) = action.state().last_error() {
            self.line(format!("      {}", format!("{error:#}").red()));
        }
    }

    fn print_summary(&mut self, tree: &SuiteTree, root: SuiteId) {
        self.line(format!(
            "\n{}",
            t!("test_summary_banner", locale = &self.locale).bold()
        ));
        self.line(format!(
            "  - {:<10} | {:<40} | {}",
            t!("summary_header.status", locale = &self.locale),
            t!("summary_header.case", locale = &self.locale),
            t!("summary_header.reason", locale = &self.locale)
        ));

        for suite in tree.descendants(root) {
            let path = tree.path(suite);
            for case in tree[suite].test_cases() {
                let name = format!("{}/{}", path, case.id());
                self.line(format!(
                    "  - {} | {:<40} | {}",
                    self.colored_status(case.status(), 10),
                    name,
                    case.status_reason().unwrap_or_default()
                ));
            }
        }

        let counts = StatusCounts::tally(tree, root);
        let status = tree[root].status();
        let totals = t!(
            "summary_totals",
            locale = &self.locale,
            total = counts.total(),
            passed = counts.passed,
            failed = counts.failed,
            blocked = counts.blocked,
            not_run = counts.not_run
        );
        self.line(format!("\n  {}", totals));
        let verdict = t!(
            "summary_verdict",
            locale = &self.locale,
            project = &self.project,
            status = status_label(status, &self.locale)
        );
        let verdict = match status {
            TestStatus::Passed => verdict.green().bold(),
            TestStatus::Failed => verdict.red().bold(),
            _ => verdict.yellow().bold(),
        };
        self.line(format!("  {}", verdict));
    }
}

impl ReportingPlugin for ConsoleReporter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, properties: &PropertyStore) -> Result<()> {
        self.locale = properties.get_or(keys::LANGUAGE, "en").to_string();
        Ok(())
    }

    fn set_output_location(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn set_project_name(&mut self, name: &str) {
        self.project = name.to_string();
    }

    fn set_up(&mut self) -> Result<()> {
        let banner = t!("run_banner", locale = &self.locale, project = &self.project);
        self.line(banner.bold().to_string());
        Ok(())
    }

    fn shut_down(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn log_start_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId) {
        self.line(format!("▶ {}", tree.path(suite).cyan()));
    }

    fn log_end_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId) {
        let status = self.colored_status(tree[suite].status(), 0);
        self.line(format!("◀ {} {}", tree.path(suite).cyan(), status));
    }

    fn log_start_test_case(&mut self, case: &TestCase) {
        self.line(format!("  ● {}", case.id().bold()));
    }

    fn log_end_test_case(&mut self, case: &TestCase) {
        let status = self.colored_status(case.status(), 0);
        let reason = case
            .status_reason()
            .map(|r| format!(" ({r})"))
            .unwrap_or_default();
        self.line(format!("  ■ {}: {}{}", case.id(), status, reason));
    }

    fn log_set_up_action(&mut self, action: &dyn TestAction) {
        self.log_action(ActionPhase::SetUp, action);
    }

    fn log_test_action(&mut self, action: &dyn TestAction) {
        self.log_action(ActionPhase::Test, action);
    }

    fn log_tear_down_action(&mut self, action: &dyn TestAction) {
        self.log_action(ActionPhase::TearDown, action);
    }

    fn log_test_run_summary(&mut self, tree: &SuiteTree, root: SuiteId) {
        self.print_summary(tree, root);
    }

    fn log_message(&mut self, message: &str, target: LogTarget) {
        let indent = match target {
            LogTarget::Suite => "",
            LogTarget::Case => "  ",
            LogTarget::Action => "    ",
        };
        self.line(format!("{}{} {}", indent, "!".yellow(), message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_summary_lists_every_case() {
        colored::control::set_override(false);
        let buffer = Buffer::default();
        let mut reporter = ConsoleReporter::with_writer(Box::new(buffer.clone()));
        reporter.set_project_name("demo");

        let mut tree = SuiteTree::new();
        let root = tree.create_suite("demo").unwrap();
        let child = tree.create_suite("login").unwrap();
        tree.add_test_suite(root, child).unwrap();
        let mut case = TestCase::new("tc1").unwrap();
        case.update_status(TestStatus::Failed, "1 actions: 0 passed, 1 failed");
        tree.add_test_case(child, case).unwrap();
        tree.suite_mut(child).unwrap().set_status(TestStatus::Failed);
        tree.suite_mut(root).unwrap().set_status(TestStatus::Failed);

        reporter.log_test_run_summary(&tree, root);
        let text = buffer.text();
        assert!(text.contains("demo/login/tc1"));
        assert!(text.contains("1 actions: 0 passed, 1 failed"));
        assert!(text.contains("Failed"));
    }

    #[test]
    fn test_case_lines() {
        colored::control::set_override(false);
        let buffer = Buffer::default();
        let mut reporter = ConsoleReporter::with_writer(Box::new(buffer.clone()));
        let mut case = TestCase::new("tc2").unwrap();
        reporter.log_start_test_case(&case);
        case.update_status(TestStatus::Passed, "No actions");
        reporter.log_end_test_case(&case);
        reporter.log_message("careful", LogTarget::Case);

        let text = buffer.text();
        assert!(text.contains("● tc2"));
        assert!(text.contains("■ tc2: Passed (No actions)"));
        assert!(text.contains("! careful"));
    }
}
