//! # HTML Reporting Module / HTML 报告模块
//!
//! A reporting plug-in that collects case and action outcomes during the run
//! and writes a single styled HTML file when the run summary is logged:
//! `<output location>/<prova.plugins.reporting.file>`.
//!
//! 在运行期间收集用例与动作结果，并在记录运行摘要时写出单个 HTML 文件。

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

use crate::core::action::TestAction;
use crate::core::case::{ActionPhase, TestCase};
use crate::core::execution::StatusCounts;
use crate::core::plugins::{LogTarget, ReportingPlugin};
use crate::core::properties::{keys, PropertyStore};
use crate::core::status::TestStatus;
use crate::core::suite::{SuiteId, SuiteTree};
use crate::infra::t;
use crate::reporting::{status_class, status_label};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

const DEFAULT_FILE: &str = "prova-report.html";

#[derive(Debug, Clone)]
struct ActionRecord {
    phase: ActionPhase,
    description: String,
    status: TestStatus,
    duration: Option<Duration>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct CaseRecord {
    suite: String,
    id: String,
    status: TestStatus,
    reason: String,
    actions: Vec<ActionRecord>,
}

/// Writes one HTML file per run. / 每次运行写出一个 HTML 文件。
#[derive(Debug)]
pub struct HtmlReporter {
    locale: String,
    project: String,
    file_name: String,
    output_dir: Option<PathBuf>,
    suites: Vec<String>,
    current: Option<CaseRecord>,
    cases: Vec<CaseRecord>,
    messages: Vec<String>,
    written: Option<PathBuf>,
}

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlReporter {
    pub const NAME: &'static str = "html";

    pub fn new() -> Self {
        Self {
            locale: "en".to_string(),
            project: String::new(),
            file_name: DEFAULT_FILE.to_string(),
            output_dir: None,
            suites: Vec::new(),
            current: None,
            cases: Vec::new(),
            messages: Vec::new(),
            written: None,
        }
    }

    /// Path of the report written by the last summary, if any.
    pub fn report_path(&self) -> Option<&Path> {
        self.written.as_deref()
    }

    fn record_action(&mut self, phase: ActionPhase, action: &dyn TestAction) {
        let record = ActionRecord {
            phase,
            description: action.describe(),
            status: action.status(),
            duration: action.state().execution_time().ok(),
            error: action.state().last_error().map(|e| format!("{e:#}")),
        };
        match self.current.as_mut() {
            Some(case) => case.actions.push(record),
            None => debug!("Action reported outside of a test case: {}", record.description),
        }
    }

    fn write_report(&mut self, tree: &SuiteTree, root: SuiteId) -> Result<PathBuf> {
        let dir = self
            .output_dir
            .clone()
            .context("The report location has not been set")?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        let markup = self.render(tree, root);
        fs::write(&path, markup.into_string())
            .with_context(|| format!("Failed to write HTML report '{}'", path.display()))?;
        Ok(path)
    }

    fn render(&self, tree: &SuiteTree, root: SuiteId) -> Markup {
        let locale = self.locale.as_str();
        let counts = StatusCounts::tally(tree, root);
        let status = tree[root].status();
        let tiles = [
            (t!("html_report.summary.total", locale = locale).to_string(), counts.total(), ""),
            (status_label(TestStatus::Passed, locale), counts.passed, "passed-text"),
            (status_label(TestStatus::Failed, locale), counts.failed, "failed-text"),
            (status_label(TestStatus::Blocked, locale), counts.blocked, "blocked-text"),
            (status_label(TestStatus::NotRun, locale), counts.not_run, "not-run-text"),
        ];

        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (t!("html_report.title", locale = locale, project = &self.project).to_string()) }
                    style { (PreEscaped(HTML_STYLE)) }
                }
                body {
                    h1 { (t!("html_report.main_header", locale = locale, project = &self.project).to_string()) }
                    p.subtitle {
                        (t!("html_report.overall", locale = locale).to_string()) " "
                        span class={ "status-cell " (status_class(status)) } { (status_label(status, locale)) }
                    }
                    div.summary-container {
                        @for (label, count, class) in &tiles {
                            div.summary-item {
                                span class={ "count " (class) } { (count) }
                                span.label { (label) }
                            }
                        }
                    }
                    table {
                        thead {
                            tr {
                                th { (t!("html_report.table.header.suite", locale = locale).to_string()) }
                                th { (t!("html_report.table.header.case", locale = locale).to_string()) }
                                th { (t!("html_report.table.header.status", locale = locale).to_string()) }
                                th { (t!("html_report.table.header.reason", locale = locale).to_string()) }
                            }
                        }
                        tbody {
                            @for case in &self.cases {
                                tr {
                                    td { (case.suite) }
                                    td { (case.id) }
                                    td {
                                        div class={ "status-cell " (status_class(case.status)) } {
                                            (status_label(case.status, locale))
                                        }
                                    }
                                    td { (case.reason) }
                                }
                                @if !case.actions.is_empty() {
                                    tr.actions {
                                        td colspan="4" {
                                            ul {
                                                @for action in &case.actions {
                                                    li class=(status_class(action.status)) {
                                                        span.phase { (action.phase.to_string()) }
                                                        (action.description)
                                                        @if let Some(duration) = action.duration {
                                                            span.duration { (format!("{:.2?}", duration)) }
                                                        }
                                                        @if let Some(error) = &action.error {
                                                            pre.error { (error) }
                                                        }
                                                    }
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    @if !self.messages.is_empty() {
                        div.messages {
                            h2 { (t!("html_report.messages", locale = locale).to_string()) }
                            ul {
                                @for message in &self.messages {
                                    li { (message) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

impl ReportingPlugin for HtmlReporter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, properties: &PropertyStore) -> Result<()> {
        self.locale = properties.get_or(keys::LANGUAGE, "en").to_string();
        self.file_name = properties
            .get_or(keys::REPORTING_FILE, DEFAULT_FILE)
            .trim()
            .to_string();
        if self.file_name.is_empty() {
            self.file_name = DEFAULT_FILE.to_string();
        }
        Ok(())
    }

    fn set_output_location(&mut self, path: &Path) -> Result<()> {
        if path.exists() && !path.is_dir() {
            anyhow::bail!("Report location '{}' is not a directory", path.display());
        }
        self.output_dir = Some(path.to_path_buf());
        Ok(())
    }

    fn set_project_name(&mut self, name: &str) {
        self.project = name.to_string();
    }

    fn set_up(&mut self) -> Result<()> {
        self.cases.clear();
        self.messages.clear();
        self.written = None;
        Ok(())
    }

    fn shut_down(&mut self) -> Result<()> {
        if let Some(case) = self.current.take() {
            debug!("Test case '{}' never ended", case.id);
        }
        Ok(())
    }

    fn log_start_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId) {
        self.suites.push(tree.path(suite));
    }

    fn log_end_test_suite(&mut self, _tree: &SuiteTree, _suite: SuiteId) {
        self.suites.pop();
    }

    fn log_start_test_case(&mut self, case: &TestCase) {
        self.current = Some(CaseRecord {
            suite: self.suites.last().cloned().unwrap_or_else(|| self.project.clone()),
            id: case.id().to_string(),
            status: case.status(),
            reason: String::new(),
            actions: Vec::new(),
        });
    }

    fn log_end_test_case(&mut self, case: &TestCase) {
        let mut record = self.current.take().unwrap_or_else(|| CaseRecord {
            suite: self.suites.last().cloned().unwrap_or_default(),
            id: case.id().to_string(),
            status: case.status(),
            reason: String::new(),
            actions: Vec::new(),
        });
        record.status = case.status();
        record.reason = case.status_reason().unwrap_or_default().to_string();
        self.cases.push(record);
    }

    fn log_set_up_action(&mut self, action: &dyn TestAction) {
        self.record_action(ActionPhase::SetUp, action);
    }

    fn log_test_action(&mut self, action: &dyn TestAction) {
        self.record_action(ActionPhase::Test, action);
    }

    fn log_tear_down_action(&mut self, action: &dyn TestAction) {
        self.record_action(ActionPhase::TearDown, action);
    }

    fn log_test_run_summary(&mut self, tree: &SuiteTree, root: SuiteId) {
        match self.write_report(tree, root) {
            Ok(path) => {
                debug!("HTML report written to '{}'", path.display());
                self.written = Some(path);
            }
            Err(e) => error!("{:#}", e),
        }
    }

    fn log_message(&mut self, message: &str, _target: LogTarget) {
        self.messages.push(message.to_string());
    }
}
