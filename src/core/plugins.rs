//! # Plug-in Interfaces Module / 插件接口模块
//!
//! Prova's content, execution and reporting are supplied by plug-ins:
//!
//! - [`InputPlugin`] materialises the suite tree and lazily loads test cases.
//! - [`OutputPlugin`] turns textual action references into executable actions
//!   for one or more [`TestType`]s and manages per-case resources.
//! - [`ReportingPlugin`] observes every lifecycle event.
//!
//! Plug-ins are application code, so their fallible calls return `anyhow::Result`;
//! the engine wraps those failures into [`ProvaError::Plugin`](crate::core::error::ProvaError).
//!
//! Prova 的内容、执行和报告均由插件提供：输入插件构建套件树，输出插件创建可执行动作，
//! 报告插件观察所有生命周期事件。

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::action::{ActionHandle, TestAction};
use crate::core::case::TestCase;
use crate::core::error::{require_trimmed, Result};
use crate::core::properties::PropertyStore;
use crate::core::suite::{SuiteId, SuiteTree};

/// Technology an action runs against, e.g. `shell` or `web`. Stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestType(String);

impl TestType {
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self(require_trimmed(name, "Test type")?.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a free-form reporting message belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Suite,
    Case,
    Action,
}

/// Resolves textual action references into executable actions.
/// Handed to input plug-ins while they load a test case.
pub trait ActionResolver {
    fn supports(&self, test_type: &TestType) -> bool;

    /// Creates action `id` named `name` for `test_type`.
    fn resolve(&mut self, test_type: &TestType, name: &str, id: i64) -> anyhow::Result<ActionHandle>;
}

/// Discovers test suites and test cases. / 发现测试套件和测试用例。
pub trait InputPlugin: Send {
    fn name(&self) -> &str;

    fn init(&mut self, properties: &PropertyStore) -> anyhow::Result<()>;

    /// Points the plug-in at its test root; returns the resolved location.
    fn set_test_root(&mut self, path: &Path, project: &str) -> anyhow::Result<PathBuf>;

    /// Restricts loading to cases carrying one of `labels`; returns a description
    /// of the active filter. An empty slice removes the filter.
    fn set_test_case_filter(&mut self, labels: &[String]) -> String;

    /// Adds the suites and (not yet loaded) test cases below `root`.
    fn set_up(&mut self, tree: &mut SuiteTree, root: SuiteId) -> anyhow::Result<()>;

    /// Fills the action lists of a case this plug-in created.
    fn load_test_case(
        &mut self,
        case: &mut TestCase,
        resolver: &mut dyn ActionResolver,
    ) -> anyhow::Result<()>;

    /// Case run once before the suite tree, if the project has one.
    fn project_set_up(&mut self) -> anyhow::Result<Option<TestCase>> {
        Ok(None)
    }

    /// Case run once after the suite tree, if the project has one.
    fn project_tear_down(&mut self) -> anyhow::Result<Option<TestCase>> {
        Ok(None)
    }

    fn shut_down(&mut self) -> anyhow::Result<()>;
}

/// Supplies executable actions for one technology. / 为某种技术提供可执行动作。
pub trait OutputPlugin: Send {
    fn name(&self) -> &str;

    fn init(&mut self, properties: &PropertyStore) -> anyhow::Result<()>;

    fn supported_types(&self) -> Vec<TestType>;

    /// Acquires per-case resources before the first action of `case` runs.
    fn set_up(&mut self, case: &TestCase) -> anyhow::Result<()>;

    /// Releases what [`OutputPlugin::set_up`] acquired.
    fn tear_down(&mut self, case: &TestCase) -> anyhow::Result<()>;

    /// Factory for the action named `name`.
    fn resolve_action(&mut self, name: &str, id: i64) -> anyhow::Result<ActionHandle>;

    fn shut_down(&mut self) -> anyhow::Result<()>;
}

/// Observes the run. / 观察运行过程。
///
/// Event hooks are fire-and-forget: they cannot fail, and implementations deal
/// with their own I/O errors.
pub trait ReportingPlugin: Send {
    fn name(&self) -> &str;

    fn init(&mut self, properties: &PropertyStore) -> anyhow::Result<()>;

    fn set_output_location(&mut self, path: &Path) -> anyhow::Result<()>;

    fn set_project_name(&mut self, name: &str);

    fn set_up(&mut self) -> anyhow::Result<()>;

    fn shut_down(&mut self) -> anyhow::Result<()>;

    fn log_start_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId);

    fn log_end_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId);

    fn log_start_test_case(&mut self, case: &TestCase);

    fn log_end_test_case(&mut self, case: &TestCase);

    fn log_set_up_action(&mut self, action: &dyn TestAction);

    fn log_test_action(&mut self, action: &dyn TestAction);

    fn log_tear_down_action(&mut self, action: &dyn TestAction);

    fn log_test_run_summary(&mut self, tree: &SuiteTree, root: SuiteId);

    fn log_message(&mut self, message: &str, target: LogTarget);
}

/// Ordered plug-in collections; registration order is dispatch order.
#[derive(Default)]
pub struct PluginRegistry {
    inputs: Vec<Box<dyn InputPlugin>>,
    outputs: Vec<Box<dyn OutputPlugin>>,
    reporters: Vec<Box<dyn ReportingPlugin>>,
    by_type: BTreeMap<TestType, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, plugin: Box<dyn InputPlugin>) {
        debug!("Register input plug-in '{}'", plugin.name());
        self.inputs.push(plugin);
    }

    /// Registers an output plug-in under each type it supports. The first plug-in
    /// registered for a type keeps it.
    pub fn add_output(&mut self, plugin: Box<dyn OutputPlugin>) {
        let index = self.outputs.len();
        for test_type in plugin.supported_types() {
            match self.by_type.get(&test_type) {
                Some(&owner) => warn!(
                    "Test type '{}' is already served by '{}', ignoring '{}'",
                    test_type,
                    self.outputs[owner].name(),
                    plugin.name()
                ),
                None => {
                    debug!("Register output plug-in '{}' for '{}'", plugin.name(), test_type);
                    self.by_type.insert(test_type, index);
                }
            }
        }
        self.outputs.push(plugin);
    }

    pub fn add_reporter(&mut self, plugin: Box<dyn ReportingPlugin>) {
        debug!("Register reporting plug-in '{}'", plugin.name());
        self.reporters.push(plugin);
    }

    pub fn inputs(&self) -> &[Box<dyn InputPlugin>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Box<dyn OutputPlugin>] {
        &self.outputs
    }

    pub fn reporters(&self) -> &[Box<dyn ReportingPlugin>] {
        &self.reporters
    }

    pub fn inputs_mut(&mut self) -> &mut [Box<dyn InputPlugin>] {
        &mut self.inputs
    }

    pub fn outputs_mut(&mut self) -> &mut [Box<dyn OutputPlugin>] {
        &mut self.outputs
    }

    pub fn reporters_mut(&mut self) -> &mut [Box<dyn ReportingPlugin>] {
        &mut self.reporters
    }

    /// Index of the output plug-in serving `test_type`.
    pub fn output_for(&self, test_type: &TestType) -> Option<usize> {
        self.by_type.get(test_type).copied()
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name() == name)
    }

    /// Borrows the input plug-ins, an action resolver over the output plug-ins and
    /// the reporters at the same time.
    pub fn split(
        &mut self,
    ) -> (
        &mut [Box<dyn InputPlugin>],
        OutputResolver<'_>,
        &mut [Box<dyn ReportingPlugin>],
    ) {
        let Self {
            inputs,
            outputs,
            reporters,
            by_type,
        } = self;
        (
            inputs,
            OutputResolver {
                outputs,
                by_type,
            },
            reporters,
        )
    }

    /// Calls `f` on every reporter in registration order.
    pub fn report(&mut self, mut f: impl FnMut(&mut dyn ReportingPlugin)) {
        for reporter in &mut self.reporters {
            f(reporter.as_mut());
        }
    }
}

/// [`ActionResolver`] dispatching to the output plug-in registered for a type.
pub struct OutputResolver<'a> {
    outputs: &'a mut [Box<dyn OutputPlugin>],
    by_type: &'a BTreeMap<TestType, usize>,
}

impl ActionResolver for OutputResolver<'_> {
    fn supports(&self, test_type: &TestType) -> bool {
        self.by_type.contains_key(test_type)
    }

    fn resolve(&mut self, test_type: &TestType, name: &str, id: i64) -> anyhow::Result<ActionHandle> {
        let index = *self
            .by_type
            .get(test_type)
            .ok_or_else(|| anyhow::anyhow!("No output plug-in supports test type '{test_type}'"))?;
        let plugin = &mut self.outputs[index];
        let action = plugin.resolve_action(name, id)?;
        action.lock().state_mut().set_test_type(test_type.clone());
        Ok(action)
    }
}
