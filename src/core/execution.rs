//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! [`Prova`] owns the property store, the plug-in registry and the suite tree of
//! one run, and drives it through a strict lifecycle:
//!
//! `init` → `set_up` → `execute` → `tear_down` → `shut_down`
//!
//! The tree is walked depth-first on a single task. Actions are synchronous and
//! run one at a time on the blocking pool, in setup → test → teardown order per
//! test case. Outcomes flow back up: an action status feeds its case, a case
//! feeds its suite, a suite feeds its parent.
//!
//! [`Prova`] 持有一次运行的属性存储、插件注册表和套件树，并按严格的生命周期驱动运行。
//! 套件树在单个任务上深度优先遍历，动作按 准备 → 测试 → 清理 的顺序逐个执行，
//! 结果自下而上汇总。

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::core::action::{run_action, ActionHandle, TestAction};
use crate::core::case::{ActionPhase, TestCase};
use crate::core::error::{ProvaError, Result};
use crate::core::plugins::{
    ActionResolver, InputPlugin, LogTarget, OutputPlugin, PluginRegistry, ReportingPlugin, TestType,
};
use crate::core::properties::{keys, PropertyStore};
use crate::core::status::TestStatus;
use crate::core::suite::{SuiteId, SuiteTree};

/// Lifecycle position of a [`Prova`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Initialized,
    SetUp,
    Executed,
    TornDown,
    ShutDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Created => "created",
            Phase::Initialized => "init",
            Phase::SetUp => "setUp",
            Phase::Executed => "execute",
            Phase::TornDown => "tearDown",
            Phase::ShutDown => "shutDown",
        })
    }
}

/// Settings every case execution needs.
#[derive(Clone)]
struct RunContext {
    cancel: CancellationToken,
    execute: bool,
}

/// The test runner. / 测试运行器。
pub struct Prova {
    properties: PropertyStore,
    plugins: PluginRegistry,
    tree: SuiteTree,
    root: Option<SuiteId>,
    project_cases: Vec<TestCase>,
    phase: Phase,
    cancel: CancellationToken,
    execute_actions: bool,
}

impl Prova {
    /// A runner seeded with system properties and the packaged defaults.
    pub fn new() -> Result<Self> {
        Ok(Self::with_properties(PropertyStore::load_defaults()?))
    }

    pub fn with_properties(properties: PropertyStore) -> Self {
        Self {
            properties,
            plugins: PluginRegistry::new(),
            tree: SuiteTree::new(),
            root: None,
            project_cases: Vec::new(),
            phase: Phase::Created,
            cancel: CancellationToken::new(),
            execute_actions: true,
        }
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyStore {
        &mut self.properties
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.properties.set(key, value)
    }

    pub fn get_property(&self, key: &str) -> Result<&str> {
        self.properties.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.has(key)
    }

    pub fn add_input_plugin(&mut self, plugin: Box<dyn InputPlugin>) -> Result<()> {
        self.ensure_registration_open()?;
        self.plugins.add_input(plugin);
        Ok(())
    }

    pub fn add_output_plugin(&mut self, plugin: Box<dyn OutputPlugin>) -> Result<()> {
        self.ensure_registration_open()?;
        self.plugins.add_output(plugin);
        Ok(())
    }

    pub fn add_reporting_plugin(&mut self, plugin: Box<dyn ReportingPlugin>) -> Result<()> {
        self.ensure_registration_open()?;
        self.plugins.add_reporter(plugin);
        Ok(())
    }

    fn ensure_registration_open(&self) -> Result<()> {
        if self.phase != Phase::Created {
            return Err(ProvaError::InvalidState {
                current: self.phase.to_string(),
                requested: "plug-in registration".to_string(),
            });
        }
        Ok(())
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tree(&self) -> &SuiteTree {
        &self.tree
    }

    /// Root suite, available once `set_up` created it.
    pub fn root(&self) -> Option<SuiteId> {
        self.root
    }

    /// Project level setup and teardown cases that ran so far.
    pub fn project_cases(&self) -> &[TestCase] {
        &self.project_cases
    }

    /// Token checked between suites, cases and actions; cancelling it stops the walk.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn advance(&mut self, allowed: &[Phase], next: Phase) -> Result<()> {
        if !allowed.contains(&self.phase) {
            return Err(ProvaError::InvalidState {
                current: self.phase.to_string(),
                requested: next.to_string(),
            });
        }
        debug!("Phase '{}' -> '{}'", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Validates the configuration and initialises every plug-in.
    ///
    /// # Errors
    /// `Config` when no input or output plug-in is registered or the test root is
    /// not configured; `Plugin` when a plug-in fails to initialise.
    pub fn init(&mut self) -> Result<()> {
        if self.phase != Phase::Created {
            return Err(ProvaError::InvalidState {
                current: self.phase.to_string(),
                requested: Phase::Initialized.to_string(),
            });
        }
        info!("Initialising Prova");

        if self.plugins.inputs().is_empty() {
            return Err(ProvaError::Config("No input plug-in registered".to_string()));
        }
        if self.plugins.outputs().is_empty() {
            return Err(ProvaError::Config("No output plug-in registered".to_string()));
        }
        let tests_root = self
            .properties
            .get(keys::TESTS_ROOT)
            .map(|root| self.properties.resolve(root))
            .unwrap_or_default();
        if tests_root.trim().is_empty() {
            return Err(ProvaError::Config(format!(
                "Property '{}' must point at the test root",
                keys::TESTS_ROOT
            )));
        }

        self.execute_actions = self.properties.get_bool(keys::TESTS_EXECUTE, true);
        let project = self.properties.get_or(keys::PROJECT, "prova").to_string();
        let filters = self.properties.get_list(keys::TESTS_FILTERS);
        let properties = &self.properties;

        for input in self.plugins.inputs_mut() {
            input
                .init(properties)
                .map_err(|e| ProvaError::plugin(input.name(), e))?;
            let resolved = input
                .set_test_root(&PathBuf::from(&tests_root), &project)
                .map_err(|e| ProvaError::plugin(input.name(), e))?;
            let filter = input.set_test_case_filter(&filters);
            debug!(
                "Input '{}' reads '{}' ({})",
                input.name(),
                resolved.display(),
                filter
            );
        }

        for output in self.plugins.outputs_mut() {
            output
                .init(properties)
                .map_err(|e| ProvaError::plugin(output.name(), e))?;
        }

        if self.plugins.reporters().is_empty() {
            warn!("No reporting plug-in registered, results will not be reported");
        }
        let report_dir = PathBuf::from(
            properties.resolve(properties.get_or(keys::REPORTING_DIR, "reports")),
        );
        for reporter in self.plugins.reporters_mut() {
            reporter
                .init(properties)
                .map_err(|e| ProvaError::plugin(reporter.name(), e))?;
            reporter.set_project_name(&project);
            reporter
                .set_output_location(&report_dir)
                .map_err(|e| ProvaError::plugin(reporter.name(), e))?;
            reporter
                .set_up()
                .map_err(|e| ProvaError::plugin(reporter.name(), e))?;
        }

        self.advance(&[Phase::Created], Phase::Initialized)
    }

    /// Builds the suite tree and runs project level setup cases.
    ///
    /// # Errors
    /// `Plugin` when an input plug-in fails, or when a project setup case does
    /// not pass.
    pub async fn set_up(&mut self) -> Result<()> {
        self.advance(&[Phase::Initialized], Phase::SetUp)?;
        let project = self.properties.get_or(keys::PROJECT, "prova").to_string();
        let root = self.tree.create_suite(&project)?;
        self.root = Some(root);
        info!("Building test suite '{}'", project);

        for index in 0..self.plugins.inputs().len() {
            let input = &mut self.plugins.inputs_mut()[index];
            let name = input.name().to_string();
            input
                .set_up(&mut self.tree, root)
                .map_err(|e| ProvaError::plugin(&name, e))?;

            for suite in self.tree.descendants(root) {
                for case in self.tree.suite_mut(suite)?.test_cases_mut() {
                    if case.source().is_none() {
                        case.set_source(&name);
                    }
                }
            }
        }
        debug!(
            "Suite tree ready: {} suites, {} test cases",
            self.tree.number_of_test_suites(root, true) + 1,
            self.tree.number_of_test_cases(root, true)
        );

        let ctx = self.context();
        for index in 0..self.plugins.inputs().len() {
            let input = &mut self.plugins.inputs_mut()[index];
            let name = input.name().to_string();
            let Some(mut case) = input
                .project_set_up()
                .map_err(|e| ProvaError::plugin(&name, e))?
            else {
                continue;
            };
            case.set_source(&name);
            info!("Running project setup '{}'", case.id());
            let status = run_case(&mut self.plugins, &mut case, &ctx).await;
            let id = case.id().to_string();
            self.project_cases.push(case);
            // A validate-only run leaves valid actions NotRun.
            let accepted = status == TestStatus::Passed
                || (!ctx.execute && status == TestStatus::NotRun);
            if !accepted {
                return Err(ProvaError::Plugin {
                    plugin: name,
                    message: format!("Project setup '{id}' ended with status {status}"),
                });
            }
        }
        Ok(())
    }

    fn context(&self) -> RunContext {
        RunContext {
            cancel: self.cancel.clone(),
            execute: self.execute_actions,
        }
    }

    /// Walks the suite tree depth-first and runs every test case.
    pub async fn execute(&mut self) -> Result<()> {
        self.advance(&[Phase::SetUp], Phase::Executed)?;
        let root = self
            .root
            .ok_or_else(|| ProvaError::Config("No root test suite".to_string()))?;
        if !self.execute_actions {
            info!("Validate-only run, actions are checked but not executed");
        }
        let ctx = self.context();
        let status = execute_suite(&mut self.tree, &mut self.plugins, root, ctx).await;
        info!("Test run finished with status '{}'", status);
        Ok(())
    }

    /// Runs project level teardown cases and hands the summary to the reporters.
    ///
    /// Accepted after a failed `set_up` or `execute` as well.
    pub async fn tear_down(&mut self) -> Result<()> {
        self.advance(
            &[Phase::Initialized, Phase::SetUp, Phase::Executed],
            Phase::TornDown,
        )?;
        let Some(root) = self.root else {
            return Ok(());
        };

        let ctx = RunContext {
            // Teardown runs even after a cancelled walk.
            cancel: CancellationToken::new(),
            execute: self.execute_actions,
        };
        let mut first_error = None;
        for index in 0..self.plugins.inputs().len() {
            let input = &mut self.plugins.inputs_mut()[index];
            let name = input.name().to_string();
            match input.project_tear_down() {
                Ok(Some(mut case)) => {
                    case.set_source(&name);
                    info!("Running project teardown '{}'", case.id());
                    run_case(&mut self.plugins, &mut case, &ctx).await;
                    self.project_cases.push(case);
                }
                Ok(None) => {}
                Err(e) => {
                    let err = ProvaError::plugin(&name, e);
                    error!("{}", err);
                    first_error.get_or_insert(err);
                }
            }
        }

        let tree = &self.tree;
        self.plugins
            .report(|reporter| reporter.log_test_run_summary(tree, root));
        first_error.map_or(Ok(()), Err)
    }

    /// Releases every plug-in. Always attempts all of them; idempotent.
    pub fn shut_down(&mut self) -> Result<()> {
        if self.phase == Phase::ShutDown {
            return Ok(());
        }
        debug!("Phase '{}' -> '{}'", self.phase, Phase::ShutDown);
        self.phase = Phase::ShutDown;

        let mut first_error = None;
        let mut record = |name: &str, result: anyhow::Result<()>| {
            if let Err(e) = result {
                let err = ProvaError::plugin(name, e);
                error!("{}", err);
                first_error.get_or_insert(err);
            }
        };
        for input in self.plugins.inputs_mut() {
            let result = input.shut_down();
            record(input.name(), result);
        }
        for output in self.plugins.outputs_mut() {
            let result = output.shut_down();
            record(output.name(), result);
        }
        for reporter in self.plugins.reporters_mut() {
            let result = reporter.shut_down();
            record(reporter.name(), result);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Drives every phase. A failed `init` skips to `shut_down`; a failed
    /// `set_up` or `execute` still runs `tear_down` and `shut_down`. The first
    /// error is returned.
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.init() {
            error!("Initialisation failed: {}", e);
            if let Err(shutdown) = self.shut_down() {
                warn!("Shut down after failed init: {}", shutdown);
            }
            return Err(e);
        }

        let mut first_error = match self.set_up().await {
            Ok(()) => self.execute().await.err(),
            Err(e) => Some(e),
        };
        if let Some(e) = &first_error {
            error!("Test run aborted: {}", e);
        }
        if let Err(e) = self.tear_down().await {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.shut_down() {
            first_error.get_or_insert(e);
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Spawns [`Prova::run`] on the tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn start(self) -> RunHandle {
        let cancel = self.cancel.clone();
        let join = tokio::spawn(async move {
            let mut prova = self;
            let started = Instant::now();
            prova.run().await?;
            Ok::<_, ProvaError>(prova.into_report(started.elapsed()))
        });
        RunHandle { join, cancel }
    }

    /// Consumes the runner, keeping the executed tree.
    pub fn into_report(self, duration: Duration) -> RunReport {
        let (status, counts) = match self.root {
            Some(root) => (self.tree[root].status(), StatusCounts::tally(&self.tree, root)),
            None => (TestStatus::NotRun, StatusCounts::default()),
        };
        RunReport {
            tree: self.tree,
            root: self.root,
            status,
            counts,
            duration,
        }
    }
}

/// Depth-first walk: suite start, own cases, child suites, aggregation, suite end.
fn execute_suite<'a>(
    tree: &'a mut SuiteTree,
    plugins: &'a mut PluginRegistry,
    suite: SuiteId,
    ctx: RunContext,
) -> BoxFuture<'a, TestStatus> {
    async move {
        {
            let tree_ref: &SuiteTree = tree;
            plugins.report(|r| r.log_start_test_suite(tree_ref, suite));
        }
        trace!("Entering test suite '{}'", tree.path(suite));

        let case_count = tree[suite].test_cases().len();
        for index in 0..case_count {
            if ctx.cancel.is_cancelled() {
                break;
            }
            let Ok(node) = tree.suite_mut(suite) else {
                break;
            };
            let case = &mut node.test_cases_mut()[index];
            run_case(plugins, case, &ctx).await;
        }

        let children = tree.test_suites(suite).to_vec();
        for child in &children {
            if ctx.cancel.is_cancelled() {
                break;
            }
            execute_suite(tree, plugins, *child, ctx.clone()).await;
        }

        let node = &tree[suite];
        let status = TestStatus::aggregate(
            node.test_cases()
                .iter()
                .map(TestCase::status)
                .chain(children.iter().map(|&c| tree[c].status())),
        );
        if let Ok(node) = tree.suite_mut(suite) {
            node.set_status(status);
        }

        let tree_ref: &SuiteTree = tree;
        plugins.report(|r| r.log_end_test_suite(tree_ref, suite));
        status
    }
    .boxed()
}

/// Loads (if needed) and runs one test case; returns and records its status.
async fn run_case(plugins: &mut PluginRegistry, case: &mut TestCase, ctx: &RunContext) -> TestStatus {
    let load_error = load_case(plugins, case).err();

    plugins.report(|r| r.log_start_test_case(case));

    if let Some(e) = load_error {
        let reason = format!("Failed to load test case: {e}");
        warn!("Test case '{}': {}", case.id(), reason);
        plugins.report(|r| r.log_message(&reason, LogTarget::Case));
        case.update_status(TestStatus::Blocked, &reason);
        plugins.report(|r| r.log_end_test_case(case));
        return TestStatus::Blocked;
    }

    // Per-type resources: the output plug-in serving a type is set up once per case.
    let mut types: Vec<TestType> = Vec::new();
    for phase in ActionPhase::ORDER {
        for action in case.actions(phase) {
            if let Some(t) = action.lock().state().test_type() {
                if !types.contains(t) {
                    types.push(t.clone());
                }
            }
        }
    }
    let mut ready: Vec<usize> = Vec::new();
    let mut blocked: BTreeSet<TestType> = BTreeSet::new();
    for test_type in &types {
        match plugins.output_for(test_type) {
            Some(index) if ready.contains(&index) => {}
            Some(index) => {
                let output = &mut plugins.outputs_mut()[index];
                match output.set_up(case) {
                    Ok(()) => ready.push(index),
                    Err(e) => {
                        let err = ProvaError::plugin(output.name(), e);
                        warn!("{}", err);
                        let message = err.to_string();
                        plugins.report(|r| r.log_message(&message, LogTarget::Case));
                        blocked.insert(test_type.clone());
                    }
                }
            }
            None => {
                let message = format!("No output plug-in supports test type '{test_type}'");
                warn!("{}", message);
                plugins.report(|r| r.log_message(&message, LogTarget::Case));
                blocked.insert(test_type.clone());
            }
        }
    }

    let mut statuses: Vec<TestStatus> = Vec::with_capacity(case.number_of_actions());
    let mut interrupted = false;
    'phases: for phase in ActionPhase::ORDER {
        let actions: Vec<ActionHandle> = case.actions(phase).to_vec();
        for action in actions {
            // Teardown actions still run after a cancel so the case cleans up.
            if phase != ActionPhase::TearDown && ctx.cancel.is_cancelled() {
                interrupted = true;
                continue 'phases;
            }
            let status = run_one(case, &action, &blocked, ctx).await;
            statuses.push(status);

            let returned = action.lock().state().return_variables().clone();
            for (key, value) in returned {
                if let Err(e) = case.set_variable(&key, value) {
                    warn!("Ignoring return variable of action: {}", e);
                }
            }

            let guard = action.lock();
            let action_ref: &dyn TestAction = &*guard;
            plugins.report(|r| match phase {
                ActionPhase::SetUp => r.log_set_up_action(action_ref),
                ActionPhase::Test => r.log_test_action(action_ref),
                ActionPhase::TearDown => r.log_tear_down_action(action_ref),
            });
        }
    }

    for index in ready {
        let output = &mut plugins.outputs_mut()[index];
        if let Err(e) = output.tear_down(case) {
            let err = ProvaError::plugin(output.name(), e);
            warn!("{}", err);
            let message = err.to_string();
            plugins.report(|r| r.log_message(&message, LogTarget::Case));
        }
    }

    let reason = describe_outcome(&statuses, interrupted);
    if interrupted {
        // Unvisited actions keep the case from reading as passed.
        statuses.push(TestStatus::NotRun);
    }
    let status = TestStatus::aggregate(statuses.iter().copied());
    case.update_status(status, &reason);
    plugins.report(|r| r.log_end_test_case(case));
    status
}

/// Fills the action lists through the input plug-in that created the case.
fn load_case(plugins: &mut PluginRegistry, case: &mut TestCase) -> Result<()> {
    if case.is_loaded() {
        return Ok(());
    }
    let Some(source) = case.source().map(str::to_string) else {
        // Built in code: the action lists are already complete.
        case.mark_loaded();
        return Ok(());
    };
    let index = plugins
        .input_index(&source)
        .ok_or_else(|| ProvaError::not_found("Input plug-in", source.clone()))?;
    let (inputs, mut resolver, _) = plugins.split();
    let resolver: &mut dyn ActionResolver = &mut resolver;
    inputs[index]
        .load_test_case(case, resolver)
        .map_err(|e| ProvaError::plugin(&source, e))?;
    case.mark_loaded();
    debug!(
        "Loaded test case '{}' with {} actions",
        case.id(),
        case.number_of_actions()
    );
    Ok(())
}

/// Runs (or, in validate-only mode, checks) a single action.
async fn run_one(
    case: &TestCase,
    action: &ActionHandle,
    blocked: &BTreeSet<TestType>,
    ctx: &RunContext,
) -> TestStatus {
    {
        let mut guard = action.lock();
        let unavailable = guard
            .state()
            .test_type()
            .is_some_and(|t| blocked.contains(t));
        if unavailable {
            guard.state_mut().force_status(TestStatus::Blocked);
            return TestStatus::Blocked;
        }
        if !ctx.execute {
            let status = if guard.is_valid() {
                TestStatus::NotRun
            } else {
                TestStatus::Blocked
            };
            guard.state_mut().force_status(status);
            return status;
        }
        guard.bind_variables(case.variables());
    }

    let handle = action.clone();
    match tokio::task::spawn_blocking(move || {
        let mut guard = handle.lock();
        run_action(&mut *guard)
    })
    .await
    {
        Ok(status) => status,
        Err(e) => {
            let mut guard = action.lock();
            let status = guard
                .state_mut()
                .fail(anyhow::anyhow!("Test action aborted: {e}"));
            guard.state_mut().force_status(status);
            status
        }
    }
}

fn describe_outcome(statuses: &[TestStatus], interrupted: bool) -> String {
    if statuses.is_empty() && !interrupted {
        return "No actions".to_string();
    }
    let counts = StatusCounts::from_statuses(statuses.iter().copied());
    let mut reason = format!(
        "{} actions: {} passed, {} failed, {} blocked, {} not run",
        statuses.len(),
        counts.passed,
        counts.failed,
        counts.blocked,
        counts.not_run
    );
    if interrupted {
        reason.push_str(" (cancelled)");
    }
    reason
}

/// Number of items per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub not_run: usize,
    pub blocked: usize,
    pub passed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn from_statuses<I: IntoIterator<Item = TestStatus>>(statuses: I) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.add(status);
        }
        counts
    }

    /// Counts every test case below `root`.
    pub fn tally(tree: &SuiteTree, root: SuiteId) -> Self {
        Self::from_statuses(
            tree.descendants(root)
                .into_iter()
                .flat_map(|suite| tree[suite].test_cases().iter().map(TestCase::status)),
        )
    }

    pub fn add(&mut self, status: TestStatus) {
        match status {
            TestStatus::NotRun => self.not_run += 1,
            TestStatus::Blocked => self.blocked += 1,
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.not_run + self.blocked + self.passed + self.failed
    }
}

/// Handle to a run started with [`Prova::start`].
pub struct RunHandle {
    join: JoinHandle<Result<RunReport>>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Stops the tree walk at the next suite, case or action boundary.
    pub fn cancel(&self) {
        info!("Cancelling test run");
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the run to finish.
    ///
    /// # Errors
    /// The first fatal engine error of the run, or `Worker` when the task panicked.
    pub async fn join(self) -> Result<RunReport> {
        self.join
            .await
            .map_err(|e| ProvaError::Worker(e.to_string()))?
    }
}

/// Outcome of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub tree: SuiteTree,
    pub root: Option<SuiteId>,
    pub status: TestStatus,
    pub counts: StatusCounts,
    pub duration: Duration,
}

impl RunReport {
    /// Serialisable view of the run.
    pub fn summary(&self) -> RunSummary {
        let suites = self
            .root
            .map(|root| {
                self.tree
                    .descendants(root)
                    .into_iter()
                    .map(|suite| SuiteSummary {
                        path: self.tree.path(suite),
                        status: self.tree[suite].status(),
                        cases: self.tree[suite]
                            .test_cases()
                            .iter()
                            .map(|case| CaseSummary {
                                id: case.id().to_string(),
                                status: case.status(),
                                reason: case.status_reason().map(str::to_string),
                            })
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        RunSummary {
            status: self.status,
            counts: self.counts,
            duration_ms: self.duration.as_millis() as u64,
            suites,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub status: TestStatus,
    pub counts: StatusCounts,
    pub duration_ms: u64,
    pub suites: Vec<SuiteSummary>,
}

#[derive(Debug, Serialize)]
pub struct SuiteSummary {
    pub path: String,
    pub status: TestStatus,
    pub cases: Vec<CaseSummary>,
}

#[derive(Debug, Serialize)]
pub struct CaseSummary {
    pub id: String,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
