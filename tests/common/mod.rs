// Shared test helpers for integration tests
#![allow(dead_code)]

use anyhow::{bail, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use prova::core::action::{shared, ActionHandle, ActionState, TestAction};
use prova::core::case::TestCase;
use prova::core::plugins::{
    ActionResolver, InputPlugin, LogTarget, OutputPlugin, ReportingPlugin, TestType,
};
use prova::core::properties::PropertyStore;
use prova::core::status::TestStatus;
use prova::core::suite::{SuiteId, SuiteTree};

/// Event log shared between a plug-in and the test that inspects it.
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

/// Events starting with `prefix`, in order.
pub fn filtered(events: &Events, prefix: &str) -> Vec<String> {
    events
        .lock()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

/// An action whose outcome is decided up front.
pub struct ScriptedAction {
    state: ActionState,
    outcome: TestStatus,
    valid: bool,
    delay: Option<Duration>,
    returns: Vec<(String, String)>,
    seen: Option<Arc<Mutex<Vec<(String, String)>>>>,
}

impl ScriptedAction {
    pub fn new(id: i64, outcome: TestStatus) -> Self {
        Self {
            state: ActionState::new(id).unwrap(),
            outcome,
            valid: true,
            delay: None,
            returns: Vec::new(),
            seen: None,
        }
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn returning(mut self, key: &str, value: &str) -> Self {
        self.returns.push((key.to_string(), value.to_string()));
        self
    }

    /// Records the variables bound before execution.
    pub fn observing(mut self, seen: Arc<Mutex<Vec<(String, String)>>>) -> Self {
        self.seen = Some(seen);
        self
    }

    pub fn typed(mut self, test_type: &str) -> Self {
        self.state.set_test_type(TestType::new(test_type).unwrap());
        self
    }

    pub fn handle(self) -> ActionHandle {
        shared(self)
    }
}

impl TestAction for ScriptedAction {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn execute(&mut self) -> TestStatus {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        for (key, value) in self.returns.clone() {
            self.state.set_return_variable(&key, value).unwrap();
        }
        if self.outcome == TestStatus::Failed {
            return self.state.fail(anyhow::anyhow!("scripted failure"));
        }
        self.outcome
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn describe(&self) -> String {
        format!("SCRIPTED #{}", self.state.id())
    }

    fn bind_variables(&mut self, variables: &std::collections::BTreeMap<String, String>) {
        if let Some(seen) = &self.seen {
            let mut seen = seen.lock();
            seen.extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}

pub fn scripted(id: i64, outcome: TestStatus) -> ActionHandle {
    ScriptedAction::new(id, outcome).handle()
}

/// A case with one action per phase.
pub fn case_with(id: &str, set_up: TestStatus, test: TestStatus, tear_down: TestStatus) -> TestCase {
    let mut case = TestCase::new(id).unwrap();
    case.add_set_up_action(scripted(0, set_up)).unwrap();
    case.add_test_action(scripted(1, test)).unwrap();
    case.add_tear_down_action(scripted(2, tear_down)).unwrap();
    case
}

type Populate = Box<dyn FnMut(&mut SuiteTree, SuiteId) -> Result<()> + Send>;

/// Input plug-in whose tree is built by a closure; its cases are complete.
pub struct ScriptedInput {
    name: String,
    populate: Populate,
    project_set_up: Option<TestCase>,
    project_tear_down: Option<TestCase>,
    unloadable: Vec<String>,
    events: Events,
}

impl ScriptedInput {
    pub fn new(
        events: &Events,
        populate: impl FnMut(&mut SuiteTree, SuiteId) -> Result<()> + Send + 'static,
    ) -> Self {
        Self {
            name: "scripted-input".to_string(),
            populate: Box::new(populate),
            project_set_up: None,
            project_tear_down: None,
            unloadable: Vec::new(),
            events: events.clone(),
        }
    }

    pub fn with_project_set_up(mut self, case: TestCase) -> Self {
        self.project_set_up = Some(case);
        self
    }

    pub fn with_project_tear_down(mut self, case: TestCase) -> Self {
        self.project_tear_down = Some(case);
        self
    }

    /// `load_test_case` fails for the case with this id.
    pub fn failing_to_load(mut self, id: &str) -> Self {
        self.unloadable.push(id.to_string());
        self
    }
}

impl InputPlugin for ScriptedInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _properties: &PropertyStore) -> Result<()> {
        self.events.lock().push("input:init".to_string());
        Ok(())
    }

    fn set_test_root(&mut self, path: &Path, _project: &str) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    fn set_test_case_filter(&mut self, labels: &[String]) -> String {
        self.events.lock().push(format!("input:filter:{}", labels.join(",")));
        "scripted".to_string()
    }

    fn set_up(&mut self, tree: &mut SuiteTree, root: SuiteId) -> Result<()> {
        (self.populate)(tree, root)
    }

    fn load_test_case(&mut self, case: &mut TestCase, _resolver: &mut dyn ActionResolver) -> Result<()> {
        self.events.lock().push(format!("input:load:{}", case.id()));
        if self.unloadable.iter().any(|id| id == case.id()) {
            bail!("cannot load '{}'", case.id());
        }
        Ok(())
    }

    fn project_set_up(&mut self) -> Result<Option<TestCase>> {
        Ok(self.project_set_up.take())
    }

    fn project_tear_down(&mut self) -> Result<Option<TestCase>> {
        Ok(self.project_tear_down.take())
    }

    fn shut_down(&mut self) -> Result<()> {
        self.events.lock().push("input:shut_down".to_string());
        Ok(())
    }
}

/// Output plug-in serving one test type with scripted actions.
pub struct ScriptedOutput {
    name: String,
    test_type: String,
    fail_set_up: bool,
    events: Events,
}

impl ScriptedOutput {
    pub fn new(events: &Events, test_type: &str) -> Self {
        Self {
            name: format!("scripted-{test_type}"),
            test_type: test_type.to_string(),
            fail_set_up: false,
            events: events.clone(),
        }
    }

    pub fn failing_set_up(mut self) -> Self {
        self.fail_set_up = true;
        self
    }
}

impl OutputPlugin for ScriptedOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _properties: &PropertyStore) -> Result<()> {
        self.events.lock().push(format!("output:init:{}", self.test_type));
        Ok(())
    }

    fn supported_types(&self) -> Vec<TestType> {
        vec![TestType::new(&self.test_type).unwrap()]
    }

    fn set_up(&mut self, case: &TestCase) -> Result<()> {
        self.events.lock().push(format!("output:set_up:{}", case.id()));
        if self.fail_set_up {
            bail!("session could not be opened");
        }
        Ok(())
    }

    fn tear_down(&mut self, case: &TestCase) -> Result<()> {
        self.events.lock().push(format!("output:tear_down:{}", case.id()));
        Ok(())
    }

    fn resolve_action(&mut self, _name: &str, id: i64) -> Result<ActionHandle> {
        Ok(scripted(id, TestStatus::Passed))
    }

    fn shut_down(&mut self) -> Result<()> {
        self.events.lock().push(format!("output:shut_down:{}", self.test_type));
        Ok(())
    }
}

/// Reporter recording every hook as a line of text.
pub struct RecordingReporter {
    events: Events,
}

impl RecordingReporter {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
        }
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }

    fn action_event(kind: &str, action: &dyn TestAction) -> String {
        format!(
            "{}:{}#{}:{}",
            kind,
            action.state().parent().unwrap_or("-"),
            action.id(),
            action.status()
        )
    }
}

impl ReportingPlugin for RecordingReporter {
    fn name(&self) -> &str {
        "recording"
    }

    fn init(&mut self, _properties: &PropertyStore) -> Result<()> {
        self.push("report:init".to_string());
        Ok(())
    }

    fn set_output_location(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn set_project_name(&mut self, name: &str) {
        self.push(format!("report:project:{name}"));
    }

    fn set_up(&mut self) -> Result<()> {
        self.push("report:set_up".to_string());
        Ok(())
    }

    fn shut_down(&mut self) -> Result<()> {
        self.push("report:shut_down".to_string());
        Ok(())
    }

    fn log_start_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId) {
        self.push(format!("suite_start:{}", tree.path(suite)));
    }

    fn log_end_test_suite(&mut self, tree: &SuiteTree, suite: SuiteId) {
        self.push(format!("suite_end:{}:{}", tree.path(suite), tree[suite].status()));
    }

    fn log_start_test_case(&mut self, case: &TestCase) {
        self.push(format!("case_start:{}", case.id()));
    }

    fn log_end_test_case(&mut self, case: &TestCase) {
        self.push(format!("case_end:{}:{}", case.id(), case.status()));
    }

    fn log_set_up_action(&mut self, action: &dyn TestAction) {
        self.push(Self::action_event("setup_action", action));
    }

    fn log_test_action(&mut self, action: &dyn TestAction) {
        self.push(Self::action_event("test_action", action));
    }

    fn log_tear_down_action(&mut self, action: &dyn TestAction) {
        self.push(Self::action_event("teardown_action", action));
    }

    fn log_test_run_summary(&mut self, tree: &SuiteTree, root: SuiteId) {
        self.push(format!("summary:{}", tree[root].status()));
    }

    fn log_message(&mut self, message: &str, _target: LogTarget) {
        self.push(format!("message:{message}"));
    }
}

/// root → a → {b1, b2} → {c1..c4}: seven suites below the root.
pub fn tree_1_2_4() -> (SuiteTree, SuiteId) {
    let mut tree = SuiteTree::new();
    let root = tree.create_suite("root").unwrap();
    let a = tree.create_suite("a").unwrap();
    tree.add_test_suite(root, a).unwrap();
    for (b, cs) in [("b1", ["c1", "c2"]), ("b2", ["c3", "c4"])] {
        let b = tree.create_suite(b).unwrap();
        tree.add_test_suite(a, b).unwrap();
        for c in cs {
            let c = tree.create_suite(c).unwrap();
            tree.add_test_suite(b, c).unwrap();
        }
    }
    (tree, root)
}
