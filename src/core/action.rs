//! # Test Action Module / 测试动作模块
//!
//! A test action is the single executable step of a test case. Concrete actions
//! (shell commands, browser steps, ...) are independent types implementing the
//! [`TestAction`] capability; the data every action carries lives in
//! [`ActionState`].
//!
//! 测试动作是测试用例中的单个可执行步骤。具体动作实现 [`TestAction`] 能力，
//! 所有动作共有的数据保存在 [`ActionState`] 中。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::core::error::{require_trimmed, ProvaError, Result};
use crate::core::plugins::TestType;
use crate::core::status::TestStatus;

/// Shared, lockable handle to a test action.
///
/// A test case keeps handles in its action lists; identity of the handle is what
/// makes two entries "the same action".
pub type ActionHandle = Arc<Mutex<dyn TestAction>>;

/// Wraps a concrete action into an [`ActionHandle`].
pub fn shared<A: TestAction + 'static>(action: A) -> ActionHandle {
    Arc::new(Mutex::new(action))
}

/// A recorded point in time: wall clock for reports, monotonic clock for durations.
#[derive(Debug, Clone, Copy)]
struct Timestamp {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl Timestamp {
    fn now() -> Self {
        Self {
            wall: Utc::now(),
            mono: Instant::now(),
        }
    }
}

/// Data owned by every test action.
/// 每个测试动作拥有的数据。
#[derive(Debug)]
pub struct ActionState {
    id: i64,
    parent: Option<String>,
    test_type: Option<TestType>,
    status: TestStatus,
    started: Option<Timestamp>,
    ended: Option<Timestamp>,
    attributes: BTreeMap<String, String>,
    return_variables: BTreeMap<String, String>,
    result_file: Option<PathBuf>,
    last_error: Option<anyhow::Error>,
}

impl ActionState {
    /// Creates the state for action `id`.
    ///
    /// # Errors
    /// `InvalidArgument` for a negative id.
    pub fn new(id: i64) -> Result<Self> {
        if id < 0 {
            debug!("Invalid test action id ({})", id);
            return Err(ProvaError::invalid(format!("Invalid test action id ({id})")));
        }
        Ok(Self {
            id,
            parent: None,
            test_type: None,
            status: TestStatus::NotRun,
            started: None,
            ended: None,
            attributes: BTreeMap::new(),
            return_variables: BTreeMap::new(),
            result_file: None,
            last_error: None,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Links the action to the test case it belongs to. Later calls overwrite.
    pub fn set_parent(&mut self, case_id: &str) -> Result<()> {
        let case_id = require_trimmed(case_id, "Parent test case id")?;
        trace!("Set the parent of test action {} to '{}'", self.id, case_id);
        self.parent = Some(case_id.to_string());
        Ok(())
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Technology this action runs against; stamped by the output plug-in that created it.
    pub fn test_type(&self) -> Option<&TestType> {
        self.test_type.as_ref()
    }

    pub fn set_test_type(&mut self, test_type: TestType) {
        self.test_type = Some(test_type);
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Overwrites the status. There is no transition table.
    ///
    /// # Errors
    /// `InvalidArgument` when no status is given; the current status is kept.
    pub fn update_status(&mut self, status: impl Into<Option<TestStatus>>) -> Result<TestStatus> {
        let status = status
            .into()
            .ok_or_else(|| ProvaError::invalid("Test action status must be set"))?;
        debug!("Updating test action {} status to '{}'", self.id, status);
        self.status = status;
        Ok(status)
    }

    /// Records the start of an execution and returns its wall-clock time.
    pub fn start_execution(&mut self) -> DateTime<Utc> {
        let now = Timestamp::now();
        trace!("Starting test action {} at '{}'", self.id, now.wall);
        self.started = Some(now);
        now.wall
    }

    /// Records the end of an execution and returns its wall-clock time.
    pub fn end_execution(&mut self) -> DateTime<Utc> {
        let now = Timestamp::now();
        trace!("Stopped test action {} at '{}'", self.id, now.wall);
        self.ended = Some(now);
        now.wall
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started.map(|t| t.wall)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended.map(|t| t.wall)
    }

    /// Time between the recorded start and end.
    ///
    /// # Errors
    /// `InvalidArgument` unless both were recorded, or when the end precedes the start.
    pub fn execution_time(&self) -> Result<Duration> {
        let started = self
            .started
            .ok_or_else(|| ProvaError::invalid("Start time not set"))?;
        let ended = self
            .ended
            .ok_or_else(|| ProvaError::invalid("End time not set"))?;
        ended
            .mono
            .checked_duration_since(started.mono)
            .ok_or_else(|| ProvaError::invalid("End time lies before start time"))
    }

    /// Stores `value` verbatim under the trimmed `key`.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = require_trimmed(key, "Attribute key")?;
        let value = value.into();
        trace!("Set attribute '{}' of action {} to '{}'", key, self.id, value);
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// # Errors
    /// `NotFound` when no attribute `key` exists.
    pub fn attribute(&self, key: &str) -> Result<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ProvaError::not_found("Attribute", key))
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Publishes a value for later actions of the same test case.
    pub fn set_return_variable(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = require_trimmed(key, "Return variable key")?;
        let value = value.into();
        trace!("Set return variable '{}' of action {} to '{}'", key, self.id, value);
        self.return_variables.insert(key.to_string(), value);
        Ok(())
    }

    pub fn return_variables(&self) -> &BTreeMap<String, String> {
        &self.return_variables
    }

    pub fn set_result_file(&mut self, path: Option<PathBuf>) {
        trace!("Set result file of action {} to {:?}", self.id, path);
        self.result_file = path;
    }

    pub fn result_file(&self) -> Option<&Path> {
        self.result_file.as_deref()
    }

    /// Keeps `error` as the cause of the last failure and returns `Failed`.
    pub fn fail(&mut self, error: anyhow::Error) -> TestStatus {
        debug!("Test action {} failed: {:#}", self.id, error);
        self.last_error = Some(error);
        TestStatus::Failed
    }

    pub fn last_error(&self) -> Option<&anyhow::Error> {
        self.last_error.as_ref()
    }

    pub(crate) fn force_status(&mut self, status: TestStatus) {
        self.status = status;
    }
}

/// Capability implemented by every concrete action.
///
/// `execute` must not panic or propagate expected failures: it returns
/// `Failed` and keeps the cause via [`ActionState::fail`].
///
/// 每个具体动作实现的能力接口。`execute` 对预期的失败返回 `Failed`，
/// 并通过 [`ActionState::fail`] 记录原因。
pub trait TestAction: Send {
    fn state(&self) -> &ActionState;

    fn state_mut(&mut self) -> &mut ActionState;

    /// Performs the side-effecting operation.
    fn execute(&mut self) -> TestStatus;

    /// Side-effect free check that required attributes and collaborators are present.
    fn is_valid(&self) -> bool;

    /// Human readable rendering for logs and reports.
    fn describe(&self) -> String;

    /// Receives the variables of the owning test case right before execution.
    fn bind_variables(&mut self, _variables: &BTreeMap<String, String>) {}

    /// Sets an attribute; actions with typed attributes may intercept this.
    fn set_attribute(&mut self, key: &str, value: &str) -> Result<()> {
        self.state_mut().set_attribute(key, value)
    }

    fn id(&self) -> i64 {
        self.state().id()
    }

    fn status(&self) -> TestStatus {
        self.state().status()
    }
}

/// Runs one action: `is_valid` first, `Blocked` when it fails, otherwise a timed
/// `execute` whose outcome becomes the action status.
pub fn run_action(action: &mut dyn TestAction) -> TestStatus {
    if !action.is_valid() {
        debug!("Test action is not valid, blocked: {}", action.describe());
        action.state_mut().force_status(TestStatus::Blocked);
        return TestStatus::Blocked;
    }

    action.state_mut().start_execution();
    let status = action.execute();
    action.state_mut().end_execution();
    action.state_mut().force_status(status);
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        state: ActionState,
        outcome: TestStatus,
        valid: bool,
    }

    impl Scripted {
        fn new(id: i64, outcome: TestStatus, valid: bool) -> Self {
            Self {
                state: ActionState::new(id).unwrap(),
                outcome,
                valid,
            }
        }
    }

    impl TestAction for Scripted {
        fn state(&self) -> &ActionState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ActionState {
            &mut self.state
        }

        fn execute(&mut self) -> TestStatus {
            if self.outcome == TestStatus::Failed {
                return self.state.fail(anyhow::anyhow!("scripted failure"));
            }
            self.state.set_return_variable("RESULT", "ok").unwrap();
            self.outcome
        }

        fn is_valid(&self) -> bool {
            self.valid
        }

        fn describe(&self) -> String {
            format!("SCRIPTED #{}", self.state.id())
        }
    }

    #[test]
    fn test_new_action_is_not_run() {
        let state = ActionState::new(0).unwrap();
        assert_eq!(state.status(), TestStatus::NotRun);
        assert_eq!(state.id(), 0);
        assert!(state.parent().is_none());
        assert!(state.result_file().is_none());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_negative_id_is_rejected() {
        assert!(ActionState::new(-1).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_update_status_without_value_keeps_status() {
        let mut state = ActionState::new(3).unwrap();
        state.update_status(TestStatus::Passed).unwrap();
        assert!(state.update_status(None).unwrap_err().is_invalid_argument());
        assert_eq!(state.status(), TestStatus::Passed);
        // Any value may replace any other.
        state.update_status(TestStatus::NotRun).unwrap();
        assert_eq!(state.status(), TestStatus::NotRun);
    }

    #[test]
    fn test_execution_time_requires_start_and_end() {
        let mut state = ActionState::new(1).unwrap();
        assert!(state.execution_time().is_err());
        state.start_execution();
        assert!(state.execution_time().is_err());
        state.end_execution();
        assert!(state.execution_time().is_ok());
        assert!(state.started_at().unwrap() <= state.ended_at().unwrap());
    }

    #[test]
    fn test_execution_time_without_start_fails() {
        let mut state = ActionState::new(1).unwrap();
        state.end_execution();
        assert!(state.execution_time().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_attribute_key_trimmed_value_verbatim() {
        let mut state = ActionState::new(1).unwrap();
        state.set_attribute("  k  ", " v ").unwrap();
        assert_eq!(state.attribute("k").unwrap(), " v ");
        assert!(state.has_attribute("k"));
        assert!(!state.has_attribute("  k  "));

        state.set_attribute("empty", "").unwrap();
        assert_eq!(state.attribute("empty").unwrap(), "");
    }

    #[test]
    fn test_attribute_validation() {
        let mut state = ActionState::new(1).unwrap();
        assert!(state.set_attribute("   ", "x").unwrap_err().is_invalid_argument());
        assert!(state.attribute("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_return_variables_are_separate_from_attributes() {
        let mut state = ActionState::new(1).unwrap();
        state.set_return_variable(" OUT ", " value ").unwrap();
        assert_eq!(state.return_variables().get("OUT").unwrap(), " value ");
        assert!(!state.has_attribute("OUT"));
        assert!(state.set_return_variable("", "x").is_err());
    }

    #[test]
    fn test_parent_must_not_be_empty() {
        let mut state = ActionState::new(1).unwrap();
        assert!(state.set_parent(" ").is_err());
        state.set_parent("tc1").unwrap();
        state.set_parent("tc2").unwrap();
        assert_eq!(state.parent(), Some("tc2"));
    }

    #[test]
    fn test_run_action_blocks_invalid_action() {
        let mut action = Scripted::new(1, TestStatus::Passed, false);
        assert_eq!(run_action(&mut action), TestStatus::Blocked);
        assert_eq!(action.status(), TestStatus::Blocked);
        assert!(action.state().started_at().is_none());
    }

    #[test]
    fn test_run_action_records_timing_and_outcome() {
        let mut action = Scripted::new(2, TestStatus::Passed, true);
        assert_eq!(run_action(&mut action), TestStatus::Passed);
        assert_eq!(action.status(), TestStatus::Passed);
        assert!(action.state().execution_time().is_ok());
        assert_eq!(action.state().return_variables().get("RESULT").unwrap(), "ok");
    }

    #[test]
    fn test_run_action_keeps_last_error() {
        let handle = shared(Scripted::new(3, TestStatus::Failed, true));
        let mut guard = handle.lock();
        assert_eq!(run_action(&mut *guard), TestStatus::Failed);
        let error = guard.state().last_error().unwrap();
        assert_eq!(error.to_string(), "scripted failure");
    }
}
