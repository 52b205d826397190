//! # Test Case Module / 测试用例模块
//!
//! A test case groups three ordered action lists (setup, test, teardown) that
//! share headers and variables.
//!
//! 测试用例包含三个有序的动作列表（准备、测试、清理），它们共享头信息和变量。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::core::action::ActionHandle;
use crate::core::error::{require_trimmed, ProvaError, Result};
use crate::core::status::TestStatus;

/// The three action lists of a test case, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    SetUp,
    Test,
    TearDown,
}

impl ActionPhase {
    pub const ORDER: [ActionPhase; 3] = [ActionPhase::SetUp, ActionPhase::Test, ActionPhase::TearDown];
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionPhase::SetUp => "setup",
            ActionPhase::Test => "test",
            ActionPhase::TearDown => "teardown",
        })
    }
}

/// A test case. / 测试用例。
pub struct TestCase {
    id: String,
    status: TestStatus,
    status_reason: Option<String>,
    headers: BTreeMap<String, String>,
    variables: BTreeMap<String, String>,
    set_up_actions: Vec<ActionHandle>,
    test_actions: Vec<ActionHandle>,
    tear_down_actions: Vec<ActionHandle>,
    source: Option<String>,
    loaded: bool,
}

impl TestCase {
    /// Creates a test case; the trimmed id is fixed for its lifetime.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty or blank id.
    pub fn new(id: &str) -> Result<Self> {
        let id = require_trimmed(id, "Test case id")?;
        trace!("Create test case '{}'", id);
        Ok(Self {
            id: id.to_string(),
            status: TestStatus::NotRun,
            status_reason: None,
            headers: BTreeMap::new(),
            variables: BTreeMap::new(),
            set_up_actions: Vec::new(),
            test_actions: Vec::new(),
            tear_down_actions: Vec::new(),
            source: None,
            loaded: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Reason given with the last status update, for reporting.
    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }

    /// Overwrites the status; `reason` only travels to the reporting channel.
    pub fn update_status(&mut self, status: TestStatus, reason: &str) -> TestStatus {
        debug!("Update status of test case '{}' to '{}' ({})", self.id, status, reason);
        self.status = status;
        self.status_reason = Some(reason.to_string());
        status
    }

    pub fn add_set_up_action(&mut self, action: ActionHandle) -> Result<()> {
        self.add_action(ActionPhase::SetUp, action)
    }

    pub fn add_test_action(&mut self, action: ActionHandle) -> Result<()> {
        self.add_action(ActionPhase::Test, action)
    }

    pub fn add_tear_down_action(&mut self, action: ActionHandle) -> Result<()> {
        self.add_action(ActionPhase::TearDown, action)
    }

    /// Appends `action` to the `phase` list and makes this case its parent.
    ///
    /// # Errors
    /// `InvalidArgument` when the very same action instance is already in that list.
    pub fn add_action(&mut self, phase: ActionPhase, action: ActionHandle) -> Result<()> {
        let case_id = self.id.clone();
        let list = self.list_mut(phase);
        if list.iter().any(|existing| Arc::ptr_eq(existing, &action)) {
            return Err(ProvaError::invalid(format!(
                "Action is already part of the {phase} actions of test case '{case_id}'"
            )));
        }
        action.lock().state_mut().set_parent(&case_id)?;
        trace!("Add {} action to test case '{}'", phase, case_id);
        list.push(action);
        Ok(())
    }

    pub fn set_up_actions(&self) -> &[ActionHandle] {
        &self.set_up_actions
    }

    pub fn test_actions(&self) -> &[ActionHandle] {
        &self.test_actions
    }

    pub fn tear_down_actions(&self) -> &[ActionHandle] {
        &self.tear_down_actions
    }

    pub fn actions(&self, phase: ActionPhase) -> &[ActionHandle] {
        match phase {
            ActionPhase::SetUp => &self.set_up_actions,
            ActionPhase::Test => &self.test_actions,
            ActionPhase::TearDown => &self.tear_down_actions,
        }
    }

    fn list_mut(&mut self, phase: ActionPhase) -> &mut Vec<ActionHandle> {
        match phase {
            ActionPhase::SetUp => &mut self.set_up_actions,
            ActionPhase::Test => &mut self.test_actions,
            ActionPhase::TearDown => &mut self.tear_down_actions,
        }
    }

    pub fn number_of_actions(&self) -> usize {
        self.set_up_actions.len() + self.test_actions.len() + self.tear_down_actions.len()
    }

    pub fn set_header(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = require_trimmed(key, "Header key")?;
        self.headers.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn has_header(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// # Errors
    /// `NotFound` when no header `key` exists.
    pub fn header(&self, key: &str) -> Result<&str> {
        self.headers
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ProvaError::not_found("Header", key))
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn set_variable(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = require_trimmed(key, "Variable key")?;
        self.variables.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn has_variable(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// # Errors
    /// `NotFound` when no variable `key` exists.
    pub fn variable(&self, key: &str) -> Result<&str> {
        self.variables
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ProvaError::not_found("Variable", key))
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Name of the input plug-in that materialised this case.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: &str) {
        self.source = Some(source.to_string());
    }

    /// Whether the action lists have been populated by the input plug-in.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("variables", &self.variables)
            .field("set_up_actions", &self.set_up_actions.len())
            .field("test_actions", &self.test_actions.len())
            .field("tear_down_actions", &self.tear_down_actions.len())
            .finish()
    }
}
