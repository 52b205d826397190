//! # Shell Output Plug-in / Shell 输出插件
//!
//! Serves the `shell` test type with two actions:
//!
//! | action         | attributes                                         | return variables      |
//! |----------------|----------------------------------------------------|-----------------------|
//! | `execute`      | `COMMAND`, `EXPECTED_EXIT_CODE` (0), `WORKDIR`     | `EXIT_CODE`, `OUTPUT` |
//! | `set_variable` | `NAME`, `VALUE`                                    | `<NAME>`              |
//!
//! `${VAR}` references are expanded from the test case variables first and the
//! process environment second. Commands are split with shell quoting rules and
//! run without a shell; each run is supervised by `prova.timeout`.
//!
//! 为 `shell` 测试类型提供 `execute` 与 `set_variable` 两个动作。

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::core::action::{shared, ActionHandle, ActionState, TestAction};
use crate::core::case::TestCase;
use crate::core::plugins::{OutputPlugin, TestType};
use crate::core::properties::{keys, PropertyStore};
use crate::core::status::TestStatus;
use crate::infra::command::{build_command, run_supervised_blocking};

pub const COMMAND: &str = "COMMAND";
pub const EXPECTED_EXIT_CODE: &str = "EXPECTED_EXIT_CODE";
pub const WORKDIR: &str = "WORKDIR";
pub const NAME: &str = "NAME";
pub const VALUE: &str = "VALUE";
pub const EXIT_CODE: &str = "EXIT_CODE";
pub const OUTPUT: &str = "OUTPUT";

/// Expands `${VAR}` from `variables`, then from the environment. Unknown names stay.
fn expand(input: &str, variables: &BTreeMap<String, String>) -> String {
    shellexpand::env_with_context_no_errors(input, |name: &str| {
        variables
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    })
    .into_owned()
}

/// Directory receiving the command logs of one run.
///
/// Case ids repeat across suites, so every name handed out is remembered and a
/// taken `<case>-<action>.log` gets a `-2`, `-3`, ... suffix.
#[derive(Debug, Clone)]
pub struct ResultDir {
    dir: PathBuf,
    taken: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl ResultDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            taken: Arc::default(),
        }
    }

    fn claim(&self, case: &str, action: i64) -> PathBuf {
        let mut taken = self.taken.lock();
        let mut path = self.dir.join(format!("{case}-{action}.log"));
        let mut suffix = 2;
        while taken.contains(&path) {
            path = self.dir.join(format!("{case}-{action}-{suffix}.log"));
            suffix += 1;
        }
        taken.insert(path.clone());
        path
    }
}

/// Runs one command and compares its exit code.
pub struct ShellExecute {
    state: ActionState,
    variables: BTreeMap<String, String>,
    timeout: Option<Duration>,
    result_dir: Option<ResultDir>,
}

impl ShellExecute {
    pub fn new(id: i64, timeout: Option<Duration>, result_dir: Option<ResultDir>) -> Result<Self> {
        Ok(Self {
            state: ActionState::new(id)?,
            variables: BTreeMap::new(),
            timeout,
            result_dir,
        })
    }

    fn expected_exit_code(&self) -> Result<i32> {
        match self.state.attribute(EXPECTED_EXIT_CODE) {
            Ok(code) => code
                .trim()
                .parse::<i32>()
                .with_context(|| format!("Invalid {EXPECTED_EXIT_CODE} '{code}'")),
            Err(_) => Ok(0),
        }
    }

    fn run(&mut self) -> Result<TestStatus> {
        let command = expand(self.state.attribute(COMMAND)?, &self.variables);
        let args = shlex::split(&command)
            .ok_or_else(|| anyhow!("Failed to parse command: {}", command))?;
        let workdir = self
            .state
            .attribute(WORKDIR)
            .ok()
            .map(|dir| PathBuf::from(expand(dir, &self.variables)));
        let expected = self.expected_exit_code()?;

        debug!("Action {} runs '{}'", self.state.id(), command);
        let cmd = build_command(&args, workdir.as_deref())
            .with_context(|| format!("Failed to build command '{command}'"))?;
        let outcome = run_supervised_blocking(cmd, self.timeout)
            .with_context(|| format!("Failed to execute command '{command}'"))?;

        self.write_result_file(&command, &outcome.output);
        if outcome.timed_out {
            bail!(
                "Command '{}' timed out after {} ms",
                command,
                self.timeout.map_or(0, |t| t.as_millis())
            );
        }

        let exit_code = outcome
            .exit_code
            .ok_or_else(|| anyhow!("Command '{}' was terminated by a signal", command))?;
        self.state.set_return_variable(EXIT_CODE, exit_code.to_string())?;
        self.state
            .set_return_variable(OUTPUT, outcome.output.trim_end().to_string())?;

        if exit_code != expected {
            bail!(
                "Command '{}' exited with {} (expected {})",
                command,
                exit_code,
                expected
            );
        }
        Ok(TestStatus::Passed)
    }

    /// Keeps the command output next to the reports when the directory exists.
    fn write_result_file(&mut self, command: &str, output: &str) {
        let Some(dir) = self.result_dir.as_ref().filter(|d| d.dir.is_dir()) else {
            return;
        };
        let case = self.state.parent().unwrap_or("action");
        let path = dir.claim(case, self.state.id());
        match fs::write(&path, format!("$ {command}\n{output}")) {
            Ok(()) => self.state.set_result_file(Some(path)),
            Err(e) => debug!("Cannot write result file '{}': {}", path.display(), e),
        }
    }
}

impl TestAction for ShellExecute {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn execute(&mut self) -> TestStatus {
        match self.run() {
            Ok(status) => status,
            Err(e) => self.state.fail(e),
        }
    }

    fn is_valid(&self) -> bool {
        let has_command = self
            .state
            .attribute(COMMAND)
            .is_ok_and(|c| !c.trim().is_empty());
        has_command && self.expected_exit_code().is_ok()
    }

    fn describe(&self) -> String {
        format!(
            "EXECUTE '{}'",
            self.state.attribute(COMMAND).unwrap_or_default()
        )
    }

    fn bind_variables(&mut self, variables: &BTreeMap<String, String>) {
        self.variables = variables.clone();
    }
}

/// Publishes a (possibly expanded) value as a case variable.
pub struct SetVariable {
    state: ActionState,
    variables: BTreeMap<String, String>,
}

impl SetVariable {
    pub fn new(id: i64) -> Result<Self> {
        Ok(Self {
            state: ActionState::new(id)?,
            variables: BTreeMap::new(),
        })
    }
}

impl TestAction for SetVariable {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn execute(&mut self) -> TestStatus {
        let result = (|| -> Result<()> {
            let name = self.state.attribute(NAME)?.to_string();
            let value = expand(self.state.attribute(VALUE)?, &self.variables);
            self.state.set_return_variable(&name, value)?;
            Ok(())
        })();
        match result {
            Ok(()) => TestStatus::Passed,
            Err(e) => self.state.fail(e),
        }
    }

    fn is_valid(&self) -> bool {
        self.state.attribute(NAME).is_ok_and(|n| !n.trim().is_empty())
            && self.state.has_attribute(VALUE)
    }

    fn describe(&self) -> String {
        format!(
            "SET {} = '{}'",
            self.state.attribute(NAME).unwrap_or_default(),
            self.state.attribute(VALUE).unwrap_or_default()
        )
    }

    fn bind_variables(&mut self, variables: &BTreeMap<String, String>) {
        self.variables = variables.clone();
    }
}

/// Output plug-in for shell commands. / Shell 命令输出插件。
#[derive(Debug, Default)]
pub struct ShellOutput {
    timeout: Option<Duration>,
    result_dir: Option<ResultDir>,
    active_cases: Vec<String>,
}

impl ShellOutput {
    pub const NAME: &'static str = "shell";

    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputPlugin for ShellOutput {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, properties: &PropertyStore) -> Result<()> {
        self.timeout = properties
            .get_u64(keys::TIMEOUT)?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        self.result_dir = properties
            .get(keys::REPORTING_DIR)
            .ok()
            .map(|dir| ResultDir::new(properties.resolve(dir)));
        debug!(
            "Shell output initialised (timeout: {:?}, results: {:?})",
            self.timeout,
            self.result_dir.as_ref().map(|d| &d.dir)
        );
        Ok(())
    }

    fn supported_types(&self) -> Vec<TestType> {
        TestType::new(Self::NAME).into_iter().collect()
    }

    fn set_up(&mut self, case: &TestCase) -> Result<()> {
        trace!("Shell session for '{}' opened", case.id());
        self.active_cases.push(case.id().to_string());
        Ok(())
    }

    fn tear_down(&mut self, case: &TestCase) -> Result<()> {
        trace!("Shell session for '{}' closed", case.id());
        self.active_cases.retain(|id| id != case.id());
        Ok(())
    }

    fn resolve_action(&mut self, name: &str, id: i64) -> Result<ActionHandle> {
        match name.trim().to_ascii_lowercase().as_str() {
            "execute" => Ok(shared(ShellExecute::new(
                id,
                self.timeout,
                self.result_dir.clone(),
            )?)),
            "set_variable" => Ok(shared(SetVariable::new(id)?)),
            other => bail!("Unknown shell action '{}'", other),
        }
    }

    fn shut_down(&mut self) -> Result<()> {
        if !self.active_cases.is_empty() {
            debug!("Shell sessions still open: {:?}", self.active_cases);
            self.active_cases.clear();
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::action::run_action;
    use tempfile::tempdir;

    fn execute(command: &str) -> ShellExecute {
        let mut action = ShellExecute::new(0, None, None).unwrap();
        action.state_mut().set_attribute(COMMAND, command).unwrap();
        action
    }

    #[test]
    fn test_execute_passes_on_expected_exit_code() {
        let mut action = execute("echo hello");
        assert_eq!(run_action(&mut action), TestStatus::Passed);
        let vars = action.state().return_variables();
        assert_eq!(vars.get(EXIT_CODE).unwrap(), "0");
        assert_eq!(vars.get(OUTPUT).unwrap(), "hello");
    }

    #[test]
    fn test_execute_fails_on_other_exit_code() {
        let mut action = execute("sh -c 'exit 2'");
        assert_eq!(run_action(&mut action), TestStatus::Failed);
        assert!(action.state().last_error().unwrap().to_string().contains("exited with 2"));

        let mut action = execute("sh -c 'exit 2'");
        action.state_mut().set_attribute(EXPECTED_EXIT_CODE, "2").unwrap();
        assert_eq!(run_action(&mut action), TestStatus::Passed);
    }

    #[test]
    fn test_missing_command_is_blocked() {
        let mut action = ShellExecute::new(1, None, None).unwrap();
        assert!(!action.is_valid());
        assert_eq!(run_action(&mut action), TestStatus::Blocked);

        let mut action = execute("true");
        action.state_mut().set_attribute(EXPECTED_EXIT_CODE, "zero").unwrap();
        assert!(!action.is_valid());
    }

    #[test]
    fn test_variables_are_expanded() {
        let mut action = execute("echo ${GREETING}");
        let mut vars = BTreeMap::new();
        vars.insert("GREETING".to_string(), "hi there".to_string());
        action.bind_variables(&vars);
        assert_eq!(run_action(&mut action), TestStatus::Passed);
        assert_eq!(action.state().return_variables().get(OUTPUT).unwrap(), "hi there");
    }

    #[test]
    fn test_timeout_fails_the_action() {
        let mut action = ShellExecute::new(0, Some(Duration::from_millis(100)), None).unwrap();
        action.state_mut().set_attribute(COMMAND, "sleep 5").unwrap();
        assert_eq!(run_action(&mut action), TestStatus::Failed);
        assert!(action.state().last_error().unwrap().to_string().contains("timed out"));
    }

    #[test]
    fn test_result_file_is_written() {
        let dir = tempdir().unwrap();
        let mut action = ShellExecute::new(3, None, Some(ResultDir::new(dir.path()))).unwrap();
        action.state_mut().set_attribute(COMMAND, "echo logged").unwrap();
        action.state_mut().set_parent("tc1").unwrap();
        assert_eq!(run_action(&mut action), TestStatus::Passed);
        let file = action.state().result_file().unwrap().to_path_buf();
        assert_eq!(file, dir.path().join("tc1-3.log"));
        assert!(fs::read_to_string(file).unwrap().contains("logged"));
    }

    #[test]
    fn test_same_case_id_in_two_suites_keeps_both_logs() {
        let dir = tempdir().unwrap();
        let results = ResultDir::new(dir.path());
        let mut files = Vec::new();
        for word in ["login", "admin"] {
            let mut action = ShellExecute::new(1, None, Some(results.clone())).unwrap();
            action.state_mut().set_attribute(COMMAND, format!("echo {word}")).unwrap();
            action.state_mut().set_parent("x").unwrap();
            assert_eq!(run_action(&mut action), TestStatus::Passed);
            files.push(action.state().result_file().unwrap().to_path_buf());
        }
        assert_eq!(files, [dir.path().join("x-1.log"), dir.path().join("x-1-2.log")]);
        assert!(fs::read_to_string(&files[0]).unwrap().contains("login"));
        assert!(fs::read_to_string(&files[1]).unwrap().contains("admin"));
    }

    #[test]
    fn test_timed_out_command_keeps_partial_output() {
        let dir = tempdir().unwrap();
        let mut action = ShellExecute::new(
            0,
            Some(Duration::from_millis(500)),
            Some(ResultDir::new(dir.path())),
        )
        .unwrap();
        action
            .state_mut()
            .set_attribute(COMMAND, "sh -c 'echo started; sleep 5'")
            .unwrap();
        action.state_mut().set_parent("slow").unwrap();
        assert_eq!(run_action(&mut action), TestStatus::Failed);
        let log = fs::read_to_string(dir.path().join("slow-0.log")).unwrap();
        assert!(log.contains("started"));
    }

    #[test]
    fn test_set_variable() {
        let mut action = SetVariable::new(0).unwrap();
        assert!(!action.is_valid());
        action.state_mut().set_attribute(NAME, "TARGET").unwrap();
        action.state_mut().set_attribute(VALUE, "${HOST}:8080").unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("HOST".to_string(), "localhost".to_string());
        action.bind_variables(&vars);
        assert_eq!(run_action(&mut action), TestStatus::Passed);
        assert_eq!(
            action.state().return_variables().get("TARGET").unwrap(),
            "localhost:8080"
        );
    }

    #[test]
    fn test_resolve_action() {
        let mut output = ShellOutput::new();
        assert!(output.resolve_action("Execute", 0).is_ok());
        assert!(output.resolve_action("set_variable", 1).is_ok());
        assert!(output.resolve_action("click", 2).is_err());
        assert_eq!(output.supported_types(), vec![TestType::new("shell").unwrap()]);
    }
}
