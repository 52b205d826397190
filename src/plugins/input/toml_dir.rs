//! # TOML Directory Input / TOML 目录输入插件
//!
//! Reads test cases from a directory tree:
//!
//! - the test root is the content of the root suite,
//! - every sub-directory becomes a child suite named after the directory,
//! - every `*.toml` file becomes a test case,
//! - `_setup.toml` and `_teardown.toml` in the test root are the project level
//!   setup and teardown cases.
//!
//! A test case file looks like this:
//!
//! ```toml
//! id = "login"            # optional, defaults to the file stem
//! type = "shell"          # default test type of the actions
//! labels = ["smoke"]
//!
//! [headers]
//! author = "qa"
//!
//! [variables]
//! USER = "admin"
//!
//! [[setup]]
//! action = "set_variable"
//! NAME = "GREETING"
//! VALUE = "hello ${USER}"
//!
//! [[test]]
//! action = "execute"
//! COMMAND = "echo ${GREETING}"
//! ```
//!
//! Every key of an action table other than `action` and `type` becomes an
//! attribute of the action. Actions are only created when the engine loads the
//! test case.
//!
//! 从目录树读取测试用例：子目录成为子套件，每个 `*.toml` 文件成为一个测试用例。
//! 动作只在引擎加载测试用例时才会创建。

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::core::action::TestAction;
use crate::core::case::{ActionPhase, TestCase};
use crate::core::plugins::{ActionResolver, InputPlugin, TestType};
use crate::core::properties::PropertyStore;
use crate::core::suite::{SuiteId, SuiteTree};
use crate::infra::config::value_text;

/// Header holding the path of the file a test case was read from.
pub const FILE_HEADER: &str = "FILE";
/// Header holding the comma separated labels of a test case.
pub const LABELS_HEADER: &str = "LABELS";

const PROJECT_SET_UP: &str = "_setup.toml";
const PROJECT_TEAR_DOWN: &str = "_teardown.toml";
const DEFAULT_TYPE: &str = "shell";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseFile {
    id: Option<String>,
    #[serde(rename = "type")]
    test_type: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    headers: BTreeMap<String, toml::Value>,
    #[serde(default)]
    variables: BTreeMap<String, toml::Value>,
    #[serde(default)]
    setup: Vec<ActionEntry>,
    #[serde(default)]
    test: Vec<ActionEntry>,
    #[serde(default)]
    teardown: Vec<ActionEntry>,
}

#[derive(Debug, Deserialize)]
struct ActionEntry {
    action: String,
    #[serde(rename = "type")]
    test_type: Option<String>,
    #[serde(flatten)]
    attributes: BTreeMap<String, toml::Value>,
}

impl CaseFile {
    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read test case file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse test case file '{}'", path.display()))
    }

    fn entries(&self, phase: ActionPhase) -> &[ActionEntry] {
        match phase {
            ActionPhase::SetUp => &self.setup,
            ActionPhase::Test => &self.test,
            ActionPhase::TearDown => &self.teardown,
        }
    }
}

/// Input plug-in reading TOML test case files. / 读取 TOML 测试用例文件的输入插件。
#[derive(Debug, Default)]
pub struct TomlDirInput {
    root: Option<PathBuf>,
    labels: Vec<String>,
    skipped: usize,
}

impl TomlDirInput {
    pub const NAME: &'static str = "toml-dir";

    pub fn new() -> Self {
        Self::default()
    }

    fn root(&self) -> Result<&Path> {
        self.root
            .as_deref()
            .context("The test root has not been set")
    }

    /// Whether a case with `labels` passes the active filter.
    fn selected(&self, labels: &[String]) -> bool {
        self.labels.is_empty()
            || labels
                .iter()
                .any(|l| self.labels.iter().any(|f| f.eq_ignore_ascii_case(l.trim())))
    }

    /// Builds an unloaded test case from the file at `path`.
    fn read_case(&self, path: &Path) -> Result<(TestCase, Vec<String>)> {
        let file = CaseFile::read(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = file.id.as_deref().unwrap_or(&stem);
        let mut case = TestCase::new(id)
            .with_context(|| format!("Invalid test case id in '{}'", path.display()))?;
        case.set_header(FILE_HEADER, path.display().to_string())?;
        if !file.labels.is_empty() {
            case.set_header(LABELS_HEADER, file.labels.join(","))?;
        }
        for (key, value) in &file.headers {
            case.set_header(key, value_text(value))?;
        }
        for (key, value) in &file.variables {
            case.set_variable(key, value_text(value))?;
        }
        Ok((case, file.labels))
    }

    fn scan(&mut self, dir: &Path, tree: &mut SuiteTree, suite: SuiteId) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read test directory '{}'", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        let mut sub_dirs = Vec::new();
        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                sub_dirs.push((name, path));
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("toml")
                || name == PROJECT_SET_UP
                || name == PROJECT_TEAR_DOWN
            {
                continue;
            }

            let (case, labels) = self.read_case(&path)?;
            if !self.selected(&labels) {
                trace!("Skipping test case '{}' (labels {:?})", case.id(), labels);
                self.skipped += 1;
                continue;
            }
            trace!("Found test case '{}' in '{}'", case.id(), path.display());
            tree.add_test_case(suite, case)
                .with_context(|| format!("Cannot add test case from '{}'", path.display()))?;
        }

        // Cases first, then sub-suites, in name order.
        for (name, path) in sub_dirs {
            let child = tree.create_suite(&name)?;
            tree.add_test_suite(suite, child)
                .with_context(|| format!("Cannot add test suite '{}'", path.display()))?;
            self.scan(&path, tree, child)?;
        }
        Ok(())
    }

    fn project_case(&self, file_name: &str) -> Result<Option<TestCase>> {
        let path = self.root()?.join(file_name);
        if !path.is_file() {
            return Ok(None);
        }
        let (case, _) = self.read_case(&path)?;
        Ok(Some(case))
    }
}

impl InputPlugin for TomlDirInput {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _properties: &PropertyStore) -> Result<()> {
        debug!("Initialising input plug-in '{}'", Self::NAME);
        Ok(())
    }

    fn set_test_root(&mut self, path: &Path, project: &str) -> Result<PathBuf> {
        if !path.is_dir() {
            bail!(
                "Test root '{}' of project '{}' is not a directory",
                path.display(),
                project
            );
        }
        let resolved = fs::canonicalize(path)
            .with_context(|| format!("Failed to resolve test root '{}'", path.display()))?;
        self.root = Some(resolved.clone());
        Ok(resolved)
    }

    fn set_test_case_filter(&mut self, labels: &[String]) -> String {
        self.labels = labels
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if self.labels.is_empty() {
            "all test cases".to_string()
        } else {
            format!("labels: {}", self.labels.join(", "))
        }
    }

    fn set_up(&mut self, tree: &mut SuiteTree, root: SuiteId) -> Result<()> {
        let dir = self.root()?.to_path_buf();
        self.skipped = 0;
        self.scan(&dir, tree, root)?;
        if self.skipped > 0 {
            debug!("{} test cases did not match the label filter", self.skipped);
        }
        Ok(())
    }

    fn load_test_case(&mut self, case: &mut TestCase, resolver: &mut dyn ActionResolver) -> Result<()> {
        let path = PathBuf::from(case.header(FILE_HEADER)?);
        let file = CaseFile::read(&path)?;
        let default_type = file.test_type.as_deref().unwrap_or(DEFAULT_TYPE);

        let mut next_id: i64 = 0;
        for phase in ActionPhase::ORDER {
            for entry in file.entries(phase) {
                let test_type = TestType::new(entry.test_type.as_deref().unwrap_or(default_type))?;
                if !resolver.supports(&test_type) {
                    warn!(
                        "Test case '{}' uses test type '{}' without an output plug-in",
                        case.id(),
                        test_type
                    );
                }
                let action = resolver
                    .resolve(&test_type, &entry.action, next_id)
                    .with_context(|| {
                        format!("{} action #{} of '{}'", phase, next_id, path.display())
                    })?;
                {
                    let mut guard = action.lock();
                    for (key, value) in &entry.attributes {
                        TestAction::set_attribute(&mut *guard, key, &value_text(value))?;
                    }
                }
                case.add_action(phase, action)?;
                next_id += 1;
            }
        }
        Ok(())
    }

    fn project_set_up(&mut self) -> Result<Option<TestCase>> {
        self.project_case(PROJECT_SET_UP)
    }

    fn project_tear_down(&mut self) -> Result<Option<TestCase>> {
        self.project_case(PROJECT_TEAR_DOWN)
    }

    fn shut_down(&mut self) -> Result<()> {
        debug!("Shutting down input plug-in '{}'", Self::NAME);
        Ok(())
    }
}
