//! # Test Suite Module / 测试套件模块
//!
//! Suites form a tree. Nodes live in a [`SuiteTree`] arena and refer to each
//! other by [`SuiteId`]: a node keeps the id of its parent and the ordered ids of
//! its children, so re-parenting and the cycle check are index lookups.
//!
//! 测试套件构成一棵树。节点保存在 [`SuiteTree`] 中，通过 [`SuiteId`] 相互引用：
//! 每个节点记录父节点和有序的子节点列表。
//!
//! ## Attachment rule / 挂载规则
//!
//! A suite may only be attached below another one when no suite id repeats along
//! the resulting root-to-leaf path and no cycle is formed. Rejected attachments
//! leave both trees untouched.
//!
//! 仅当挂载后从根到叶的路径上没有重复的套件标识且不形成环时才允许挂载；
//! 被拒绝的挂载不会修改任何一棵树。

use std::ops::Index;
use tracing::{debug, trace};

use crate::core::case::TestCase;
use crate::core::error::{require_trimmed, ProvaError, Result};
use crate::core::status::TestStatus;

/// Index of a suite inside its [`SuiteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuiteId(usize);

/// One node of the suite tree. / 套件树中的一个节点。
#[derive(Debug)]
pub struct TestSuite {
    id: String,
    parent: Option<SuiteId>,
    children: Vec<SuiteId>,
    cases: Vec<TestCase>,
    status: TestStatus,
}

impl TestSuite {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Aggregated outcome, written by the engine after the suite ran.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TestStatus) {
        debug!("Update status of test suite '{}' to '{}'", self.id, status);
        self.status = status;
    }

    /// Direct test cases, in insertion order.
    pub fn test_cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn test_cases_mut(&mut self) -> &mut [TestCase] {
        &mut self.cases
    }

    /// Direct child suites, in insertion order.
    pub fn children(&self) -> &[SuiteId] {
        &self.children
    }
}

/// Arena owning every suite of one run. / 拥有一次运行中所有套件的集合。
#[derive(Debug, Default)]
pub struct SuiteTree {
    nodes: Vec<TestSuite>,
}

impl SuiteTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of suites ever created in this arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates a parentless suite.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty or blank id.
    pub fn create_suite(&mut self, id: &str) -> Result<SuiteId> {
        let id = require_trimmed(id, "Test suite id")?;
        debug!("Create a new test suite with id '{}'", id);
        self.nodes.push(TestSuite {
            id: id.to_string(),
            parent: None,
            children: Vec::new(),
            cases: Vec::new(),
            status: TestStatus::NotRun,
        });
        Ok(SuiteId(self.nodes.len() - 1))
    }

    /// Creates a suite whose parent link points at `parent`, going through
    /// [`SuiteTree::set_parent`]. The parent's child list is not touched.
    pub fn create_suite_with_parent(&mut self, id: &str, parent: SuiteId) -> Result<SuiteId> {
        self.check(parent)?;
        let suite = self.create_suite(id)?;
        if let Err(err) = self.set_parent(suite, Some(parent)) {
            self.nodes.pop();
            return Err(err);
        }
        Ok(suite)
    }

    pub fn suite(&self, suite: SuiteId) -> Result<&TestSuite> {
        self.nodes
            .get(suite.0)
            .ok_or_else(|| ProvaError::not_found("Test suite", format!("#{}", suite.0)))
    }

    pub fn suite_mut(&mut self, suite: SuiteId) -> Result<&mut TestSuite> {
        self.nodes
            .get_mut(suite.0)
            .ok_or_else(|| ProvaError::not_found("Test suite", format!("#{}", suite.0)))
    }

    fn check(&self, suite: SuiteId) -> Result<()> {
        self.suite(suite).map(|_| ())
    }

    pub fn id(&self, suite: SuiteId) -> &str {
        &self[suite].id
    }

    /// Sets (or clears) the parent link of `suite`.
    ///
    /// If `suite` was listed as a child of its previous parent it is detached
    /// from that list; the new parent only gains the back-reference.
    ///
    /// # Errors
    /// `InvalidArgument` when the link would repeat an id along the path or
    /// close a cycle; nothing changes in that case.
    pub fn set_parent(&mut self, suite: SuiteId, parent: Option<SuiteId>) -> Result<()> {
        self.check(suite)?;
        trace!(
            "Set the parent of test suite '{}' to ({})",
            self.id(suite),
            parent.map_or("none", |p| self.nodes.get(p.0).map_or("?", |n| n.id.as_str()))
        );
        if let Some(parent) = parent {
            self.check(parent)?;
            self.ensure_attachable(suite, parent)?;
        }
        self.detach(suite);
        self.nodes[suite.0].parent = parent;
        Ok(())
    }

    pub fn parent(&self, suite: SuiteId) -> Option<SuiteId> {
        self[suite].parent
    }

    pub fn has_parent(&self, suite: SuiteId) -> bool {
        self[suite].parent.is_some()
    }

    /// Follows parent links up to the suite without a parent.
    /// A parentless suite is its own root.
    pub fn root_parent(&self, suite: SuiteId) -> SuiteId {
        let mut current = suite;
        // Bounded by the arena size; attachment checks keep the chain acyclic.
        for _ in 0..self.nodes.len() {
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        trace!("Root parent of '{}': '{}'", self.id(suite), self.id(current));
        current
    }

    /// Attaches `child` as the last direct child of `this`.
    ///
    /// The child map insert and the parent link succeed together or not at all.
    ///
    /// # Errors
    /// `InvalidArgument` when `child` (or the tree it hangs in) already belongs to
    /// the tree of `this`, or when the attachment would close a cycle.
    pub fn add_test_suite(&mut self, this: SuiteId, child: SuiteId) -> Result<()> {
        self.check(this)?;
        self.check(child)?;
        trace!("Add test suite '{}' to test suite '{}'", self.id(child), self.id(this));

        let this_root = self.root_parent(this);
        let child_root = self.root_parent(child);
        if self.has_test_suite(this_root, self.id(child_root), true)
            || self.has_test_suite(this_root, self.id(child), true)
        {
            debug!(
                "Test suite '{}' is already a member of test suite '{}'",
                self.id(child),
                self.id(this)
            );
            return Err(ProvaError::invalid(format!(
                "TestSuite {} is already a member of this testsuite.",
                self.id(child)
            )));
        }
        self.ensure_attachable(child, this)?;

        self.detach(child);
        self.nodes[this.0].children.push(child);
        self.nodes[child.0].parent = Some(this);
        Ok(())
    }

    /// Rejects linking `suite` below `parent` when the id of `suite` already
    /// appears in the tree rooted at `parent`'s root, or when `parent` or one of
    /// its ancestors is found inside `suite` (which covers real cycles).
    fn ensure_attachable(&self, suite: SuiteId, parent: SuiteId) -> Result<()> {
        let id = self.id(suite);
        let root = self.root_parent(parent);
        if self.has_test_suite(root, id, true) {
            debug!("Test suite '{}' already exists in the tree of '{}'", id, self.id(root));
            return Err(ProvaError::invalid(format!(
                "Test suite '{id}' already exists in the tree of '{}'",
                self.id(root)
            )));
        }

        let mut ancestor = Some(parent);
        let mut steps = 0;
        while let Some(current) = ancestor {
            if self.has_test_suite(suite, self.id(current), true) {
                debug!(
                    "Attaching '{}' below '{}' would create a loop",
                    id,
                    self.id(parent)
                );
                return Err(ProvaError::invalid(format!(
                    "Attaching test suite '{id}' below '{}' would create a loop",
                    self.id(parent)
                )));
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            ancestor = self.nodes[current.0].parent;
        }
        Ok(())
    }

    fn detach(&mut self, suite: SuiteId) {
        if let Some(old) = self.nodes[suite.0].parent {
            self.nodes[old.0].children.retain(|&c| c != suite);
        }
    }

    /// Number of direct child suites, plus all deeper ones when `recursive`.
    pub fn number_of_test_suites(&self, suite: SuiteId, recursive: bool) -> usize {
        let node = &self[suite];
        let mut count = node.children.len();
        if recursive {
            count += node
                .children
                .iter()
                .map(|&child| self.number_of_test_suites(child, true))
                .sum::<usize>();
        }
        count
    }

    /// True when `id` is the id of `suite` itself or of a direct child; with
    /// `recursive` every descendant is searched as well.
    pub fn has_test_suite(&self, suite: SuiteId, id: &str, recursive: bool) -> bool {
        let node = &self[suite];
        if node.id == id {
            return true;
        }
        node.children.iter().any(|&child| {
            self.nodes[child.0].id == id || (recursive && self.has_test_suite(child, id, true))
        })
    }

    /// Looks up a direct child suite by id. Deeper suites are not searched.
    ///
    /// # Errors
    /// `NotFound` when no direct child has that id.
    pub fn get_test_suite(&self, suite: SuiteId, id: &str) -> Result<SuiteId> {
        self[suite]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].id == id)
            .ok_or_else(|| {
                debug!("Test suite '{}' not found in '{}'", id, self.id(suite));
                ProvaError::not_found("Test suite", id)
            })
    }

    /// Direct child suites of `suite`, in insertion order.
    pub fn test_suites(&self, suite: SuiteId) -> &[SuiteId] {
        &self[suite].children
    }

    /// Adds a test case to `suite`.
    ///
    /// # Errors
    /// `InvalidArgument` when a direct test case with the same id exists.
    pub fn add_test_case(&mut self, suite: SuiteId, case: TestCase) -> Result<()> {
        self.check(suite)?;
        trace!("Add test case '{}' to test suite '{}'", case.id(), self.id(suite));
        if self.has_test_case(suite, case.id(), false) {
            return Err(ProvaError::invalid(format!(
                "TestCase {} is already a member of this testsuite.",
                case.id()
            )));
        }
        self.nodes[suite.0].cases.push(case);
        Ok(())
    }

    pub fn number_of_test_cases(&self, suite: SuiteId, recursive: bool) -> usize {
        let node = &self[suite];
        let mut count = node.cases.len();
        if recursive {
            count += node
                .children
                .iter()
                .map(|&child| self.number_of_test_cases(child, true))
                .sum::<usize>();
        }
        count
    }

    pub fn has_test_case(&self, suite: SuiteId, id: &str, recursive: bool) -> bool {
        let node = &self[suite];
        node.cases.iter().any(|case| case.id() == id)
            || (recursive
                && node
                    .children
                    .iter()
                    .any(|&child| self.has_test_case(child, id, true)))
    }

    /// Local lookup of a test case.
    ///
    /// # Errors
    /// `NotFound` when `suite` has no direct test case `id`.
    pub fn get_test_case(&self, suite: SuiteId, id: &str) -> Result<&TestCase> {
        self[suite]
            .cases
            .iter()
            .find(|case| case.id() == id)
            .ok_or_else(|| ProvaError::not_found("Test case", id))
    }

    pub fn get_test_case_mut(&mut self, suite: SuiteId, id: &str) -> Result<&mut TestCase> {
        self.check(suite)?;
        self.nodes[suite.0]
            .cases
            .iter_mut()
            .find(|case| case.id() == id)
            .ok_or_else(|| ProvaError::not_found("Test case", id))
    }

    /// Suites of the tree below `root` (inclusive) in depth-first pre-order.
    pub fn descendants(&self, root: SuiteId) -> Vec<SuiteId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self[current].children.iter().rev().copied());
        }
        order
    }

    /// Slash separated ids from the root down to `suite`.
    pub fn path(&self, suite: SuiteId) -> String {
        let mut parts = vec![self.id(suite)];
        let mut current = suite;
        for _ in 0..self.nodes.len() {
            match self.nodes[current.0].parent {
                Some(parent) => {
                    parts.push(self.id(parent));
                    current = parent;
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join("/")
    }
}

impl Index<SuiteId> for SuiteTree {
    type Output = TestSuite;

    fn index(&self, suite: SuiteId) -> &TestSuite {
        &self.nodes[suite.0]
    }
}
