//! # Test Status Module / 测试状态模块
//!
//! The finite outcome of a test action, test case or test suite.
//!
//! 测试动作、测试用例或测试套件的有限结果集合。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{ProvaError, Result};

/// Outcome of an action, case or suite.
///
/// There is no transition table: any value may replace any other.
///
/// 没有状态转换表：任何值都可以替换任何其他值。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    /// Not executed (yet). / 尚未执行。
    #[default]
    NotRun,
    /// Could not be executed, e.g. an invalid action. / 无法执行。
    Blocked,
    Passed,
    Failed,
}

impl TestStatus {
    pub const ALL: [TestStatus; 4] = [
        TestStatus::NotRun,
        TestStatus::Blocked,
        TestStatus::Passed,
        TestStatus::Failed,
    ];

    /// Symbol name, as used by [`TestStatus::lookup`].
    pub fn symbol(self) -> &'static str {
        match self {
            TestStatus::NotRun => "NOTRUN",
            TestStatus::Blocked => "BLOCKED",
            TestStatus::Passed => "PASSED",
            TestStatus::Failed => "FAILED",
        }
    }

    /// Human readable name. / 可读名称。
    pub fn name(self) -> &'static str {
        match self {
            TestStatus::NotRun => "NotRun",
            TestStatus::Blocked => "Blocked",
            TestStatus::Passed => "Passed",
            TestStatus::Failed => "Failed",
        }
    }

    /// Case-insensitive lookup against the symbol name.
    ///
    /// # Errors
    /// `InvalidArgument` when no symbol matches.
    pub fn lookup(name: &str) -> Result<TestStatus> {
        tracing::trace!("Lookup for test status with value '{}'", name);
        TestStatus::ALL
            .into_iter()
            .find(|status| status.symbol().eq_ignore_ascii_case(name))
            .ok_or_else(|| ProvaError::invalid(format!("{name} not found in TestStatus")))
    }

    /// Merges two observed outcomes into the worst one:
    /// `Failed` > `Blocked` > `NotRun` > `Passed`.
    ///
    /// `NotRun` outranks `Passed` so an aggregate only reads `Passed` once every
    /// contribution is terminal.
    pub fn combine(self, other: TestStatus) -> TestStatus {
        fn weight(status: TestStatus) -> u8 {
            match status {
                TestStatus::Passed => 0,
                TestStatus::NotRun => 1,
                TestStatus::Blocked => 2,
                TestStatus::Failed => 3,
            }
        }
        if weight(other) > weight(self) { other } else { self }
    }

    /// Aggregates a set of outcomes. An empty set is `Passed`.
    pub fn aggregate<I: IntoIterator<Item = TestStatus>>(statuses: I) -> TestStatus {
        statuses
            .into_iter()
            .fold(TestStatus::Passed, TestStatus::combine)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestStatus {
    type Err = ProvaError;

    fn from_str(s: &str) -> Result<Self> {
        TestStatus::lookup(s)
    }
}
