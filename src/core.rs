//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Prova: the structural model
//! (suites, cases, actions, statuses), the property store, the plug-in
//! interfaces and the execution engine.
//!
//! 此模块包含 Prova 的核心功能：结构模型（套件、用例、动作、状态）、
//! 属性存储、插件接口和执行引擎。

pub mod action;
pub mod case;
pub mod error;
pub mod execution;
pub mod plugins;
pub mod properties;
pub mod status;
pub mod suite;

// Re-exports
pub use action::{ActionHandle, ActionState, TestAction};
pub use case::{ActionPhase, TestCase};
pub use error::{ProvaError, Result};
pub use execution::{Phase, Prova, RunHandle, RunReport};
pub use plugins::{InputPlugin, LogTarget, OutputPlugin, ReportingPlugin, TestType};
pub use properties::PropertyStore;
pub use status::TestStatus;
pub use suite::{SuiteId, SuiteTree, TestSuite};
