//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Prova,
//! including command execution, property file loading, logging and i18n support.
//!
//! 此模块为 Prova 提供基础设施服务，
//! 包括命令执行、属性文件加载、日志和国际化支持。

pub mod command;
pub mod config;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
