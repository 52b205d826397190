//! # Error Module / 错误模块
//!
//! Error kinds shared by the structural model and the engine.
//! Validation failures are reported synchronously at the call site and are
//! never retried; lookups of absent entries have their own kind.
//!
//! 结构模型与引擎共享的错误类型。

use thiserror::Error;

/// Result type alias using [`ProvaError`].
pub type Result<T> = std::result::Result<T, ProvaError>;

/// Errors raised by the Prova core.
#[derive(Error, Debug)]
pub enum ProvaError {
    /// Null/empty identifiers, duplicate insertion, cyclic attachment and other
    /// rejected arguments.
    /// 无效参数：空标识符、重复插入、循环挂载等。
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A `get` on a key or id that does not exist.
    /// 查找的键或标识符不存在。
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A lifecycle phase was requested out of order.
    #[error("Cannot run phase '{requested}' while the runner is in phase '{current}'")]
    InvalidState { current: String, requested: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// A plug-in reported a failure from one of its lifecycle calls.
    #[error("Plug-in '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// The background run task panicked or was aborted.
    #[error("Run worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProvaError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Wraps an application-level plug-in error, keeping the whole context chain.
    pub fn plugin(plugin: &str, error: anyhow::Error) -> Self {
        Self::Plugin {
            plugin: plugin.to_string(),
            message: format!("{error:#}"),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Trims `value` and rejects it when nothing is left.
/// Used for every identifier and map key in the model.
pub(crate) fn require_trimmed<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProvaError::invalid(format!(
            "{what} must not be empty (got '{value}')"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_trimmed() {
        assert_eq!(require_trimmed("  key ", "Key").unwrap(), "key");
        assert!(require_trimmed("   ", "Key").unwrap_err().is_invalid_argument());
        assert!(require_trimmed("", "Key").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_plugin_error_keeps_context() {
        let err = anyhow::anyhow!("root cause").context("while loading");
        let wrapped = ProvaError::plugin("toml-dir", err);
        let text = wrapped.to_string();
        assert!(text.contains("toml-dir"));
        assert!(text.contains("while loading"));
        assert!(text.contains("root cause"));
    }
}
