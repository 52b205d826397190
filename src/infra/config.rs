//! # Configuration File Module / 配置文件模块
//!
//! Reads TOML property files and flattens them into dotted keys, so that
//!
//! ```toml
//! [prova.log]
//! level = "debug"
//! ```
//!
//! becomes `prova.log.level = debug`.
//!
//! 读取 TOML 属性文件并将其扁平化为点分隔的键。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use toml::Value;

use crate::core::error::{ProvaError, Result};

/// Loads and flattens the TOML file at `path`.
///
/// # Errors
/// `Io` when the file cannot be read, `Toml` when it is not valid TOML.
pub fn load_properties(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        ProvaError::Config(format!("Failed to read property file '{}': {}", path.display(), e))
    })?;
    flatten_toml_str(&content)
}

/// Parses `content` and flattens it.
pub fn flatten_toml_str(content: &str) -> Result<BTreeMap<String, String>> {
    let table: toml::Table = toml::from_str(content)?;
    let mut flat = BTreeMap::new();
    for (key, value) in &table {
        flatten_value(key, value, &mut flat);
    }
    Ok(flat)
}

fn flatten_value(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Table(table) => {
            for (key, value) in table {
                flatten_value(&format!("{prefix}.{key}"), value, out);
            }
        }
        Value::Array(items) => {
            let joined = items.iter().map(value_text).collect::<Vec<_>>().join(",");
            out.insert(prefix.to_string(), joined);
        }
        other => {
            out.insert(prefix.to_string(), value_text(other));
        }
    }
}

/// Strings verbatim, everything else as its TOML text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
