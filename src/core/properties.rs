//! # Property Store Module / 属性存储模块
//!
//! A flat `key -> value` map holding every setting of one run. Sources are merged
//! in increasing precedence: system properties, packaged defaults, the project
//! file, the user file and finally command line overrides. Later merges win.
//!
//! 保存一次运行所有设置的扁平键值映射。按优先级递增合并：系统属性、内置默认值、
//! 项目文件、用户文件，最后是命令行覆盖。

use std::collections::BTreeMap;
use std::path::{Path, MAIN_SEPARATOR};
use tracing::{debug, trace, warn};

use crate::core::error::{require_trimmed, ProvaError, Result};
use crate::infra::config;

/// Well-known property keys. / 已知的属性键。
pub mod keys {
    /// Root directory of the Prova installation or workspace.
    pub const ROOT_DIR: &str = "prova.root.dir";
    /// Name of the project; becomes the id of the root suite.
    pub const PROJECT: &str = "prova.project";
    /// Target environment label (e.g. `tst`, `acc`).
    pub const ENV: &str = "prova.env";
    pub const CONF_DIR: &str = "prova.conf.dir";
    /// User supplied property file, merged above the project file.
    pub const CONF_FILE_USER: &str = "prova.conf.file.user";
    /// Directory the input plug-ins read test cases from.
    pub const TESTS_ROOT: &str = "prova.tests.root";
    /// Comma separated labels; empty means all test cases.
    pub const TESTS_FILTERS: &str = "prova.tests.filters";
    /// `false` validates actions without executing them.
    pub const TESTS_EXECUTE: &str = "prova.tests.execute";
    /// Per action timeout in milliseconds; `0` disables it.
    pub const TIMEOUT: &str = "prova.timeout";
    pub const LOG_LEVEL: &str = "prova.log.level";
    pub const LANGUAGE: &str = "prova.language";
    /// Directory reporting plug-ins write their artifacts to.
    pub const REPORTING_DIR: &str = "prova.plugins.reporting.dir";
    /// File name of the HTML report inside [`REPORTING_DIR`].
    pub const REPORTING_FILE: &str = "prova.plugins.reporting.file";
}

/// Packaged defaults, embedded at compile time.
pub const PACKAGED_DEFAULTS: &str = include_str!("../../config/prova-defaults.toml");

/// Flat configuration map. / 扁平配置映射。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    properties: BTreeMap<String, String>,
}

impl PropertyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// System properties overlaid by the packaged defaults.
    ///
    /// # Errors
    /// Fails when the packaged defaults cannot be parsed.
    pub fn load_defaults() -> Result<Self> {
        let mut store = Self::new();
        store.extend(system_properties());
        debug!("Loaded {} properties from system", store.len());
        let before = store.len();
        store.merge_toml_str(PACKAGED_DEFAULTS)?;
        debug!(
            "Loaded packaged defaults ({} properties in total, {} new)",
            store.len(),
            store.len() - before
        );
        Ok(store)
    }

    /// Sets `key` (trimmed) to `value`.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let key = require_trimmed(key, "Property key").inspect_err(|e| warn!("{}", e))?;
        let value = value.into();
        debug!("Set value of property with key '{}' to '{}'", key, value);
        self.properties.insert(key.to_string(), value);
        Ok(())
    }

    /// # Errors
    /// `NotFound` when the key does not exist.
    pub fn get(&self, key: &str) -> Result<&str> {
        trace!("Get value of property with key '{}'", key);
        self.properties
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ProvaError::not_found("Property", key))
    }

    /// Value of `key`, or `default` when it is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.properties.get(key).map_or(default, String::as_str)
    }

    /// Value of `key` interpreted as a boolean; absent or unparsable yields `default`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.properties.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "true" || v == "yes" || v == "1" => true,
            Some(v) if v == "false" || v == "no" || v == "0" => false,
            Some(v) => {
                warn!("Property '{}' is not a boolean ('{}'), using {}", key, v, default);
                default
            }
            None => default,
        }
    }

    /// Value of `key` interpreted as an unsigned number.
    ///
    /// # Errors
    /// `Config` when the value is present but not a number.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.properties.get(key) {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => Ok(None),
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|e| ProvaError::Config(format!("Property '{key}' = '{v}': {e}"))),
        }
    }

    /// Comma separated list, trimmed, empty entries dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.properties
            .get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// A copy of every property.
    pub fn all(&self) -> BTreeMap<String, String> {
        self.properties.clone()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Sets every pair; pairs with an empty key are skipped with a warning.
    pub fn extend<I, K, V>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in properties {
            if let Err(e) = self.set(key.as_ref(), value) {
                warn!("Skipping property: {}", e);
            }
        }
    }

    /// Overlays the TOML document `content`.
    pub fn merge_toml_str(&mut self, content: &str) -> Result<()> {
        let flat = config::flatten_toml_str(content)?;
        trace!("Merging {} properties", flat.len());
        self.extend(flat);
        Ok(())
    }

    /// Overlays the TOML file at `path`.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let flat = config::load_properties(path)?;
        debug!("Loaded {} properties from '{}'", flat.len(), path.display());
        self.extend(flat);
        Ok(())
    }

    /// Replaces `${key}` references to other properties, e.g. in
    /// `prova.tests.root = "${prova.root.dir}/tests"`. Unknown references stay as they are.
    pub fn resolve(&self, value: &str) -> String {
        shellexpand::env_with_context_no_errors(value, |name: &str| {
            self.properties.get(name).map(String::as_str)
        })
        .into_owned()
    }
}

/// Process environment plus the platform properties a test may rely on.
pub fn system_properties() -> BTreeMap<String, String> {
    let mut props: BTreeMap<String, String> = std::env::vars().collect();
    props.insert("os.name".to_string(), std::env::consts::OS.to_string());
    props.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
    props.insert("os.family".to_string(), std::env::consts::FAMILY.to_string());
    props.insert("file.separator".to_string(), MAIN_SEPARATOR.to_string());
    props.insert(
        "path.separator".to_string(),
        if cfg!(windows) { ";" } else { ":" }.to_string(),
    );
    props.insert(
        "line.separator".to_string(),
        if cfg!(windows) { "\r\n" } else { "\n" }.to_string(),
    );
    if let Ok(dir) = std::env::current_dir() {
        props.insert("user.dir".to_string(), dir.display().to_string());
    }
    if let Ok(home) = shellexpand::full("~") {
        props.insert("user.home".to_string(), home.into_owned());
    }
    if let Some(user) = std::env::var("USER")
        .ok()
        .or_else(|| std::env::var("USERNAME").ok())
    {
        props.insert("user.name".to_string(), user);
    }
    props
}
