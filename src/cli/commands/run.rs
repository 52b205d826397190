//! # Run Command Module / 运行命令模块
//!
//! Builds the property store from the configuration sources, wires the
//! reference plug-ins into a [`Prova`] instance and runs it.
//!
//! 根据配置来源构建属性存储，将参考插件装配到 [`Prova`] 实例中并运行。

use anyhow::{Context, Result};
use colored::*;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    core::{
        execution::{Prova, RunReport},
        properties::{keys, PropertyStore},
        status::TestStatus,
    },
    infra::{
        logging::{init_logging, LogLevel},
        t,
    },
    plugins::{input::TomlDirInput, output::ShellOutput},
    reporting::{ConsoleReporter, HtmlReporter},
};

/// File name of the project property file inside the project directory.
pub const PROJECT_FILE: &str = "prova.toml";

/// Options of `prova run`, already parsed.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub project: Option<String>,
    pub config: Option<PathBuf>,
    pub env: Option<String>,
    pub filters: Option<String>,
    pub log_level: Option<String>,
    pub report_file: Option<String>,
    pub test_root: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub validate_only: bool,
    pub summary: Option<PathBuf>,
    pub project_dir: PathBuf,
    pub language: String,
}

/// Executes the run command and returns the status of the root suite.
pub async fn execute(options: RunOptions) -> Result<TestStatus> {
    let locale = options.language.clone();
    let properties = build_properties(&options)?;

    let level = LogLevel::lookup(properties.get_or(keys::LOG_LEVEL, "info"))
        .context(t!("invalid_log_level", locale = &locale).to_string())?;
    init_logging(level);

    let mut prova = Prova::with_properties(properties);
    prova.add_input_plugin(Box::new(TomlDirInput::new()))?;
    prova.add_output_plugin(Box::new(ShellOutput::new()))?;
    prova.add_reporting_plugin(Box::new(ConsoleReporter::new()))?;
    prova.add_reporting_plugin(Box::new(HtmlReporter::new()))?;

    let handle = prova.start();
    let signals = setup_signal_handler(handle.cancellation_token(), &locale);
    let result = handle.join().await;
    signals.abort();

    let report = result.context(t!("run_failed", locale = &locale).to_string())?;
    if let Some(path) = &options.summary {
        write_summary(&report, path)?;
        println!(
            "{}",
            t!("summary_written", locale = &locale, path = path.display()).dimmed()
        );
    }
    Ok(report.status)
}

/// Merges the configuration sources in increasing precedence: system
/// properties and packaged defaults, `<project>/prova.toml`, the environment
/// file `<conf dir>/<env>.toml`, the user file, command line overrides.
pub fn build_properties(options: &RunOptions) -> Result<PropertyStore> {
    let project_dir = fs::canonicalize(&options.project_dir).with_context(|| {
        t!(
            "project_dir_not_found",
            locale = &options.language,
            path = options.project_dir.display()
        )
        .to_string()
    })?;

    let mut properties = PropertyStore::load_defaults()?;
    properties.set(keys::ROOT_DIR, project_dir.display().to_string())?;

    let project_file = project_dir.join(PROJECT_FILE);
    if project_file.is_file() {
        properties.merge_file(&project_file)?;
    }

    if let Some(env) = &options.env {
        properties.set(keys::ENV, env.as_str())?;
    }
    let conf_dir = absolute(
        &project_dir,
        &properties.resolve(properties.get_or(keys::CONF_DIR, "config")),
    );
    let env_file = conf_dir.join(format!("{}.toml", properties.get_or(keys::ENV, "default")));
    if env_file.is_file() {
        properties.merge_file(&env_file)?;
    }

    let user_file = match &options.config {
        Some(path) => Some(path.clone()),
        None => properties
            .get(keys::CONF_FILE_USER)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(|p| absolute(&project_dir, &properties.resolve(p))),
    };
    if let Some(path) = user_file {
        properties.merge_file(&path).with_context(|| {
            t!("config_read_failed_path", locale = &options.language, path = path.display())
                .to_string()
        })?;
        properties.set(keys::CONF_FILE_USER, path.display().to_string())?;
    }

    apply_overrides(&mut properties, options)?;

    // Relative directories are relative to the project, not the working directory.
    for key in [keys::TESTS_ROOT, keys::REPORTING_DIR] {
        if let Ok(value) = properties.get(key) {
            let path = absolute(&project_dir, &properties.resolve(value));
            properties.set(key, path.display().to_string())?;
        }
    }
    debug!("{} properties after merging all sources", properties.len());
    Ok(properties)
}

fn apply_overrides(properties: &mut PropertyStore, options: &RunOptions) -> Result<()> {
    if let Some(project) = &options.project {
        properties.set(keys::PROJECT, project.as_str())?;
    }
    if let Some(env) = &options.env {
        properties.set(keys::ENV, env.as_str())?;
    }
    if let Some(filters) = &options.filters {
        properties.set(keys::TESTS_FILTERS, filters.as_str())?;
    }
    if let Some(level) = &options.log_level {
        properties.set(keys::LOG_LEVEL, level.as_str())?;
    }
    if let Some(file) = &options.report_file {
        properties.set(keys::REPORTING_FILE, file.as_str())?;
    }
    if let Some(root) = &options.test_root {
        properties.set(keys::TESTS_ROOT, root.display().to_string())?;
    }
    if let Some(timeout) = options.timeout {
        properties.set(keys::TIMEOUT, timeout.to_string())?;
    }
    if options.validate_only {
        properties.set(keys::TESTS_EXECUTE, "false")?;
    }
    if !options.language.is_empty() {
        properties.set(keys::LANGUAGE, options.language.as_str())?;
    }
    Ok(())
}

fn absolute(base: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn write_summary(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&report.summary())
        .context("Failed to serialize the run summary")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, json)
        .with_context(|| format!("Failed to write run summary '{}'", path.display()))
}

/// Cancels the run on Ctrl-C; unvisited test cases stay `NotRun`.
fn setup_signal_handler(token: CancellationToken, locale: &str) -> tokio::task::JoinHandle<()> {
    let locale = locale.to_string();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            token.cancel();
        }
    })
}
