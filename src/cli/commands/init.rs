//! # Init Command Module / 初始化命令模块
//!
//! Scaffolds a project directory: a `prova.toml` property file and one sample
//! shell test case under `tests/`.
//!
//! 生成项目骨架：`prova.toml` 属性文件以及 `tests/` 下的一个示例 shell 测试用例。

use anyhow::{bail, Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use crate::cli::commands::run::PROJECT_FILE;
use crate::infra::t;

const SAMPLE_CASE: &str = "tests/sample.toml";

fn project_file_content(project: &str, language: &str) -> String {
    format!(
        r#"# Prova project properties.
# Every key may be overridden from the command line, see `prova run --help`.

[prova]
project = "{project}"
language = "{language}"
# Per action timeout in milliseconds, 0 disables it.
timeout = 60000

[prova.tests]
root = "tests"
# Labels of the test cases to run; empty runs all of them.
filters = []

[prova.log]
level = "info"

[prova.plugins.reporting]
dir = "reports"
file = "prova-report.html"
"#
    )
}

const SAMPLE_CASE_CONTENT: &str = r#"# A sample test case. Each [[setup]], [[test]] and [[teardown]] table is one
# action; every key other than `action` and `type` is an attribute of it.
type = "shell"
labels = ["smoke"]

[variables]
GREETING = "hello"

[[setup]]
action = "set_variable"
NAME = "TARGET"
VALUE = "${GREETING} prova"

[[test]]
action = "execute"
COMMAND = "echo ${TARGET}"

[[test]]
action = "execute"
COMMAND = "sh -c 'exit 0'"
EXPECTED_EXIT_CODE = 0
"#;

/// Writes the project skeleton into `project_dir`.
///
/// # Errors
/// Fails when `prova.toml` already exists and `force` is not set, or when a
/// file cannot be written.
pub fn execute(project_dir: &Path, force: bool, language: &str) -> Result<()> {
    let project_file = project_dir.join(PROJECT_FILE);
    if project_file.exists() && !force {
        bail!(
            "{}",
            t!("init_file_exists", locale = language, path = project_file.display())
        );
    }

    fs::create_dir_all(project_dir.join("tests")).with_context(|| {
        t!("init_write_failed", locale = language, path = project_dir.display()).to_string()
    })?;

    let project = project_name(project_dir);
    write_file(&project_file, &project_file_content(&project, language), language)?;

    let sample = project_dir.join(SAMPLE_CASE);
    if sample.exists() && !force {
        println!(
            "{}",
            t!("init_file_kept", locale = language, path = sample.display()).dimmed()
        );
    } else {
        write_file(&sample, SAMPLE_CASE_CONTENT, language)?;
    }

    println!("{}", t!("init_usage_hint", locale = language));
    Ok(())
}

fn write_file(path: &Path, content: &str, language: &str) -> Result<()> {
    fs::write(path, content).with_context(|| {
        t!("init_write_failed", locale = language, path = path.display()).to_string()
    })?;
    println!(
        "{} {}",
        "✔".green(),
        t!("init_success_created", locale = language, path = path.display()).bold()
    );
    Ok(())
}

/// The directory name, or `prova` when it has none.
fn project_name(project_dir: &Path) -> String {
    fs::canonicalize(project_dir)
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "prova".to_string())
}
