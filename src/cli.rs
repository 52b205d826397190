//! # Command Line Interface / 命令行接口
//!
//! `prova run` executes a project, `prova init` scaffolds one.
//!
//! `prova run` 执行项目，`prova init` 生成项目骨架。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf, process::ExitCode};

use crate::core::status::TestStatus;
use crate::infra::t;
use commands::run::RunOptions;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language(args: &[String]) -> String {
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        if let Some(lang) = args.get(pos + 1) {
            return lang.clone();
        }
    }
    if let Some(lang) = args.iter().find_map(|arg| arg.strip_prefix("--lang=")) {
        return lang.to_string();
    }
    crate::detect_locale()
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("prova")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd_run_about", locale = locale).to_string())
                .arg(
                    Arg::new("project")
                        .help(t!("arg_project", locale = locale).to_string())
                        .value_name("PROJECT")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help(t!("arg_config", locale = locale).to_string())
                        .value_name("FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("env")
                        .short('e')
                        .long("env")
                        .help(t!("arg_env", locale = locale).to_string())
                        .value_name("ENV")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("filters")
                        .short('f')
                        .long("filters")
                        .help(t!("arg_filters", locale = locale).to_string())
                        .value_name("FILTERS")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("loglevel")
                        .short('l')
                        .long("loglevel")
                        .help(t!("arg_loglevel", locale = locale).to_string())
                        .value_name("LEVEL")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .help(t!("arg_out", locale = locale).to_string())
                        .value_name("FILE")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .help(t!("arg_root", locale = locale).to_string())
                        .value_name("TESTROOT")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .help(t!("arg_timeout", locale = locale).to_string())
                        .value_name("MILLISECONDS")
                        .value_parser(clap::value_parser!(u64))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("validate-only")
                        .long("validate-only")
                        .help(t!("arg_validate_only", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("summary")
                        .long("summary")
                        .help(t!("arg_summary", locale = locale).to_string())
                        .value_name("FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("project-dir")
                        .long("project-dir")
                        .help(t!("arg_project_dir", locale = locale).to_string())
                        .value_name("PROJECT_DIR")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("project-dir")
                        .long("project-dir")
                        .help(t!("arg_project_dir", locale = locale).to_string())
                        .value_name("PROJECT_DIR")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn run_options(matches: &ArgMatches, language: &str) -> RunOptions {
    RunOptions {
        project: matches.get_one::<String>("project").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        env: matches.get_one::<String>("env").cloned(),
        filters: matches.get_one::<String>("filters").cloned(),
        log_level: matches.get_one::<String>("loglevel").cloned(),
        report_file: matches.get_one::<String>("out").cloned(),
        test_root: matches.get_one::<PathBuf>("root").cloned(),
        timeout: matches.get_one::<u64>("timeout").copied(),
        validate_only: matches.get_flag("validate-only"),
        summary: matches.get_one::<PathBuf>("summary").cloned(),
        project_dir: matches
            .get_one::<PathBuf>("project-dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(".")),
        language: language.to_string(),
    }
}

/// A run succeeds when the root suite passed; a validate-only run also when
/// nothing was blocked or failed.
fn is_success(status: TestStatus, validate_only: bool) -> bool {
    status == TestStatus::Passed || (validate_only && status == TestStatus::NotRun)
}

/// Parses the process arguments and runs the selected command.
///
/// The exit code is `SUCCESS` only when the root test suite passed.
pub async fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();
    // Pre-parse language and initialize i18n first.
    let language = pre_parse_language(&args);
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches_from(args);

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let options = run_options(run_matches, &language);
            let validate_only = options.validate_only;
            let status = commands::run::execute(options).await?;
            Ok(if is_success(status, validate_only) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Some(("init", init_matches)) => {
            let project_dir = init_matches
                .get_one::<PathBuf>("project-dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("."));
            let force = init_matches.get_flag("force");
            commands::init::execute(&project_dir, force, &language)?;
            Ok(ExitCode::SUCCESS)
        }
        // Unreachable: a subcommand is required.
        _ => Ok(ExitCode::FAILURE),
    }
}
