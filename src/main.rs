use colored::*;
use prova::cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    prova::init();

    match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
