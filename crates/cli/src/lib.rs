pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "issuepilot",
    about = "Issuepilot operator CLI",
    long_about = "Run natural-language GitHub issue operations and inspect runtime readiness \
                  and configuration.",
    after_help = "Examples:\n  issuepilot run \"list open bugs in octo/shop\"\n  issuepilot \
                  tools\n  issuepilot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one free-text instruction through the engine and print the outcome")]
    Run {
        #[arg(help = "The instruction, e.g. \"create an issue in octo/shop about slow checkout\"")]
        text: String,
    },
    #[command(about = "List the operations the engine can select, with their argument schemas")]
    Tools,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, GitHub credentials, and model credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { text } => commands::run::run(&text),
        Command::Tools => commands::CommandResult { exit_code: 0, output: commands::tools::run() },
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
