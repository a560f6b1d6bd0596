pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::replay::ReplayArgs;

#[derive(Debug, Parser)]
#[command(
    name = "codbot",
    about = "Codbot operator CLI",
    long_about = "Apply migrations, inspect effective configuration, and replay signed order webhooks.",
    after_help = "Examples:\n  codbot config\n  codbot migrate\n  codbot replay --total 7500.00"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Send a signed synthetic order-created webhook to a running service")]
    Replay {
        #[arg(long, help = "Webhook URL; defaults to the configured server address")]
        target: Option<String>,
        #[arg(long, default_value = commands::replay::DEFAULT_PHONE)]
        phone: String,
        #[arg(long, default_value = commands::replay::DEFAULT_TOTAL)]
        total: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Replay { target, phone, total } => {
            commands::replay::run(ReplayArgs { target, phone, total })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
