pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "bakehouse",
    about = "Bakehouse operator CLI",
    long_about = "Apply migrations, load demo clients, inspect configuration, and rebuild client statistics.",
    after_help = "Examples:\n  bakehouse migrate\n  bakehouse config\n  bakehouse restat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic demo clients and orders")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Recompute order statistics for every client from the order history")]
    Restat,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Restat => commands::restat::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
