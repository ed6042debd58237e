pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::meetups::CreateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "platano",
    about = "Platanotorrino operator CLI",
    long_about = "Inspect configuration, check store readiness, and manage meetups in the configured registry.",
    after_help = "Examples:\n  platano doctor --json\n  platano config\n  platano meetups list\n  platano meetups create --title Picnic --description 'Bring food' --date 2024-06-01 --time 18:00 --location Park"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Discord credentials, and meetup store readability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List, create, or delete meetups in the configured store")]
    Meetups {
        #[command(subcommand)]
        action: MeetupAction,
    },
}

#[derive(Debug, Subcommand)]
enum MeetupAction {
    #[command(about = "Print every stored meetup as JSON")]
    List,
    #[command(about = "Create a meetup and print the stored record")]
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, help = "YYYY-MM-DD, or a full RFC 3339 timestamp when --time is omitted")]
        date: String,
        #[arg(long, help = "HH:MM, combined with --date")]
        time: Option<String>,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "activo", help = "activo or pendiente")]
        status: String,
    },
    #[command(about = "Delete a meetup by id")]
    Delete { id: u64 },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Meetups { action } => match action {
            MeetupAction::List => commands::meetups::list(),
            MeetupAction::Create { title, description, date, time, location, status } => {
                commands::meetups::create(CreateArgs {
                    title,
                    description,
                    date,
                    time,
                    location,
                    status,
                })
            }
            MeetupAction::Delete { id } => commands::meetups::delete(id),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
