//! resource-waiter CLI
//!
//! Inspects botocore `waiters-2.json` models and replays recorded probe
//! outcomes through a waiter built from them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "resource-waiter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the waiters defined in a model
    List {
        /// Path to a waiters-2.json model
        #[arg(long, env = "RESOURCE_WAITER_MODEL")]
        model: PathBuf,
    },

    /// Validate every waiter in a model
    Validate {
        /// Path to a waiters-2.json model
        #[arg(long, env = "RESOURCE_WAITER_MODEL")]
        model: PathBuf,
    },

    /// Replay recorded outcomes through a waiter from a model
    Replay {
        /// Path to a waiters-2.json model
        #[arg(long, env = "RESOURCE_WAITER_MODEL")]
        model: PathBuf,

        /// Name of the waiter to run
        #[arg(long)]
        waiter: String,

        /// JSON file holding the recorded outcomes, in probe order
        #[arg(long)]
        responses: PathBuf,

        /// Override the model's attempt budget
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Override the model's delay between attempts, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::List { model } => commands::list(&model),
        Commands::Validate { model } => commands::validate(&model),
        Commands::Replay {
            model,
            waiter,
            responses,
            max_attempts,
            delay_ms,
        } => {
            commands::replay(commands::ReplayArgs {
                model,
                waiter,
                responses,
                max_attempts,
                delay_ms,
            })
            .await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
