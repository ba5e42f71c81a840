//! Demo/developer CLI for `satlink`: lets a developer inspect a range
//! file or run a direct on-device lookup without standing up the full
//! façade.

use access::{AccessController, OnDeviceController};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "satlink", version, about = "Satellite access policy core — developer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the header fields of a range file.
    InspectRangeFile {
        path: PathBuf,
    },
    /// Evaluate a single (lat, lon) against a range file's on-device
    /// policy, bypassing the orchestrator entirely.
    Check {
        lat: f64,
        lon: f64,
        #[arg(long)]
        range_file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), access::AccessError> {
    match command {
        Command::InspectRangeFile { path } => {
            let file = access::RangeFile::open(&path)?;
            println!("level: {}", file.level());
            println!("mode: {:?}", file.mode());
            println!("range_count: {}", file.range_count());
            file.close();
        }
        Command::Check { lat, lon, range_file } => {
            let controller = OnDeviceController::open(&range_file)?;
            let token = controller.token_for(lat, lon);
            let allowed = controller.is_allowed(token);
            println!("({lat}, {lon}) at level {}: allowed = {allowed}", controller.level());
            controller.close();
        }
    }
    Ok(())
}
