//! spejare entrypoint: live packet capture with a JSON event stream on
//! stdout and a filtered history summary on shutdown.

use clap::Parser;
use spejare_telemetry::EventLogger;

mod commands;

use commands::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    EventLogger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run(args),
        Commands::Devices => commands::devices(),
    }
}
