// src/main.rs
use clap::Parser;
use credvault::{cli, error};

fn main() -> Result<(), error::AppError> {
    env_logger::init(); // Initialize logger
    log::info!("Starting credvault");

    let cli_args = cli::Cli::parse();

    if let Err(e) = cli::handle_cli_command(cli_args) {
        log::error!("Application failed: {:#?}", e);
        eprintln!("Error: {}", e);
        return Err(e);
    }

    log::info!("credvault finished successfully.");
    Ok(())
}
