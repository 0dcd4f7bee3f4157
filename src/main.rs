mod cli;
mod db;
mod dedup;
mod error;
mod fmt;
mod folders;
mod import_log;
mod importer;
mod models;
mod parser;
mod router;
mod session;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli::settings_path(cli.config.as_deref());

    let result = match cli.command {
        Commands::Init { input_dir, db } => cli::init::run(&config_path, input_dir, db),
        Commands::Import { input_dir, dry_run } => cli::import::run(&config_path, input_dir, dry_run),
        Commands::Status => cli::status::run(&config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
