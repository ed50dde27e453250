mod cli;
mod commands;
mod hardware;
mod metrics;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{
    handle_mapping_command,
    handle_metrics_command,
    handle_post_inventory_command,
    handle_scan_command,
};
use output::print_error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Scan { format } => handle_scan_command(&cli.collector, format),
        Commands::Metrics => handle_metrics_command(&cli.collector),
        Commands::PostInventory { url } => handle_post_inventory_command(&cli.collector, url),
        Commands::Mapping(cmd) => handle_mapping_command(cmd, &cli.collector),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("accel_inventory={}", level))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
