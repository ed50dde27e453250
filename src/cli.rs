use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "accel-inventory")]
#[command(about = "Inventory of PCI accelerator cards (GPUs, AI ASICs)")]
pub struct Cli {
    #[command(flatten)]
    pub collector: CollectorArgs,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct CollectorArgs {
    /// sysfs mountpoint
    #[arg(long, global = true, default_value = "/sys")]
    pub sysfs: PathBuf,

    /// Path to the mapped accelerators data config (built-in table when omitted)
    #[arg(long, global = true)]
    pub mapping_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the PCI bus and print recognized accelerator cards
    Scan {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print one scrape of the accelerator metrics in Prometheus text format
    Metrics,
    /// Post accelerator inventory to the inventory API
    PostInventory {
        /// Inventory API base URL
        #[arg(short, long, default_value = "http://localhost:6183")]
        url: String,
    },
    /// Mapping table commands
    #[command(subcommand)]
    Mapping(MappingCommands),
}

#[derive(Subcommand, Debug)]
pub enum MappingCommands {
    /// Validate a mapping file
    Check {
        /// Mapping file to validate
        file: PathBuf,
    },
    /// Print the active mapping table
    Show {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },
    /// Generate a mapping file from the system PCI ID database
    Generate {
        /// Vendor ID to include, e.g. 10de (repeatable)
        #[arg(long = "vendor", required = true)]
        vendors: Vec<String>,

        /// Only include devices whose name contains this text (case-insensitive)
        #[arg(long = "match")]
        name_filter: Option<String>,
    },
}
