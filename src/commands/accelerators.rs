use tracing::info;

use crate::cli::CollectorArgs;
use crate::commands::accelerator_poller;
use crate::metrics;
use crate::output::{output_data, print_success};

pub fn handle_scan_command(args: &CollectorArgs, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let inventory = accelerator_poller(args)?.inventory()?;
    info!(count = inventory.accelerators.len(), "accelerator scan complete");
    output_data(&inventory, format)
}

pub fn handle_metrics_command(args: &CollectorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let poller = accelerator_poller(args)?;
    print!("{}", metrics::render(&poller)?);
    Ok(())
}

pub fn handle_post_inventory_command(args: &CollectorArgs, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let inventory = accelerator_poller(args)?.inventory()?;

    let api_url = format!("{}/api/v1/accelerators/inventory", url.trim_end_matches('/'));
    info!(url = %api_url, count = inventory.accelerators.len(), "posting accelerator inventory");

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(&api_url)
        .json(&inventory)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text()?;
        return Err(format!("Failed to post inventory: HTTP {}: {}", status, error_text).into());
    }

    let result: serde_json::Value = response.json()?;
    print_success(&format!("Posted {} accelerator(s)", inventory.accelerators.len()));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
