pub mod accelerators;
pub mod mapping;

pub use accelerators::{handle_metrics_command, handle_post_inventory_command, handle_scan_command};
pub use mapping::handle_mapping_command;

use tracing::debug;

use crate::cli::CollectorArgs;
use crate::hardware::{load_mapping, AcceleratorPoller, MappingError};

fn accelerator_poller(args: &CollectorArgs) -> Result<AcceleratorPoller, MappingError> {
    let table = load_mapping(args.mapping_file.as_deref())?;
    let poller = AcceleratorPoller::from_sysfs(&args.sysfs, table);
    debug!(path = %poller.pci_devices_path().display(), "using pci devices directory");
    Ok(poller)
}
