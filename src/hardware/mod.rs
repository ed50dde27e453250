// Accelerator inventory collection modules
pub mod types;
pub mod mapping;
pub mod collect_accelerators;
pub mod pci_ids;

use std::path::Path;

use tracing::{info, warn};

pub use collect_accelerators::AcceleratorPoller;
pub use mapping::{MappingError, MappingTable};

/// Loads the mapping file when one is given, otherwise the built-in table.
pub fn load_mapping(mapping_file: Option<&Path>) -> Result<MappingTable, MappingError> {
    let table = match mapping_file {
        Some(path) => MappingTable::load(path)?,
        None => MappingTable::builtin()?,
    };
    info!(
        source = %mapping_file.map_or_else(|| "built-in".into(), |p| p.display().to_string()),
        vendors = table.len(),
        models = table.model_count(),
        "accelerator mapping ready"
    );
    if table.is_empty() {
        warn!("accelerator mapping is empty, no devices will be reported");
    }
    Ok(table)
}
