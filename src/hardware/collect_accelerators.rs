use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sysinfo::System;
use thiserror::Error;
use tracing::{debug, error};

use crate::hardware::mapping::MappingTable;
use crate::hardware::types::{AcceleratorCard, AcceleratorInventory};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to read from {}: {source}", path.display())]
    EnumerationRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {}: {source}", path.display())]
    Attribute {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scans a PCI device directory for accelerators known to a mapping table.
///
/// Nothing is cached between polls; every call to [`AcceleratorPoller::poll`]
/// lists the directory again.
#[derive(Debug, Clone)]
pub struct AcceleratorPoller {
    pci_devices_path: PathBuf,
    table: MappingTable,
}

impl AcceleratorPoller {
    pub fn new(pci_devices_path: impl Into<PathBuf>, table: MappingTable) -> Self {
        Self {
            pci_devices_path: pci_devices_path.into(),
            table,
        }
    }

    /// Poller over `<sysfs_root>/bus/pci/devices`.
    pub fn from_sysfs(sysfs_root: &Path, table: MappingTable) -> Self {
        Self::new(sysfs_root.join("bus/pci/devices"), table)
    }

    pub fn pci_devices_path(&self) -> &Path {
        &self.pci_devices_path
    }

    /// Starts one scan of the device directory.
    ///
    /// Only a failure to list the directory itself is returned. Devices whose
    /// attributes cannot be read are logged and left out of the results.
    pub fn poll(&self) -> Result<impl Iterator<Item = AcceleratorCard> + '_, CollectError> {
        let entries = fs::read_dir(&self.pci_devices_path).map_err(|source| {
            CollectError::EnumerationRoot {
                path: self.pci_devices_path.clone(),
                source,
            }
        })?;

        Ok(entries.filter_map(move |entry| match entry {
            Ok(entry) => self.classify(&entry.file_name().to_string_lossy()),
            Err(err) => {
                error!(path = %self.pci_devices_path.display(), error = %err, "failed to read pci device entry");
                None
            }
        }))
    }

    pub fn collect(&self) -> Result<Vec<AcceleratorCard>, CollectError> {
        Ok(self.poll()?.collect())
    }

    pub fn inventory(&self) -> Result<AcceleratorInventory, CollectError> {
        let accelerators = self.collect()?;

        Ok(AcceleratorInventory {
            agent_version: AGENT_VERSION.to_string(),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            collected_at: Utc::now(),
            accelerators,
        })
    }

    fn classify(&self, bus_address: &str) -> Option<AcceleratorCard> {
        let vendor_id = match self.read_attribute(bus_address, "vendor") {
            Ok(id) => id,
            Err(err) => {
                error!(name = bus_address, error = %err, "failed to get pci vendor ID");
                return None;
            }
        };
        let device_id = match self.read_attribute(bus_address, "device") {
            Ok(id) => id,
            Err(err) => {
                error!(name = bus_address, error = %err, "failed to get pci device ID");
                return None;
            }
        };

        debug!(vendor = %vendor_id, device = %device_id, "checking pci device");

        // Most PCI devices are not accelerators; skip them without logging.
        let (vendor, model) = self.table.lookup(&vendor_id, &device_id)?;
        debug!(vendor, model, "accelerator device found");

        Some(AcceleratorCard {
            vendor: vendor.to_string(),
            model: model.to_string(),
            bus_address: bus_address.to_string(),
        })
    }

    fn read_attribute(&self, bus_address: &str, attribute: &str) -> Result<String, CollectError> {
        let path = self.pci_devices_path.join(bus_address).join(attribute);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(data.trim().to_string()),
            Err(source) => Err(CollectError::Attribute { path, source }),
        }
    }
}
