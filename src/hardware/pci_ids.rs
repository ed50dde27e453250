use pciid_parser::Database;
use thiserror::Error;

use crate::hardware::mapping::{ModelRecord, VendorRecord};

#[derive(Error, Debug)]
pub enum PciIdsError {
    #[error("failed to read the PCI ID database: {0}")]
    Database(String),

    #[error("invalid PCI ID {0:?}, expected a 16-bit hex value such as 10de or 0x10de")]
    InvalidId(String),

    #[error("vendor {0} not found in the PCI ID database")]
    UnknownVendor(String),
}

pub fn read_database() -> Result<Database, PciIdsError> {
    Database::read().map_err(|err| PciIdsError::Database(err.to_string()))
}

/// Builds mapping records for the given vendors from the PCI ID database.
///
/// IDs are written the way sysfs exposes them (`0x10de`) so the result can be
/// loaded as a mapping file without edits.
pub fn generate_mapping(
    db: &Database,
    vendor_ids: &[String],
    name_filter: Option<&str>,
) -> Result<Vec<VendorRecord>, PciIdsError> {
    let mut records = Vec::with_capacity(vendor_ids.len());

    for raw_id in vendor_ids {
        let vendor_id = parse_id(raw_id)?;
        if records.iter().any(|r: &VendorRecord| r.vendor_id == sysfs_id(vendor_id)) {
            continue;
        }

        let vendor = db
            .vendors
            .get(&vendor_id)
            .ok_or_else(|| PciIdsError::UnknownVendor(sysfs_id(vendor_id)))?;
        let devices = vendor
            .devices
            .iter()
            .map(|(device_id, device)| (*device_id, device.name.as_str()));

        records.push(vendor_record(vendor_id, &vendor.name, devices, name_filter));
    }

    Ok(records)
}

fn vendor_record<'a>(
    vendor_id: u16,
    vendor_name: &str,
    devices: impl Iterator<Item = (u16, &'a str)>,
    name_filter: Option<&str>,
) -> VendorRecord {
    let filter = name_filter.map(str::to_lowercase);

    let mut devices: Vec<(u16, &str)> = devices
        .filter(|(_, name)| match &filter {
            Some(filter) => name.to_lowercase().contains(filter.as_str()),
            None => true,
        })
        .collect();
    devices.sort_by_key(|(device_id, _)| *device_id);

    VendorRecord {
        vendor_name: vendor_name.to_string(),
        vendor_id: sysfs_id(vendor_id),
        models: devices
            .into_iter()
            .map(|(device_id, name)| ModelRecord {
                pci_id: sysfs_id(device_id),
                model_name: name.to_string(),
            })
            .collect(),
    }
}

fn parse_id(raw: &str) -> Result<u16, PciIdsError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(hex, 16).map_err(|_| PciIdsError::InvalidId(raw.to_string()))
}

fn sysfs_id(id: u16) -> String {
    format!("0x{:04x}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mapping::MappingTable;

    const NVIDIA_DEVICES: [(u16, &str); 3] = [
        (0x2684, "AD102 [GeForce RTX 4090]"),
        (0x20b0, "GA100 [A100 SXM4 40GB]"),
        (0x20b5, "GA100 [A100 PCIe 80GB]"),
    ];

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("10de").unwrap(), 0x10de);
        assert_eq!(parse_id("0x10DE").unwrap(), 0x10de);
        assert_eq!(parse_id(" 0x1002\n").unwrap(), 0x1002);
        assert!(matches!(parse_id("nvidia"), Err(PciIdsError::InvalidId(_))));
        assert!(matches!(parse_id("0x110de"), Err(PciIdsError::InvalidId(_))));
    }

    #[test]
    fn test_sysfs_id_format() {
        assert_eq!(sysfs_id(0x10de), "0x10de");
        assert_eq!(sysfs_id(0x1af), "0x01af");
    }

    #[test]
    fn test_vendor_record_sorted() {
        let record = vendor_record(0x10de, "NVIDIA Corporation", NVIDIA_DEVICES.into_iter(), None);

        assert_eq!(record.vendor_id, "0x10de");
        assert_eq!(record.vendor_name, "NVIDIA Corporation");
        let ids: Vec<&str> = record.models.iter().map(|m| m.pci_id.as_str()).collect();
        assert_eq!(ids, vec!["0x20b0", "0x20b5", "0x2684"]);
    }

    #[test]
    fn test_vendor_record_filter() {
        let record = vendor_record(0x10de, "NVIDIA Corporation", NVIDIA_DEVICES.into_iter(), Some("a100"));

        assert_eq!(record.models.len(), 2);
        assert!(record.models.iter().all(|m| m.model_name.contains("A100")));
    }

    #[test]
    fn test_generated_records_build() {
        let record = vendor_record(0x10de, "NVIDIA Corporation", NVIDIA_DEVICES.into_iter(), None);
        let table = MappingTable::build(vec![record]).unwrap();

        assert_eq!(
            table.lookup("0x10de", "0x2684"),
            Some(("NVIDIA Corporation", "AD102 [GeForce RTX 4090]"))
        );
    }
}
