use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const BUILTIN_MAPPING: &str = include_str!("../../config/accelerators.yaml");

/// Errors raised while loading or validating a mapping document
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("failed to open accelerators config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse accelerators config data: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("mapping file contains duplicate of vendor id {vendor_id}")]
    DuplicateVendor { vendor_id: String },

    #[error("mapping file contains duplicate of device id {device_id} for vendor id {vendor_id}")]
    DuplicateDevice { vendor_id: String, device_id: String },
}

/// One vendor entry of a mapping document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorRecord {
    #[serde(rename = "vendorName")]
    pub vendor_name: String,
    #[serde(rename = "vendorID")]
    pub vendor_id: String,
    #[serde(default)]
    pub models: Vec<ModelRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRecord {
    #[serde(rename = "pciID")]
    pub pci_id: String,
    #[serde(rename = "modelName")]
    pub model_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorModels {
    pub vendor_name: String,
    device_models: HashMap<String, String>,
}

impl VendorModels {
    pub fn model(&self, device_id: &str) -> Option<&str> {
        self.device_models.get(device_id).map(String::as_str)
    }

    pub fn model_count(&self) -> usize {
        self.device_models.len()
    }
}

/// Validated vendor ID -> device ID -> model lookup.
///
/// IDs are kept exactly as written in the source document. Poll results only
/// match when the document uses the same form as the sysfs `vendor` and
/// `device` attribute files, e.g. `0x10de`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    vendors: HashMap<String, VendorModels>,
}

impl MappingTable {
    /// Builds a table, rejecting the whole input on the first duplicate ID.
    pub fn build(records: Vec<VendorRecord>) -> Result<Self, MappingError> {
        let mut vendors = HashMap::with_capacity(records.len());

        for record in records {
            let slot = match vendors.entry(record.vendor_id) {
                Entry::Occupied(entry) => {
                    return Err(MappingError::DuplicateVendor {
                        vendor_id: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => entry,
            };

            let mut device_models = HashMap::with_capacity(record.models.len());
            for model in record.models {
                if device_models.contains_key(&model.pci_id) {
                    return Err(MappingError::DuplicateDevice {
                        vendor_id: slot.key().clone(),
                        device_id: model.pci_id,
                    });
                }
                device_models.insert(model.pci_id, model.model_name);
            }

            slot.insert(VendorModels {
                vendor_name: record.vendor_name,
                device_models,
            });
        }

        Ok(Self { vendors })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        // An empty document is an empty table, not a parse error.
        let records: Option<Vec<VendorRecord>> = serde_yaml::from_str(yaml)?;
        Self::build(records.unwrap_or_default())
    }

    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let yaml = fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_yaml_str(&yaml)?;
        debug!(
            path = %path.display(),
            vendors = table.len(),
            models = table.model_count(),
            "loaded accelerator mapping"
        );
        Ok(table)
    }

    /// Table built from the mapping document bundled with the binary.
    pub fn builtin() -> Result<Self, MappingError> {
        Self::from_yaml_str(BUILTIN_MAPPING)
    }

    /// Returns `(vendor name, model name)` for a known pair.
    pub fn lookup(&self, vendor_id: &str, device_id: &str) -> Option<(&str, &str)> {
        let vendor = self.vendors.get(vendor_id)?;
        let model = vendor.model(device_id)?;
        Some((vendor.vendor_name.as_str(), model))
    }

    /// Number of vendors.
    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    pub fn model_count(&self) -> usize {
        self.vendors.values().map(VendorModels::model_count).sum()
    }

    /// Converts back to document records, sorted by vendor ID then device ID.
    pub fn to_records(&self) -> Vec<VendorRecord> {
        let mut records: Vec<VendorRecord> = self
            .vendors
            .iter()
            .map(|(vendor_id, vendor)| {
                let mut models: Vec<ModelRecord> = vendor
                    .device_models
                    .iter()
                    .map(|(pci_id, model_name)| ModelRecord {
                        pci_id: pci_id.clone(),
                        model_name: model_name.clone(),
                    })
                    .collect();
                models.sort_by(|a, b| a.pci_id.cmp(&b.pci_id));

                VendorRecord {
                    vendor_name: vendor.vendor_name.clone(),
                    vendor_id: vendor_id.clone(),
                    models,
                }
            })
            .collect();
        records.sort_by(|a, b| a.vendor_id.cmp(&b.vendor_id));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor(name: &str, id: &str, models: &[(&str, &str)]) -> VendorRecord {
        VendorRecord {
            vendor_name: name.to_string(),
            vendor_id: id.to_string(),
            models: models
                .iter()
                .map(|(pci_id, model_name)| ModelRecord {
                    pci_id: pci_id.to_string(),
                    model_name: model_name.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let table = MappingTable::build(vec![
            vendor("NVIDIA", "0x10de", &[("0x20b0", "A100"), ("0x2684", "RTX_4090")]),
            vendor("AMD", "0x1002", &[("0x740f", "MI210")]),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.model_count(), 3);
        assert_eq!(table.lookup("0x10de", "0x20b0"), Some(("NVIDIA", "A100")));
        assert_eq!(table.lookup("0x10de", "0x2684"), Some(("NVIDIA", "RTX_4090")));
        assert_eq!(table.lookup("0x1002", "0x740f"), Some(("AMD", "MI210")));

        assert_eq!(table.lookup("0x10de", "0x740f"), None);
        assert_eq!(table.lookup("0x8086", "0x20b0"), None);
    }

    #[test]
    fn test_lookup_does_not_normalize_ids() {
        let table = MappingTable::build(vec![vendor("NVIDIA", "0x10de", &[("0x20b0", "A100")])]).unwrap();

        assert_eq!(table.lookup("10de", "20b0"), None);
        assert_eq!(table.lookup("0x10DE", "0x20B0"), None);
    }

    #[test]
    fn test_empty_input_builds_empty_table() {
        let table = MappingTable::build(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.lookup("0x10de", "0x20b0"), None);

        let table = MappingTable::from_yaml_str("[]").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_vendor_rejected() {
        let err = MappingTable::build(vec![
            vendor("NVIDIA", "0x10de", &[("0x20b0", "A100")]),
            vendor("NVIDIA again", "0x10de", &[("0x2684", "RTX_4090")]),
        ])
        .unwrap_err();

        match err {
            MappingError::DuplicateVendor { vendor_id } => assert_eq!(vendor_id, "0x10de"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_device_rejected() {
        let err = MappingTable::build(vec![vendor(
            "NVIDIA",
            "0x10de",
            &[("0x20b0", "A100"), ("0x20b0", "A100_80GB")],
        )])
        .unwrap_err();

        match err {
            MappingError::DuplicateDevice { vendor_id, device_id } => {
                assert_eq!(vendor_id, "0x10de");
                assert_eq!(device_id, "0x20b0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_same_device_id_under_different_vendors() {
        let table = MappingTable::build(vec![
            vendor("NVIDIA", "0x10de", &[("0x1000", "X")]),
            vendor("Habana", "0x1da3", &[("0x1000", "GAUDI")]),
        ])
        .unwrap();

        assert_eq!(table.lookup("0x10de", "0x1000"), Some(("NVIDIA", "X")));
        assert_eq!(table.lookup("0x1da3", "0x1000"), Some(("Habana", "GAUDI")));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
- vendorName: NVIDIA
  vendorID: "0x10de"
  models:
    - pciID: "0x2230"
      modelName: RTX_A6000
"#;
        let table = MappingTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.lookup("0x10de", "0x2230"), Some(("NVIDIA", "RTX_A6000")));
    }

    #[test]
    fn test_yaml_duplicates_rejected() {
        let duplicated_vendors = r#"
- vendorName: NVIDIA
  vendorID: "0x10de"
  models:
    - pciID: "0x2230"
      modelName: RTX_A6000
- vendorName: NVIDIA
  vendorID: "0x10de"
  models:
    - pciID: "0x2684"
      modelName: RTX_4090
"#;
        assert!(matches!(
            MappingTable::from_yaml_str(duplicated_vendors),
            Err(MappingError::DuplicateVendor { .. })
        ));

        let duplicated_devices = r#"
- vendorName: NVIDIA
  vendorID: "0x10de"
  models:
    - pciID: "0x2230"
      modelName: RTX_A6000
    - pciID: "0x2230"
      modelName: RTX_A6000_ADA
"#;
        assert!(matches!(
            MappingTable::from_yaml_str(duplicated_devices),
            Err(MappingError::DuplicateDevice { .. })
        ));
    }

    #[test]
    fn test_yaml_unknown_keys_rejected() {
        let yaml = r#"
- vendorName: NVIDIA
  vendorID: "0x10de"
  vendorColor: green
  models: []
"#;
        assert!(matches!(MappingTable::from_yaml_str(yaml), Err(MappingError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MappingTable::load(Path::new("/nonexistent/accelerators.yaml")).unwrap_err();
        assert!(matches!(err, MappingError::Read { .. }));
    }

    #[test]
    fn test_builtin_table() {
        let table = MappingTable::builtin().unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.lookup("0x10de", "0x2230"), Some(("NVIDIA", "RTX_A6000")));
    }

    #[test]
    fn test_to_records_rebuilds_same_table() {
        let table = MappingTable::builtin().unwrap();
        let records = table.to_records();

        assert!(records.windows(2).all(|w| w[0].vendor_id < w[1].vendor_id));
        assert_eq!(MappingTable::build(records).unwrap(), table);
    }
}
