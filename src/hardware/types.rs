use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one scan, as printed by `scan` and sent by `post-inventory`.
#[derive(Debug, Serialize)]
pub struct AcceleratorInventory {
    pub agent_version: String,
    pub hostname: String,
    pub collected_at: DateTime<Utc>,
    pub accelerators: Vec<AcceleratorCard>,
}

/// A recognized accelerator found during one poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AcceleratorCard {
    pub vendor: String,
    pub model: String,
    pub bus_address: String,
}

/// Counts reported by `mapping check` for a valid file.
#[derive(Debug, Serialize)]
pub struct MappingSummary {
    pub path: String,
    pub vendors: usize,
    pub models: usize,
}
