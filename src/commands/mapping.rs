use tracing::info;

use crate::cli::{CollectorArgs, MappingCommands};
use crate::hardware::pci_ids::{generate_mapping, read_database};
use crate::hardware::types::MappingSummary;
use crate::hardware::{load_mapping, MappingTable};
use crate::output::{output_data, print_success};

pub fn handle_mapping_command(cmd: &MappingCommands, args: &CollectorArgs) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        MappingCommands::Check { file } => {
            let table = MappingTable::load(file)?;
            print_success(&format!("{} is a valid accelerator mapping", file.display()));
            output_data(
                &MappingSummary {
                    path: file.display().to_string(),
                    vendors: table.len(),
                    models: table.model_count(),
                },
                "pretty",
            )?;
        }
        MappingCommands::Show { format } => {
            let table = load_mapping(args.mapping_file.as_deref())?;
            output_data(&table.to_records(), format)?;
        }
        MappingCommands::Generate { vendors, name_filter } => {
            let db = read_database()?;
            let records = generate_mapping(&db, vendors, name_filter.as_deref())?;

            // Never print something the loader would reject.
            let table = MappingTable::build(records.clone())?;
            info!(vendors = table.len(), models = table.model_count(), "generated accelerator mapping");
            output_data(&records, "yaml")?;
        }
    }
    Ok(())
}
