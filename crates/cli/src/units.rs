use indexstore::{IndexStore, UnitInfo};
use tabled::Tabled;
use tracing::warn;

use crate::output::{self, CmdResult};

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Unit")]
    name: String,
    #[tabled(rename = "Main File")]
    main_file: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "System")]
    system: &'static str,
    #[tabled(rename = "Written")]
    written: String,
}

impl From<&UnitInfo> for UnitRow {
    fn from(info: &UnitInfo) -> Self {
        Self {
            name: info.name.clone(),
            main_file: info
                .main_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
            module: info.module_name.clone(),
            target: info.target.clone(),
            system: output::yes_no(info.is_system),
            written: output::age(info.modification_time),
        }
    }
}

pub fn run(store: &IndexStore<'_>, sorted: bool, json: bool) -> CmdResult {
    let units = if sorted { store.sorted_units() } else { store.units() };
    let mut infos = Vec::new();
    for unit in units {
        match unit {
            Ok(unit) => infos.push(unit.snapshot()),
            Err(e) => warn!("skipping unit: {}", e),
        }
    }

    if json {
        return output::json(&infos);
    }
    let rows: Vec<UnitRow> = infos.iter().map(UnitRow::from).collect();
    Ok(output::table(&rows, "No units found."))
}
