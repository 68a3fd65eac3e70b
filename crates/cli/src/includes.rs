use indexstore::{IncludeDirective, IndexStore, Unit};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::output::{self, CmdResult};

#[derive(Serialize)]
struct UnitIncludes {
    unit: String,
    includes: Vec<IncludeDirective>,
}

#[derive(Tabled)]
struct IncludeRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Line")]
    line: i64,
    #[tabled(rename = "Target")]
    target: String,
}

fn summarize(unit: &Unit<'_>, main_file: Option<&str>) -> Option<UnitIncludes> {
    main_file
        .is_none_or(|suffix| unit.main_file().ends_with(suffix))
        .then(|| UnitIncludes {
            unit: unit.name().to_string(),
            includes: unit.includes().snapshot(),
        })
}

pub fn run(
    store: &IndexStore<'_>,
    unit: Option<&str>,
    main_file: Option<&str>,
    json: bool,
) -> CmdResult {
    let mut collected = Vec::new();
    match unit {
        Some(name) => collected.extend(summarize(&store.unit(name)?, main_file)),
        None => {
            for unit in store.sorted_units() {
                match unit {
                    Ok(unit) => collected.extend(summarize(&unit, main_file)),
                    Err(e) => warn!("skipping unit: {}", e),
                }
            }
        }
    }

    if json {
        return output::json(&collected);
    }
    let rows: Vec<IncludeRow> = collected
        .iter()
        .flat_map(|entry| {
            entry.includes.iter().map(|include| IncludeRow {
                unit: entry.unit.clone(),
                source: include.source_path.display().to_string(),
                line: include.line,
                target: include.target_path.display().to_string(),
            })
        })
        .collect();
    Ok(output::table(&rows, "No include directives found."))
}
