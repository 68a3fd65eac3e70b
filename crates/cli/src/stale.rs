use indexstore::{IndexStore, Staleness, Unit};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::output::{self, CmdResult};

#[derive(Serialize)]
struct UnitStaleness {
    unit: String,
    #[serde(flatten)]
    staleness: Staleness,
}

#[derive(Tabled)]
struct StaleRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "State")]
    state: &'static str,
    #[tabled(rename = "Files")]
    files: String,
}

fn join_paths(paths: &[std::path::PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<&UnitStaleness> for StaleRow {
    fn from(entry: &UnitStaleness) -> Self {
        let (state, files) = match &entry.staleness {
            Staleness::UpToDate => ("up to date", String::new()),
            Staleness::Stale { newer } => ("stale", join_paths(newer)),
            Staleness::Missing { paths } => ("missing inputs", join_paths(paths)),
        };
        Self {
            unit: entry.unit.clone(),
            state,
            files,
        }
    }
}

fn check(unit: &Unit<'_>, only_stale: bool) -> indexstore::Result<Option<UnitStaleness>> {
    let staleness = unit.staleness()?;
    if only_stale && staleness.is_up_to_date() {
        return Ok(None);
    }
    Ok(Some(UnitStaleness {
        unit: unit.name().to_string(),
        staleness,
    }))
}

pub fn run(store: &IndexStore<'_>, unit: Option<&str>, only_stale: bool, json: bool) -> CmdResult {
    let mut entries = Vec::new();
    match unit {
        Some(name) => entries.extend(check(&store.unit(name)?, only_stale)?),
        None => {
            for unit in store.sorted_units() {
                match unit {
                    Ok(unit) => entries.extend(check(&unit, only_stale)?),
                    Err(e) => warn!("skipping unit: {}", e),
                }
            }
        }
    }

    if json {
        return output::json(&entries);
    }
    let rows: Vec<StaleRow> = entries.iter().map(StaleRow::from).collect();
    Ok(output::table(&rows, "All units are up to date."))
}
