use indexstore::IndexStore;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, CmdResult};

#[derive(Tabled, Serialize)]
struct RecordRow {
    #[tabled(rename = "Record")]
    name: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Symbols")]
    symbols: usize,
    #[tabled(rename = "Occurrences")]
    occurrences: usize,
    #[tabled(rename = "Error")]
    error: String,
}

pub fn run(store: &IndexStore<'_>, unit: &str, json: bool) -> CmdResult {
    let unit = store.unit(unit)?;
    let mut rows = Vec::new();
    for record in unit.records() {
        let row = match record {
            Ok(record) => RecordRow {
                name: record.name().to_string(),
                file: record
                    .file_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                symbols: record.symbols().count(),
                occurrences: record.occurrences().count(),
                error: String::new(),
            },
            Err(e) => RecordRow {
                name: String::new(),
                file: String::new(),
                symbols: 0,
                occurrences: 0,
                error: e.to_string(),
            },
        };
        rows.push(row);
    }

    if json {
        return output::json(&rows);
    }
    Ok(output::table(&rows, "Unit references no records."))
}
