use indexstore::{IndexStore, OccurrenceInfo, SymbolRoles};
use tabled::Tabled;

use crate::output::{self, CmdResult};

#[derive(Tabled)]
struct OccurrenceRow {
    #[tabled(rename = "Line")]
    line: u32,
    #[tabled(rename = "Col")]
    column: u32,
    #[tabled(rename = "Symbol")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Roles")]
    roles: String,
    #[tabled(rename = "USR")]
    usr: String,
}

fn role_list(roles: SymbolRoles) -> String {
    roles
        .iter_names()
        .map(|name| name.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn run(
    store: &IndexStore<'_>,
    record: &str,
    usr: Option<&str>,
    lines: Option<(u32, u32)>,
    json: bool,
) -> CmdResult {
    let record = store.record(record)?;
    let occurrences = match lines {
        Some((start, count)) => record.occurrences_in_line_range(start, count),
        None => record.occurrences(),
    };

    let mut infos: Vec<OccurrenceInfo> = Vec::new();
    occurrences.for_each(|occurrence| {
        if usr.is_none_or(|usr| occurrence.symbol().usr() == usr) {
            infos.push(occurrence.snapshot());
        }
    });

    if json {
        return output::json(&infos);
    }
    let rows: Vec<OccurrenceRow> = infos
        .iter()
        .map(|info| OccurrenceRow {
            line: info.line,
            column: info.column,
            name: info.symbol.name.clone(),
            kind: format!("{:?}", info.symbol.kind),
            roles: role_list(info.roles),
            usr: info.symbol.usr.clone(),
        })
        .collect();
    Ok(output::table(&rows, "No occurrences found."))
}
