use serde::Serialize;
use std::time::SystemTime;
use tabled::settings::Style;
use tabled::{Table, Tabled};

pub type CmdResult = Result<String, Box<dyn std::error::Error>>;

pub fn table<T: Tabled>(rows: &[T], empty: &str) -> String {
    if rows.is_empty() {
        return empty.to_string();
    }
    Table::new(rows).with(Style::psql()).to_string()
}

pub fn json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn age(time: SystemTime) -> String {
    let Ok(elapsed) = SystemTime::now().duration_since(time) else {
        return "in the future".to_string();
    };
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86400)
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_age_buckets() {
        let now = SystemTime::now();
        assert_eq!(age(now - Duration::from_secs(3 * 3600 + 5)), "3h ago");
        assert_eq!(age(now - Duration::from_secs(2 * 86400)), "2d ago");
        assert_eq!(age(now + Duration::from_secs(600)), "in the future");
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: &'static str,
    }

    #[test]
    fn test_empty_tables_print_the_placeholder() {
        assert_eq!(table::<Row>(&[], "nothing here"), "nothing here");
        assert!(table(&[Row { name: "x" }], "").contains("Name"));
    }
}
