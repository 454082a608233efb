use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Global output format setting
static OUTPUT_JSON: AtomicBool = AtomicBool::new(false);

pub fn set_json_output(json: bool) {
    OUTPUT_JSON.store(json, Ordering::Relaxed);
}

pub fn is_json_output() -> bool {
    OUTPUT_JSON.load(Ordering::Relaxed)
}

/// Print a table, or `json_value` as JSON in JSON mode.
pub fn print_table<T, R, F, J>(items: &[T], to_row: F, json_value: &J)
where
    R: Tabled,
    F: Fn(&T) -> R,
    J: Serialize + ?Sized,
{
    if is_json_output() {
        println!("{}", serde_json::to_string_pretty(json_value).unwrap_or_default());
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if is_json_output() {
        println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
    } else {
        display(item);
    }
}

/// Print a message, wrapped in a JSON object in JSON mode
pub fn print_message(message: &str) {
    if is_json_output() {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }
}

/// Format a finding status with color
pub fn status_colored(status: &str) -> String {
    match status.to_ascii_uppercase().as_str() {
        "OPEN" => status.red().to_string(),
        "IN_PROGRESS" => status.yellow().to_string(),
        "RESOLVED" => status.green().to_string(),
        "REJECTED" => status.bright_black().to_string(),
        _ => status.to_string(),
    }
}

pub fn yes_no(value: bool) -> String {
    if value {
        "yes".red().bold().to_string()
    } else {
        "no".to_string()
    }
}

/// Format a date string nicely using chrono
pub fn format_date(iso: &str) -> String {
    use chrono::{DateTime, Local, Utc};

    if let Ok(dt) = iso.parse::<DateTime<Utc>>() {
        let local: DateTime<Local> = dt.into();
        local.format("%Y-%m-%d %H:%M").to_string()
    } else {
        iso.split('T').next().unwrap_or(iso).to_string()
    }
}

/// Truncate a string with ellipsis, on a character boundary
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_date_falls_back_to_date_part() {
        assert_eq!(format_date("2024-01-15Tgarbage"), "2024-01-15");
        assert_eq!(format_date("not a date"), "not a date");
    }
}
