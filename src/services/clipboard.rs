//! Text handed to the clipboard, and the small formatting helpers the file
//! list shows next to each entry.

use crate::models::FileRecord;
use crate::services::registry::FileRegistry;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// `"File: <name>\n<text>"` for a ready record with text.
pub fn copy_text(name: &str, record: &FileRecord) -> Option<String> {
    if !record.is_ready() || record.text().is_empty() {
        return None;
    }
    Some(format!("File: {}\n{}", name, record.text()))
}

/// Every ready record in listing order, each under its own header.
pub fn copy_all(registry: &FileRegistry) -> Option<String> {
    let mut all_text = String::new();
    let mut has_ready = false;

    for (name, record) in registry.entries_in_order() {
        if record.is_ready() {
            all_text.push_str(&format!("File: {}\n{}\n\n", name, record.text()));
            has_ready = true;
        }
    }

    if !has_ready {
        return None;
    }
    Some(all_text.trim().to_string())
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}
