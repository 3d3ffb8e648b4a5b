//! Backup display formatting
//!
//! Formats catalog entries, single backups and collections for terminal output.

use chrono::{DateTime, Local};

use crate::backup::BackupDetails;
use crate::models::{CatalogEntry, Collection};

/// Format a game's backups as a table, newest first
pub fn format_backup_list(entries: &[CatalogEntry], collections: &[Collection]) -> String {
    if entries.is_empty() {
        return "No backups found.".to_string();
    }

    let now = Local::now();
    let rows: Vec<[String; 5]> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            [
                format!("{}", i + 1),
                entry.record.label().to_string(),
                collection_name(collections, &entry.record.collection_id),
                format_age(now, entry.modified),
                format_size(entry.size),
            ]
        })
        .collect();

    let mut output = render_table(
        ["#", "Backup", "Collection", "Age", "Size"],
        [true, false, false, true, true],
        &rows,
    );
    let total: u64 = entries.iter().map(|e| e.size).sum();
    output.push_str(&format!(
        "\nTotal: {} backup(s), {}\n",
        entries.len(),
        format_size(total)
    ));
    output
}

/// Format backups of every game as a table, newest first
pub fn format_all_backups(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No backups found.".to_string();
    }

    let rows: Vec<[String; 5]> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let game = if entry.record.game_name.is_empty() {
                entry.record.game_id.clone()
            } else {
                entry.record.game_name.clone()
            };
            [
                format!("{}", i + 1),
                game,
                entry.record.label().to_string(),
                entry.record.backup_time.format("%Y-%m-%d %H:%M").to_string(),
                format_size(entry.size),
            ]
        })
        .collect();

    let mut output = render_table(
        ["#", "Game", "Backup", "Created", "Size"],
        [true, false, false, false, true],
        &rows,
    );
    let total: u64 = entries.iter().map(|e| e.size).sum();
    output.push_str(&format!(
        "\nTotal: {} backup(s), {}\n",
        entries.len(),
        format_size(total)
    ));
    output
}

/// Pad `rows` into columns under `headers` and a dashed rule
fn render_table<const N: usize>(headers: [&str; N], right: [bool; N], rows: &[[String; N]]) -> String {
    let mut widths = headers.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; N], fill: char| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let pad = fill.to_string().repeat(widths[i] - cell.chars().count());
                if right[i] {
                    format!("{}{}", pad, cell)
                } else {
                    format!("{}{}", cell, pad)
                }
            })
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut output = line(headers, ' ');
    output.push_str(&line([""; N], '-'));
    for row in rows {
        output.push_str(&line(row.each_ref().map(String::as_str), ' '));
    }
    output
}

/// Format a list of backups with one block of detail per backup
pub fn format_backup_list_verbose(entries: &[CatalogEntry], collections: &[Collection]) -> String {
    if entries.is_empty() {
        return "No backups found.".to_string();
    }

    let now = Local::now();
    let mut output = String::new();
    for (i, entry) in entries.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, entry.record.label()));
        output.push_str(&format!("   Name:       {}\n", entry.record.backup_name));
        output.push_str(&format!(
            "   Collection: {}\n",
            collection_name(collections, &entry.record.collection_id)
        ));
        output.push_str(&format!(
            "   Created:    {}\n",
            entry.record.backup_time.format("%Y-%m-%d %H:%M:%S")
        ));
        output.push_str(&format!("   Age:        {}\n", format_age(now, entry.modified)));
        output.push_str(&format!(
            "   Size:       {}{}\n",
            format_size(entry.size),
            if entry.is_compressed { "" } else { " (folder)" }
        ));
        output.push_str(&format!("   Hash:       {}\n", entry.record.content_hash));
        output.push_str(&format!("   Path:       {}\n\n", entry.path.display()));
    }
    output.push_str(&format!("Total: {} backup(s)\n", entries.len()));
    output
}

/// Format a single backup's details
pub fn format_backup_details(details: &BackupDetails) -> String {
    let record = &details.record;
    let mut output = String::new();

    output.push_str(&format!("Backup: {}\n", record.label()));
    output.push_str(&format!("  Name:        {}\n", record.backup_name));
    output.push_str(&format!(
        "  Game:        {} ({})\n",
        if record.game_name.is_empty() {
            &record.game_id
        } else {
            &record.game_name
        },
        record.game_id
    ));
    output.push_str(&format!(
        "  Created:     {}\n",
        record.backup_time.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&format!("  Collection:  {}\n", record.collection_id));
    output.push_str(&format!("  Source:      {}\n", record.source_path));
    output.push_str(&format!("  Hash:        {}\n", record.content_hash));
    output.push_str(&format!("  Format:      {}\n", record.compression));
    output.push_str(&format!("  Size:        {}\n", format_size(details.size)));
    output.push_str(&format!("  Path:        {}\n", details.path.display()));
    output.push_str(&format!("\nFiles ({}):\n", details.entries.len()));
    for entry in &details.entries {
        output.push_str(&format!("  {}\n", entry));
    }
    output
}

/// Format a game's collections with their retention settings
pub fn format_collection_list(collections: &[Collection], default_limit: i64) -> String {
    let id_width = collections.iter().map(|c| c.id.len()).max().unwrap_or(2).max(2);
    let name_width = collections
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<id_width$}  {:<name_width$}  {}\n",
        "ID",
        "Name",
        "Retention",
        id_width = id_width,
        name_width = name_width,
    ));
    for collection in collections {
        let retention = if collection.limit_enabled {
            format!(
                "keep {}",
                collection.max_backups.unwrap_or(default_limit)
            )
        } else {
            "off".to_string()
        };
        output.push_str(&format!(
            "{:<id_width$}  {:<name_width$}  {}\n",
            collection.id,
            collection.name,
            retention,
            id_width = id_width,
            name_width = name_width,
        ));
    }
    output
}

fn collection_name(collections: &[Collection], collection_id: &str) -> String {
    collections
        .iter()
        .find(|c| c.id == collection_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| collection_id.to_string())
}

/// Format the time since `then` in short form ("45s", "3h", "2mo")
pub fn format_age(now: DateTime<Local>, then: DateTime<Local>) -> String {
    let total_seconds = now.signed_duration_since(then).num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackupRecord, ContentHash};
    use chrono::{Duration, NaiveDate};
    use std::path::PathBuf;

    fn entry(label: &str, collection: &str, size: u64) -> CatalogEntry {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let record = BackupRecord::new("hades", "Hades", "/saves", time, ContentHash::new("abc"))
            .with_display_name(label)
            .with_collection(collection);
        CatalogEntry {
            path: PathBuf::from(format!("/backups/{}.zip", record.backup_name)),
            record,
            size,
            is_compressed: true,
            modified: Local::now() - Duration::hours(3),
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_age() {
        let now = Local::now();
        assert_eq!(format_age(now, now - Duration::seconds(5)), "5s");
        assert_eq!(format_age(now, now - Duration::minutes(12)), "12m");
        assert_eq!(format_age(now, now - Duration::hours(5)), "5h");
        assert_eq!(format_age(now, now - Duration::days(3)), "3d");
        assert_eq!(format_age(now, now - Duration::days(65)), "2mo");
        assert_eq!(format_age(now, now + Duration::seconds(30)), "0s");
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(format_backup_list(&[], &[]), "No backups found.");
    }

    #[test]
    fn test_backup_table_uses_collection_names() {
        let collections = vec![Collection::default_collection(), Collection::new("a1b2c3d4", "Runs")];
        let output = format_backup_list(
            &[entry("Before boss", "a1b2c3d4", 2048), entry("", "default", 100)],
            &collections,
        );
        assert!(output.contains("Before boss"));
        assert!(output.contains("Runs"));
        assert!(output.contains("Main"));
        assert!(output.contains("hades_20240101_120000"));
        assert!(output.contains("3h"));
        assert!(output.contains("Total: 2 backup(s)"));
    }

    #[test]
    fn test_all_backups_table() {
        let mut other = entry("", "default", 4096);
        other.record.game_id = "celeste".to_string();
        other.record.game_name = String::new();
        let output = format_all_backups(&[entry("Before boss", "default", 2048), other]);

        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("#  Game"));
        assert!(lines[1].starts_with("-  ----"));
        assert!(lines[2].contains("Hades"));
        assert!(lines[2].contains("Before boss"));
        assert!(lines[3].contains("celeste"));
        assert!(lines[3].contains("2024-01-01 12:00"));
        assert!(output.contains("Total: 2 backup(s), 6.0 KB"));
        assert_eq!(format_all_backups(&[]), "No backups found.");
    }

    #[test]
    fn test_collection_list() {
        let mut runs = Collection::new("a1b2c3d4", "Runs");
        runs.limit_enabled = true;
        let output = format_collection_list(&[Collection::default_collection(), runs], 10);
        assert!(output.contains("default"));
        assert!(output.contains("off"));
        assert!(output.contains("keep 10"));
    }
}
