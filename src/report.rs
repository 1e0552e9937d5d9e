//! Statistics export

use crate::tally::Snapshot;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete statistics report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: StatsSummary,
    /// Per-key counts, most pressed first
    pub keys: Vec<KeyEntry>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report generation timestamp
    pub generated_at: String,
    /// Application version
    pub version: String,
    /// Detected keyboard
    pub keyboard: String,
}

/// Summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_presses: u64,
    pub distinct_keys: usize,
    pub most_pressed: Option<String>,
}

/// Single key entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    pub key: String,
    pub count: u64,
    /// Share of all presses, in percent
    pub share: f64,
}

impl StatsReport {
    /// Build a report from a snapshot
    pub fn new(snapshot: &Snapshot, keyboard: impl Into<String>) -> Self {
        let now: DateTime<Utc> = Utc::now();
        let total = snapshot.total();
        let ranked = snapshot.ranked();

        let keys = ranked
            .iter()
            .map(|(key, count)| KeyEntry {
                key: key.to_string(),
                count: *count,
                share: if total == 0 {
                    0.0
                } else {
                    *count as f64 * 100.0 / total as f64
                },
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                generated_at: now.to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                keyboard: keyboard.into(),
            },
            summary: StatsSummary {
                total_presses: total,
                distinct_keys: snapshot.len(),
                most_pressed: ranked.first().map(|(key, _)| key.to_string()),
            },
            keys,
        }
    }

    /// Export report to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export report to JSON file
    pub fn export_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Plain statistics, one `key: count` line per key, most pressed first
pub fn stats_text(snapshot: &Snapshot) -> String {
    snapshot
        .ranked()
        .iter()
        .map(|(key, count)| format!("{}: {}\n", key, count))
        .collect()
}

/// Write [`stats_text`] to `path`
pub fn export_text(snapshot: &Snapshot, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(stats_text(snapshot).as_bytes())?;
    Ok(())
}

/// Default export file name stamped with local time
pub fn default_export_name(extension: &str) -> String {
    format!(
        "keystroke_stats_{}.{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::Counts;

    fn sample() -> Snapshot {
        Snapshot::from(Counts::from([
            ("a".to_string(), 2),
            ("space".to_string(), 1),
            ("e".to_string(), 5),
        ]))
    }

    #[test]
    fn text_is_ranked() {
        assert_eq!(stats_text(&sample()), "e: 5\na: 2\nspace: 1\n");
    }

    #[test]
    fn empty_snapshot_gives_empty_text() {
        assert_eq!(stats_text(&Snapshot::default()), "");
    }

    #[test]
    fn report_summary() {
        let report = StatsReport::new(&sample(), "Test Keyboard");
        assert_eq!(report.summary.total_presses, 8);
        assert_eq!(report.summary.distinct_keys, 3);
        assert_eq!(report.summary.most_pressed.as_deref(), Some("e"));
        assert_eq!(report.metadata.keyboard, "Test Keyboard");
        assert!(!report.metadata.generated_at.is_empty());
        assert_eq!(report.keys[0].key, "e");
        assert!((report.keys[0].share - 62.5).abs() < 1e-9);
    }

    #[test]
    fn empty_report_has_no_top_key() {
        let report = StatsReport::new(&Snapshot::default(), "kbd");
        assert_eq!(report.summary.total_presses, 0);
        assert!(report.summary.most_pressed.is_none());
        assert!(report.keys.is_empty());
    }

    #[test]
    fn json_contains_sections() {
        let json = StatsReport::new(&sample(), "kbd").to_json().unwrap();
        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"keys\""));
    }

    #[test]
    fn exports_write_files() {
        let dir = tempfile::tempdir().unwrap();

        let text_path = dir.path().join("stats.txt");
        export_text(&sample(), &text_path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&text_path).unwrap(),
            "e: 5\na: 2\nspace: 1\n"
        );

        let json_path = dir.path().join("stats.json");
        StatsReport::new(&sample(), "kbd")
            .export_json(&json_path)
            .unwrap();
        let parsed: StatsReport =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.summary.total_presses, 8);
    }

    #[test]
    fn export_name_has_extension() {
        let name = default_export_name("txt");
        assert!(name.starts_with("keystroke_stats_"));
        assert!(name.ends_with(".txt"));
    }
}
