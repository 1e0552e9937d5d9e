//! Durable storage of the counts file
//!
//! The file is a JSON object of identifier to count, keys sorted, rewritten in
//! full after every press. Writes go to a sibling `.tmp` file which is then
//! renamed over the real one, so a crash mid-write leaves the previous
//! version intact.

use super::error::PersistError;
use super::store::{Counts, Snapshot};
use crate::keyboard::normalize::canonical_identifier;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// How a load went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No file yet
    Missing,
    /// File read and parsed
    Loaded,
    /// File present but unusable; the reason is kept for reporting
    Corrupt(String),
}

/// Result of [`PersistenceGateway::load`]
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub counts: Counts,
    pub status: LoadStatus,
}

/// Reads and writes the counts file
#[derive(Debug)]
pub struct PersistenceGateway {
    path: PathBuf,
    indent: usize,
    dir_ready: bool,
}

impl PersistenceGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            indent: 4,
            dir_ready: false,
        }
    }

    /// Set indentation width of the written file
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the counts file. Absence and corruption both yield empty counts.
    pub fn load(&self) -> LoadOutcome {
        match self.try_load() {
            Ok(Some(counts)) => {
                log::info!(
                    "loaded {} key(s) from {}",
                    counts.len(),
                    self.path.display()
                );
                LoadOutcome {
                    counts,
                    status: LoadStatus::Loaded,
                }
            }
            Ok(None) => {
                log::info!("no counts file at {}, starting empty", self.path.display());
                LoadOutcome {
                    counts: Counts::new(),
                    status: LoadStatus::Missing,
                }
            }
            Err(e) => {
                log::warn!("ignoring unreadable counts file: {}", e);
                LoadOutcome {
                    counts: Counts::new(),
                    status: LoadStatus::Corrupt(e.to_string()),
                }
            }
        }
    }

    /// Just the counts from [`load`](Self::load)
    pub fn load_counts(&self) -> Counts {
        self.load().counts
    }

    fn try_load(&self) -> Result<Option<Counts>, PersistError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let stored: Counts =
            serde_json::from_str(&contents).map_err(|source| PersistError::Parse {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(migrate_identifiers(stored)))
    }

    /// Replace the counts file with `snapshot`
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistError> {
        self.ensure_dir()?;

        let contents = self.render(snapshot.as_map())?;
        let tmp_path = self.tmp_path();

        let written = write_synced(&tmp_path, &contents)
            .and_then(|()| fs::rename(&tmp_path, &self.path));

        if let Err(source) = written {
            let _ = fs::remove_file(&tmp_path);
            // The directory was removed under us; recreate it on the next save
            if source.kind() == io::ErrorKind::NotFound {
                self.dir_ready = false;
            }
            return Err(PersistError::Write {
                path: self.path.clone(),
                source,
            });
        }
        Ok(())
    }

    /// Serialized file contents for `counts`
    pub fn render(&self, counts: &Counts) -> Result<Vec<u8>, PersistError> {
        let indent = vec![b' '; self.indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        counts.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }

    fn ensure_dir(&mut self) -> Result<(), PersistError> {
        if self.dir_ready {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.dir_ready = true;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Fold `Key.<name>` entries written by older versions into `<name>`
fn migrate_identifiers(stored: Counts) -> Counts {
    let mut counts = Counts::new();
    for (id, count) in stored {
        let entry = counts
            .entry(canonical_identifier(&id).to_string())
            .or_insert(0);
        *entry = entry.saturating_add(count);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::from(Counts::from([
            ("a".to_string(), 2),
            ("space".to_string(), 1),
            ("ş".to_string(), 7),
        ]))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = PersistenceGateway::new(dir.path().join("data.json"));
        let outcome = gateway.load();
        assert_eq!(outcome.status, LoadStatus::Missing);
        assert!(outcome.counts.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{ this is not json").unwrap();

        let outcome = PersistenceGateway::new(&path).load();
        assert!(matches!(outcome.status, LoadStatus::Corrupt(_)));
        assert!(outcome.counts.is_empty());
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        for contents in ["[1, 2, 3]", r#"{"a": -1}"#, r#"{"a": 1.5}"#, r#"{"a": "x"}"#, ""] {
            fs::write(&path, contents).unwrap();
            let outcome = PersistenceGateway::new(&path).load();
            assert!(
                matches!(outcome.status, LoadStatus::Corrupt(_)),
                "{contents:?} should be corrupt"
            );
            assert!(outcome.counts.is_empty());
        }
    }

    #[test]
    fn save_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("data.json");
        let mut gateway = PersistenceGateway::new(&path);

        gateway.save(&sample()).unwrap();
        let outcome = gateway.load();
        assert_eq!(outcome.status, LoadStatus::Loaded);
        assert_eq!(Snapshot::from(outcome.counts), sample());
        assert!(!gateway.tmp_path().exists());
    }

    #[test]
    fn load_then_save_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut gateway = PersistenceGateway::new(&path);
        gateway.save(&sample()).unwrap();
        let first = fs::read(&path).unwrap();

        for _ in 0..3 {
            let counts = gateway.load_counts();
            gateway.save(&Snapshot::from(counts)).unwrap();
            assert_eq!(fs::read(&path).unwrap(), first);
        }
    }

    #[test]
    fn file_is_human_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut gateway = PersistenceGateway::new(&path);
        gateway.save(&sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"a\": 2,\n    \"space\": 1,\n    \"ş\": 7\n}\n");
    }

    #[test]
    fn indent_is_configurable() {
        let gateway = PersistenceGateway::new("unused.json").with_indent(2);
        let rendered = gateway.render(sample().as_map()).unwrap();
        assert!(String::from_utf8(rendered).unwrap().contains("\n  \"a\": 2"));
    }

    #[test]
    fn legacy_identifiers_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"Key.space": 3, "space": 2, "Key.shift": 1, "a": 4}"#).unwrap();

        let counts = PersistenceGateway::new(&path).load_counts();
        assert_eq!(counts.get("space"), Some(&5));
        assert_eq!(counts.get("shift"), Some(&1));
        assert_eq!(counts.get("a"), Some(&4));
        assert!(!counts.contains_key("Key.space"));
    }

    #[test]
    fn removed_directory_is_recreated_on_a_later_save() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("store");
        let path = data_dir.join("data.json");
        let mut gateway = PersistenceGateway::new(&path);
        gateway.save(&sample()).unwrap();

        fs::remove_dir_all(&data_dir).unwrap();
        let err = gateway.save(&sample()).unwrap_err();
        assert!(matches!(err, PersistError::Write { .. }));

        gateway.save(&sample()).unwrap();
        assert_eq!(Snapshot::from(gateway.load_counts()), sample());
    }

    #[test]
    fn save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let mut gateway = PersistenceGateway::new(blocker.join("data.json"));
        let err = gateway.save(&sample()).unwrap_err();
        assert!(matches!(err, PersistError::CreateDir { .. }));
    }
}
