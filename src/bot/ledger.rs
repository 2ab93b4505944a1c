//! Append-only record of comments already replied to.
//!
//! On disk: one comment id per line, no header. Ids are only ever appended,
//! so a crash mid-write can lose the in-flight id but never an earlier one.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bot::Error;

pub struct ReplyLedger {
    path: PathBuf,
    ids: HashSet<String>,
    /// Last line on disk is unterminated (interrupted append).
    needs_newline: bool,
}

impl ReplyLedger {
    /// Load from `path`; a missing file is an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No ledger at {:?}, starting empty", path);
                return Ok(Self {
                    path,
                    ids: HashSet::new(),
                    needs_newline: false,
                });
            }
            Err(source) => return Err(Error::LedgerCorrupt { path, source }),
        };

        let ids: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let needs_newline = !content.is_empty() && !content.ends_with('\n');

        info!("Loaded ledger from {:?} ({} replied comments)", path, ids.len());
        Ok(Self { path, ids, needs_newline })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Persist `id`, then remember it. The in-memory set is only touched once
    /// the line has been synced to disk.
    pub fn record(&mut self, id: &str) -> Result<(), Error> {
        let line = if self.needs_newline {
            format!("\n{id}\n")
        } else {
            format!("{id}\n")
        };
        append_synced(&self.path, line.as_bytes()).map_err(|source| Error::LedgerWrite {
            path: self.path.clone(),
            source,
        })?;

        self.needs_newline = false;
        self.ids.insert(id.to_string());
        debug!("Recorded comment {} in ledger", id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn append_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ReplyLedger::load(dir.path().join("comments.txt")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("a1"));
    }

    #[test]
    fn test_record_then_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.txt");

        let mut ledger = ReplyLedger::load(&path).unwrap();
        for id in ["a1", "a2", "a3"] {
            ledger.record(id).unwrap();
        }
        assert!(ledger.contains("a2"));

        let reloaded = ReplyLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        for id in ["a1", "a2", "a3"] {
            assert!(reloaded.contains(id));
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a1\na2\na3\n");
    }

    #[test]
    fn test_empty_lines_are_not_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.txt");
        std::fs::write(&path, "a1\n\na2\n\n").unwrap();

        let ledger = ReplyLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains(""));
    }

    #[test]
    fn test_empty_file_is_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.txt");
        std::fs::write(&path, "").unwrap();

        let ledger = ReplyLedger::load(&path).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.txt");
        std::fs::write(&path, "a1\r\na2\r\n").unwrap();

        let ledger = ReplyLedger::load(&path).unwrap();
        assert!(ledger.contains("a1"));
        assert!(ledger.contains("a2"));
    }

    #[test]
    fn test_unterminated_last_line_not_merged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.txt");
        std::fs::write(&path, "a1\na2").unwrap();

        let mut ledger = ReplyLedger::load(&path).unwrap();
        assert!(ledger.contains("a2"));
        ledger.record("a3").unwrap();
        ledger.record("a4").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a1\na2\na3\na4\n");
        let reloaded = ReplyLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 4);
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comments.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, b'\n']).unwrap();

        let err = ReplyLedger::load(&path).err().expect("should be corrupt");
        assert!(matches!(err, Error::LedgerCorrupt { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_directory_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let err = ReplyLedger::load(dir.path()).err().expect("should be corrupt");
        assert!(matches!(err, Error::LedgerCorrupt { .. }));
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("comments.txt");

        let mut ledger = ReplyLedger::load(&path).unwrap();
        let err = ledger.record("a1").unwrap_err();
        assert!(matches!(err, Error::LedgerWrite { .. }));
        assert!(!ledger.contains("a1"));
    }
}
