//! Revert-on-failure support for files mutated in place.
//!
//! A [`FileTransaction`] captures a file's bytes (or its absence) before a
//! mutation. Committing keeps the new content; rolling back, explicitly or
//! by dropping the transaction, restores the captured state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Content of a file at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    path: PathBuf,
    /// `None` when the file did not exist
    prior: Option<Vec<u8>>,
}

impl FileSnapshot {
    pub fn capture<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let prior = match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        Ok(Self { path, prior })
    }

    pub fn existed(&self) -> bool {
        self.prior.is_some()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.prior.as_deref()
    }

    /// Put the file back the way it was captured
    pub fn restore(&self) -> io::Result<()> {
        match &self.prior {
            Some(bytes) => fs::write(&self.path, bytes),
            None => match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        }
    }
}

/// Scoped mutation of a single file. Uncommitted transactions roll back
/// when dropped.
#[derive(Debug)]
pub struct FileTransaction {
    snapshot: FileSnapshot,
    finished: bool,
}

impl FileTransaction {
    pub fn begin<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let snapshot = FileSnapshot::capture(path)?;
        debug!(
            "Captured snapshot of {} (existed: {})",
            snapshot.path.display(),
            snapshot.existed()
        );

        Ok(Self {
            snapshot,
            finished: false,
        })
    }

    pub fn snapshot(&self) -> &FileSnapshot {
        &self.snapshot
    }

    /// Keep the current on-disk content
    pub fn commit(mut self) {
        self.finished = true;
    }

    /// Restore the captured content now
    pub fn rollback(mut self) -> io::Result<()> {
        self.finished = true;
        warn!("Reverting {}", self.snapshot.path.display());
        self.snapshot.restore()
    }
}

impl Drop for FileTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        warn!("Reverting {}", self.snapshot.path.display());
        if let Err(e) = self.snapshot.restore() {
            error!(
                "Failed to revert {}: {}",
                self.snapshot.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_restores_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.com.zone");
        fs::write(&path, "original").unwrap();

        {
            let tx = FileTransaction::begin(&path).unwrap();
            assert!(tx.snapshot().existed());
            fs::write(&path, "mutated").unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn test_rollback_removes_new_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.zone");

        let tx = FileTransaction::begin(&path).unwrap();
        assert!(!tx.snapshot().existed());
        fs::write(&path, "created").unwrap();
        tx.rollback().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_commit_keeps_mutation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("named.conf");
        fs::write(&path, "before").unwrap();

        let tx = FileTransaction::begin(&path).unwrap();
        fs::write(&path, "after").unwrap();
        tx.commit();

        assert_eq!(fs::read_to_string(&path).unwrap(), "after");
    }

    #[test]
    fn test_restore_of_absent_file_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let snapshot = FileSnapshot::capture(dir.path().join("never.zone")).unwrap();
        assert!(snapshot.bytes().is_none());
        snapshot.restore().unwrap();
    }
}
