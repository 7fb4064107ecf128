//! Advisory per-variant session lock
//!
//! At most one session may drive a variant at a time. The lock file records
//! the holder's PID so a second session can report who owns the variant.

use crate::error::{Result, WorkflowError};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Lock file name inside a variant directory
pub const SESSION_LOCK_FILE: &str = ".session.lock";

/// Exclusive session lock on a variant, released on drop
///
/// A variant directory created only to hold the lock is removed again on drop
/// if nothing else was saved into it.
#[derive(Debug)]
pub struct VariantLock {
    variant: String,
    path: PathBuf,
    created_dir: bool,
    // Held open for the lifetime of the session; closing it releases the lock.
    _file: File,
}

impl VariantLock {
    /// Acquire the lock without blocking, failing fast if another session holds it
    pub fn acquire(variant_dir: &Path, variant: &str) -> Result<Self> {
        let created_dir = !variant_dir.exists();
        fs::create_dir_all(variant_dir).map_err(|e| WorkflowError::io(variant_dir, e))?;
        let path = variant_dir.join(SESSION_LOCK_FILE);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| WorkflowError::io(&path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                let holder = read_holder(&mut file);
                tracing::warn!(variant = variant, holder = %holder, "Variant is locked by another session");
                return Err(WorkflowError::VariantLocked {
                    variant: variant.to_string(),
                    holder,
                });
            }
            return Err(WorkflowError::io(&path, e));
        }

        let mut lock = Self {
            variant: variant.to_string(),
            path,
            created_dir,
            _file: file,
        };
        lock.record_holder()?;
        tracing::debug!(variant = variant, path = %lock.path.display(), "Acquired session lock");
        Ok(lock)
    }

    fn record_holder(&mut self) -> Result<()> {
        let path = &self.path;
        let file = &mut self._file;

        file.set_len(0).map_err(|e| WorkflowError::io(path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| WorkflowError::io(path, e))?;
        writeln!(file, "pid {} since {}", std::process::id(), Utc::now().to_rfc3339())
            .map_err(|e| WorkflowError::io(path, e))?;
        file.flush().map_err(|e| WorkflowError::io(path, e))?;
        Ok(())
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for VariantLock {
    fn drop(&mut self) {
        if !self.created_dir {
            return;
        }
        let Some(dir) = self.path.parent() else {
            return;
        };
        if !only_holds_lock_file(dir) {
            return;
        }
        let removed = fs::remove_file(&self.path).and_then(|_| fs::remove_dir(dir));
        match removed {
            Ok(()) => {
                tracing::debug!(variant = %self.variant, "Removed unused variant directory")
            }
            Err(e) => {
                tracing::debug!(variant = %self.variant, error = %e, "Could not remove unused variant directory")
            }
        }
    }
}

fn only_holds_lock_file(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(entries) => entries.into_iter().all(|entry| {
            entry.is_ok_and(|entry| entry.file_name() == SESSION_LOCK_FILE)
        }),
        Err(_) => false,
    }
}

/// Who holds the lock, as written by [`VariantLock::acquire`]
fn read_holder<R: Read + Seek>(file: &mut R) -> String {
    const UNKNOWN: &str = "unknown holder";
    if let Err(e) = file.seek(SeekFrom::Start(0)) {
        tracing::debug!(error = %e, "Could not rewind session lock file");
        return UNKNOWN.to_string();
    }
    let mut contents = String::new();
    match file.read_to_string(&mut contents) {
        Ok(_) if !contents.trim().is_empty() => contents.trim().to_string(),
        _ => UNKNOWN.to_string(),
    }
}
