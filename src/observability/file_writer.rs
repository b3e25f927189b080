//! Size-rotated line writer for trace files.
//!
//! When the file would grow past its limit it is shifted to `<name>.1`,
//! `<name>.1` to `<name>.2`, and so on; the oldest backup beyond the retention
//! count is dropped.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

const MAX_BACKUP_FILES: usize = 3;

/// Thread-safe appender that rotates by size.
pub struct FileWriter {
    file_path: PathBuf,
    max_bytes: u64,
    /// Open handle and bytes written to it.
    state: Mutex<Option<(File, u64)>>,
}

impl FileWriter {
    /// The file is opened lazily on the first write.
    pub const fn new(file_path: PathBuf) -> Self {
        Self::with_max_bytes(file_path, MAX_FILE_SIZE_BYTES)
    }

    pub const fn with_max_bytes(file_path: PathBuf, max_bytes: u64) -> Self {
        Self {
            file_path,
            max_bytes,
            state: Mutex::new(None),
        }
    }

    /// Appends `line` plus a newline, rotating first if it would not fit.
    ///
    /// # Errors
    ///
    /// Open, rename or write failures, or a poisoned lock.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Mutex poisoned: {e}")))?;

        let incoming = line.len() as u64 + 1;
        let size = match state.as_ref() {
            Some((_, size)) => *size,
            None => fs::metadata(&self.file_path).map(|m| m.len()).unwrap_or(0),
        };
        if size > 0 && size + incoming > self.max_bytes {
            *state = None;
            self.rotate()?;
        }

        if state.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
            let size = file.metadata().map(|m| m.len()).unwrap_or(0);
            *state = Some((file, size));
        }

        let Some((file, size)) = state.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::Other, "No file available"));
        };
        writeln!(file, "{line}")?;
        file.flush()?;
        *size += incoming;
        Ok(())
    }

    fn rotate(&self) -> io::Result<()> {
        let oldest = backup_path(&self.file_path, MAX_BACKUP_FILES);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..MAX_BACKUP_FILES).rev() {
            let from = backup_path(&self.file_path, n);
            if from.exists() {
                fs::rename(&from, backup_path(&self.file_path, n + 1))?;
            }
        }
        if self.file_path.exists() {
            fs::rename(&self.file_path, backup_path(&self.file_path, 1))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file_path", &self.file_path)
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{n}"));
    path.with_file_name(name)
}
