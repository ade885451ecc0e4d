//! Staged output: files are written into a temporary directory inside the
//! destination, then renamed into place once everything succeeded.
//!
//! Files already in the destination are set aside while committing. If a
//! rename fails, the new files are removed and the old ones restored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{CorpusError, Result};

use super::EmittedFile;

/// Directory inside the staging area holding the files a commit replaces.
const REPLACED_DIR: &str = ".replaced";

pub(crate) struct StagedOutput {
    destination: PathBuf,
    /// Removed with its content when dropped, including on error paths.
    staging: TempDir,
    files: Vec<EmittedFile>,
}

impl StagedOutput {
    pub fn create(destination: &Path) -> Result<Self> {
        fs::create_dir_all(destination).map_err(|e| CorpusError::io(destination, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".corpusmill-")
            .tempdir_in(destination)
            .map_err(|e| CorpusError::io(destination, e))?;
        Ok(Self {
            destination: destination.to_path_buf(),
            staging,
            files: Vec::new(),
        })
    }

    /// Write a CSV table with a header line.
    pub fn write_table<I>(&mut self, file: &str, headers: &[String], rows: I) -> Result<()>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(headers)?;
        let mut count = 0;
        for row in rows {
            writer.write_record(&row)?;
            count += 1;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CorpusError::io(self.staging.path().join(file), e.into_error()))?;
        self.write_bytes(file, &bytes, count)
    }

    /// Write a pretty-printed JSON document.
    pub fn write_json<T: Serialize>(&mut self, file: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(file, &bytes, 0)
    }

    fn write_bytes(&mut self, file: &str, bytes: &[u8], rows: usize) -> Result<()> {
        let path = self.staging.path().join(file);
        fs::write(&path, bytes).map_err(|e| CorpusError::io(&path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hash = format!("sha256:{:x}", hasher.finalize());
        debug!(file, rows, bytes = bytes.len(), "staged file");

        self.files.push(EmittedFile {
            file: file.to_string(),
            rows,
            hash,
        });
        Ok(())
    }

    /// Move every staged file into the destination.
    pub fn commit(self) -> Result<Vec<EmittedFile>> {
        let replaced_dir = self.staging.path().join(REPLACED_DIR);
        fs::create_dir(&replaced_dir).map_err(|e| CorpusError::io(&replaced_dir, e))?;

        let mut moved: Vec<&str> = Vec::new();
        let mut replaced: Vec<&str> = Vec::new();
        for emitted in &self.files {
            let file = emitted.file.as_str();
            if let Err(error) = self.move_into_place(file, &replaced_dir, &mut replaced) {
                self.roll_back(&moved, &replaced, &replaced_dir);
                return Err(error);
            }
            moved.push(file);
        }

        let staging = self.staging.path().to_path_buf();
        self.staging
            .close()
            .map_err(|e| CorpusError::io(staging, e))?;
        Ok(self.files)
    }

    fn move_into_place<'a>(
        &self,
        file: &'a str,
        replaced_dir: &Path,
        replaced: &mut Vec<&'a str>,
    ) -> Result<()> {
        let to = self.destination.join(file);
        if to.exists() {
            fs::rename(&to, replaced_dir.join(file)).map_err(|e| CorpusError::io(&to, e))?;
            replaced.push(file);
        }
        let from = self.staging.path().join(file);
        fs::rename(&from, &to).map_err(|e| CorpusError::io(&to, e))
    }

    /// Undo a partial commit as far as the file system allows.
    fn roll_back(&self, moved: &[&str], replaced: &[&str], replaced_dir: &Path) {
        for file in moved {
            let path = self.destination.join(file);
            if let Err(error) = fs::remove_file(&path) {
                warn!(path = %path.display(), %error, "could not remove a committed file");
            }
        }
        for file in replaced {
            let path = self.destination.join(file);
            if let Err(error) = fs::rename(replaced_dir.join(file), &path) {
                warn!(path = %path.display(), %error, "could not restore a replaced file");
            }
        }
        warn!(
            destination = %self.destination.display(),
            removed = moved.len(),
            restored = replaced.len(),
            "rolled back a failed commit"
        );
    }
}
