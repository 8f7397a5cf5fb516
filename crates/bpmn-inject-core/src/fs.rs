use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::InjectResult;

const BACKUP_SUFFIX: &str = "bak";
const STAGING_SUFFIX: &str = "tmp";

/// Replaces `path` with `content` through a staged sibling file, so readers
/// see either the old document or the complete new one. With `backup`, an
/// existing `path` is copied to `<path>.bak` first.
pub fn write_atomic(path: &Path, content: &str, backup: bool) -> InjectResult<()> {
    let staged = StagedFile::reserve(path);
    staged.fill(content)?;

    if backup && path.exists() {
        fs::copy(path, backup_path(path))?;
    }

    staged.commit(path)
}

/// `<path>.bak`, next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    sibling(path, BACKUP_SUFFIX)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Temp file removed on drop unless it was renamed into place.
struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn reserve(target: &Path) -> Self {
        let mut attempt = 0u32;
        let path = loop {
            let suffix = match attempt {
                0 => STAGING_SUFFIX.to_string(),
                n => format!("{STAGING_SUFFIX}{n}"),
            };
            let candidate = sibling(target, &suffix);
            if !candidate.exists() {
                break candidate;
            }
            attempt += 1;
        };
        Self {
            path,
            committed: false,
        }
    }

    fn fill(&self, content: &str) -> InjectResult<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn commit(mut self, target: &Path) -> InjectResult<()> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
