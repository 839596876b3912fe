use crate::util::ensure_dir;
use crate::workflow::ProjectRecord;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Copies of original uploads kept next to the tool, independent of Drive.
pub struct LocalBackup {
    dir: PathBuf,
}

impl LocalBackup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{dir}/{campaign}_{influencer}_{version}_{file}`.
    pub fn path_for(&self, record: &ProjectRecord) -> PathBuf {
        let name = format!(
            "{}_{}_{}_{}",
            path_safe(&record.campaign),
            path_safe(&record.influencer),
            path_safe(&record.version),
            path_safe(&record.source_file.name)
        );
        self.dir.join(name)
    }

    pub fn save(&self, record: &ProjectRecord) -> Result<PathBuf> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(record);
        std::fs::write(&path, &record.source_file.bytes)
            .with_context(|| format!("writing backup {}", path.display()))?;
        Ok(path)
    }
}

/// Path separators would turn a component into a directory.
fn path_safe(s: &str) -> String {
    s.replace(['/', '\\'], "-")
}
