use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::PackConfig;
use crate::error::{PackError, PackResult};
use crate::reader::PackReader;
use crate::store::{matching, ArchiveStore};
use crate::writer::{pack_dir, PackWriter};

/// File-backed archive.
///
/// Entries are buffered in memory while the archive is open and written as
/// a single pack file on [`close`](ArchiveStore::close). After closing, reads
/// are served from the verified file on disk.
#[derive(Debug)]
pub struct PackArchive {
    path: PathBuf,
    writer: Option<PackWriter>,
    reader: Option<PackReader>,
}

impl PackArchive {
    /// Start a new, empty archive at `path`.
    ///
    /// The parent directory is created and checked for writability now; the
    /// pack file itself is written when the archive is closed.
    pub fn create(path: impl Into<PathBuf>, config: PackConfig) -> PackResult<Self> {
        let path = path.into();
        if path.is_dir() {
            return Err(PackError::InvalidPath(path.display().to_string()));
        }
        let dir = pack_dir(&path);
        std::fs::create_dir_all(dir)?;
        tempfile::NamedTempFile::new_in(dir)?;
        debug!(path = %path.display(), "created pack archive");
        Ok(Self {
            path,
            writer: Some(PackWriter::new(config)),
            reader: None,
        })
    }

    /// Open `path` for appending: existing entries are loaded, new writes
    /// are added on top. A missing file starts an empty archive.
    pub fn open(path: impl Into<PathBuf>, config: PackConfig) -> PackResult<Self> {
        let path = path.into();
        let mut writer = PackWriter::new(config);
        if path.exists() {
            let existing = PackReader::open(&path)?;
            for entry_path in existing.paths() {
                let data = existing
                    .read_entry(entry_path)?
                    .ok_or_else(|| PackError::EntryNotFound(entry_path.to_string()))?;
                writer.add_entry(entry_path, &data)?;
            }
            debug!(path = %path.display(), entries = writer.len(), "loaded existing pack");
        }
        Ok(Self {
            path,
            writer: Some(writer),
            reader: None,
        })
    }

    /// Location of the pack file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl ArchiveStore for PackArchive {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> PackResult<()> {
        let writer = self.writer.as_mut().ok_or(PackError::Closed)?;
        writer.add_entry(path, data)
    }

    fn read_entry(&self, path: &str) -> PackResult<Vec<u8>> {
        let found = match (&self.writer, &self.reader) {
            (Some(writer), _) => writer.get(path).map(<[u8]>::to_vec),
            (None, Some(reader)) => reader.read_entry(path)?,
            (None, None) => return Err(PackError::Closed),
        };
        found.ok_or_else(|| PackError::EntryNotFound(path.to_string()))
    }

    fn entry_exists(&self, path: &str) -> bool {
        match (&self.writer, &self.reader) {
            (Some(writer), _) => writer.get(path).is_some(),
            (None, Some(reader)) => reader.contains(path),
            (None, None) => false,
        }
    }

    fn list_entries(&self, pattern: &str) -> PackResult<Vec<String>> {
        match (&self.writer, &self.reader) {
            (Some(writer), _) => matching(writer.paths(), pattern),
            (None, Some(reader)) => matching(reader.paths(), pattern),
            (None, None) => Err(PackError::Closed),
        }
    }

    fn close(&mut self) -> PackResult<()> {
        let writer = self.writer.take().ok_or(PackError::Closed)?;
        let pack = writer.finish(&self.path)?;
        info!(
            path = %pack.path.display(),
            entries = pack.entry_count,
            checksum = %hex::encode(pack.checksum),
            "wrote pack"
        );
        self.reader = Some(PackReader::open(&self.path)?);
        Ok(())
    }
}
