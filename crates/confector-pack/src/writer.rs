use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::PackConfig;
use crate::entry::PackEntry;
use crate::error::{PackError, PackResult};

pub(crate) const PACK_MAGIC: &[u8; 4] = b"KBNP";
pub(crate) const PACK_VERSION: u32 = 1;
pub(crate) const HEADER_SIZE: usize = 12;
pub(crate) const CHECKSUM_SIZE: usize = 32;

/// Result of writing a pack file.
#[derive(Clone, Debug)]
pub struct PackFile {
    pub path: PathBuf,
    pub entry_count: usize,
    pub checksum: [u8; 32],
}

/// Builds a pack from named entries.
///
/// Entries keep the order in which they were first added; adding a path
/// that is already present replaces its data in place.
#[derive(Clone, Debug, Default)]
pub struct PackWriter {
    config: PackConfig,
    entries: Vec<PackEntry>,
}

impl PackWriter {
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    /// Add or replace an entry.
    pub fn add_entry(&mut self, path: &str, data: &[u8]) -> PackResult<()> {
        let entry = PackEntry::new(path, data.to_vec())?;
        match self.entries.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => existing.data = entry.data,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    /// Data of a queued entry.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.data.as_slice())
    }

    /// Paths of all queued entries, in pack order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    /// Number of entries queued.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the pack to `path`.
    ///
    /// The pack is written to a temporary file next to `path` and renamed
    /// into place, so an existing pack is never left half-overwritten.
    pub fn finish(self, path: &Path) -> PackResult<PackFile> {
        let entry_count = self.entries.len();
        let pack_data = self.finish_to_bytes()?;
        let checksum = trailer_checksum(&pack_data);

        let dir = pack_dir(path);
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&pack_data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| PackError::Io(e.error))?;

        Ok(PackFile {
            path: path.to_path_buf(),
            entry_count,
            checksum,
        })
    }

    /// Build the pack bytes in memory (no disk I/O).
    pub fn finish_to_bytes(self) -> PackResult<Vec<u8>> {
        let mut pack_data = Vec::new();

        // Header: magic + version + entry count
        pack_data.extend_from_slice(PACK_MAGIC);
        pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for entry in &self.entries {
            let compressed = zstd::encode_all(entry.data.as_slice(), self.config.compression_level)
                .map_err(|e| PackError::CompressionFailed(e.to_string()))?;

            encode_varint(&mut pack_data, entry.path.len() as u64);
            pack_data.extend_from_slice(entry.path.as_bytes());
            encode_varint(&mut pack_data, entry.data.len() as u64);
            encode_varint(&mut pack_data, compressed.len() as u64);
            pack_data.extend_from_slice(&crc32fast::hash(&compressed).to_be_bytes());
            pack_data.extend_from_slice(&compressed);
        }

        // Trailer: BLAKE3 checksum of everything so far
        let checksum = *blake3::hash(&pack_data).as_bytes();
        pack_data.extend_from_slice(&checksum);

        Ok(pack_data)
    }
}

fn trailer_checksum(pack_data: &[u8]) -> [u8; 32] {
    let mut checksum = [0u8; CHECKSUM_SIZE];
    checksum.copy_from_slice(&pack_data[pack_data.len() - CHECKSUM_SIZE..]);
    checksum
}

/// Encode a u64 as a variable-length integer.
/// Directory the pack file at `path` is written into.
pub(crate) fn pack_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8]) -> PackResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(PackError::CorruptEntry {
        offset: 0,
        reason: "truncated varint".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip_small() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 42);
        let (val, consumed) = decode_varint(&buf).unwrap();
        assert_eq!(val, 42);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn varint_max_u64() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, u64::MAX);
        let (val, _) = decode_varint(&buf).unwrap();
        assert_eq!(val, u64::MAX);
    }

    #[test]
    fn decode_varint_truncated() {
        let err = decode_varint(&[0x80]).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn add_entry_replaces_existing_path() {
        let mut writer = PackWriter::default();
        writer.add_entry("schemata/animal.json", b"v1").unwrap();
        writer.add_entry("meta.json", b"{}").unwrap();
        writer.add_entry("schemata/animal.json", b"v2").unwrap();

        assert_eq!(writer.len(), 2);
        assert_eq!(writer.get("schemata/animal.json"), Some(&b"v2"[..]));
        let paths: Vec<_> = writer.paths().collect();
        assert_eq!(paths, vec!["schemata/animal.json", "meta.json"]);
    }

    #[test]
    fn add_entry_rejects_invalid_path() {
        let mut writer = PackWriter::default();
        assert!(matches!(
            writer.add_entry("/etc/passwd", b""),
            Err(PackError::InvalidPath(_))
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn header_layout() {
        let mut writer = PackWriter::default();
        writer.add_entry("a", b"x").unwrap();
        let bytes = writer.finish_to_bytes().unwrap();
        assert_eq!(&bytes[0..4], PACK_MAGIC);
        assert_eq!(u32::from_be_bytes(bytes[4..8].try_into().unwrap()), PACK_VERSION);
        assert_eq!(u32::from_be_bytes(bytes[8..12].try_into().unwrap()), 1);
        // path length varint + path
        assert_eq!(bytes[12], 1);
        assert_eq!(bytes[13], b'a');
    }

    #[test]
    fn finish_writes_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("animals.kbn");

        let mut writer = PackWriter::default();
        writer.add_entry("meta.json", b"{}").unwrap();
        let pack = writer.finish(&path).unwrap();

        assert_eq!(pack.entry_count, 1);
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(&on_disk[on_disk.len() - 32..], &pack.checksum);
        // only the pack itself remains in the directory
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
