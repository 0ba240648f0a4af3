use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PackError, PackResult};
use crate::writer::{decode_varint, CHECKSUM_SIZE, HEADER_SIZE, PACK_MAGIC, PACK_VERSION};

#[derive(Clone, Copy, Debug)]
struct EntryLocation {
    /// Offset of the entry header (for error reporting).
    offset: usize,
    /// Offset of the compressed data.
    data_offset: usize,
    compressed_size: usize,
    uncompressed_size: u64,
    crc32: u32,
}

/// Reads entries from an in-memory pack.
///
/// The whole pack is verified against its trailer checksum on open; each
/// entry is additionally CRC-checked when it is read.
#[derive(Debug)]
pub struct PackReader {
    pack_data: Vec<u8>,
    order: Vec<String>,
    index: BTreeMap<String, EntryLocation>,
}

impl PackReader {
    /// Open from raw bytes.
    pub fn from_bytes(pack_data: Vec<u8>) -> PackResult<Self> {
        if pack_data.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        if &pack_data[0..4] != PACK_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(PACK_MAGIC).into(),
                actual: String::from_utf8_lossy(&pack_data[0..4]).into(),
            });
        }
        let version = read_u32(&pack_data, 4);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let body_end = pack_data.len() - CHECKSUM_SIZE;
        if blake3::hash(&pack_data[..body_end]).as_bytes() != &pack_data[body_end..] {
            return Err(PackError::ChecksumMismatch);
        }

        let count = read_u32(&pack_data, 8) as usize;
        let mut order = Vec::with_capacity(count);
        let mut index = BTreeMap::new();
        let mut pos = HEADER_SIZE;

        for _ in 0..count {
            let offset = pos;
            let corrupt = |reason: &str| PackError::CorruptEntry {
                offset: offset as u64,
                reason: reason.to_string(),
            };

            let (path_len, consumed) = decode_varint(&pack_data[pos..body_end])?;
            pos += consumed;
            let path_end = pos
                .checked_add(path_len as usize)
                .filter(|end| *end <= body_end)
                .ok_or_else(|| corrupt("path extends beyond pack"))?;
            let path = std::str::from_utf8(&pack_data[pos..path_end])
                .map_err(|_| corrupt("path is not UTF-8"))?
                .to_string();
            pos = path_end;

            let (uncompressed_size, consumed) = decode_varint(&pack_data[pos..body_end])?;
            pos += consumed;
            let (compressed_size, consumed) = decode_varint(&pack_data[pos..body_end])?;
            pos += consumed;

            if pos + 4 > body_end {
                return Err(corrupt("truncated CRC"));
            }
            let crc32 = read_u32(&pack_data, pos);
            pos += 4;

            let data_end = pos
                .checked_add(compressed_size as usize)
                .filter(|end| *end <= body_end)
                .ok_or_else(|| corrupt("compressed data extends beyond pack"))?;

            let location = EntryLocation {
                offset,
                data_offset: pos,
                compressed_size: compressed_size as usize,
                uncompressed_size,
                crc32,
            };
            if index.insert(path.clone(), location).is_some() {
                return Err(corrupt("duplicate entry path"));
            }
            order.push(path);
            pos = data_end;
        }

        if pos != body_end {
            return Err(PackError::CorruptEntry {
                offset: pos as u64,
                reason: "trailing bytes after last entry".into(),
            });
        }

        Ok(Self {
            pack_data,
            order,
            index,
        })
    }

    /// Open a pack file from disk.
    pub fn open(path: &Path) -> PackResult<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Read and decompress an entry. `Ok(None)` if the path is absent.
    pub fn read_entry(&self, path: &str) -> PackResult<Option<Vec<u8>>> {
        let Some(location) = self.index.get(path) else {
            return Ok(None);
        };
        let compressed = &self.pack_data
            [location.data_offset..location.data_offset + location.compressed_size];

        if crc32fast::hash(compressed) != location.crc32 {
            return Err(PackError::CrcMismatch {
                path: path.to_string(),
            });
        }

        let decompressed = zstd::decode_all(compressed)
            .map_err(|e| PackError::DecompressionFailed(e.to_string()))?;

        if decompressed.len() as u64 != location.uncompressed_size {
            return Err(PackError::CorruptEntry {
                offset: location.offset as u64,
                reason: format!(
                    "size mismatch: expected {}, got {}",
                    location.uncompressed_size,
                    decompressed.len()
                ),
            });
        }
        Ok(Some(decompressed))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn entry_count(&self) -> usize {
        self.order.len()
    }

    /// Entry paths in pack order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Trailer checksum of the pack.
    pub fn checksum(&self) -> [u8; 32] {
        let mut checksum = [0u8; CHECKSUM_SIZE];
        checksum.copy_from_slice(&self.pack_data[self.pack_data.len() - CHECKSUM_SIZE..]);
        checksum
    }
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}
