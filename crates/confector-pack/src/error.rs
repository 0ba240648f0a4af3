use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid pack magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("pack checksum mismatch")]
    ChecksumMismatch,

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("CRC32 mismatch for entry {path}")]
    CrcMismatch { path: String },

    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("invalid entry path {0:?}")]
    InvalidPath(String),

    #[error("invalid entry pattern: {0}")]
    InvalidPattern(String),

    #[error("archive is closed")]
    Closed,

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackResult<T> = Result<T, PackError>;
