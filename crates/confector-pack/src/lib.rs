//! Archive container for Confector.
//!
//! A Kubun archive is a small key-value file addressed by slash-separated
//! entry paths (`schemata/<name>.json`, `data/<name>.json`, `meta.json`).
//!
//! # Architecture
//!
//! - **Pack file**: header, zstd-compressed CRC-checked entries, BLAKE3 trailer
//! - **PackWriter** / **PackReader**: build and verify pack bytes
//! - **ArchiveStore**: the interface a collection registry writes through
//! - **PackArchive**: file-backed store, written atomically on close
//! - **InMemoryArchive**: shared in-memory store for tests and embedding

pub mod archive;
pub mod config;
pub mod entry;
pub mod error;
pub mod memory;
pub mod reader;
pub mod store;
pub mod writer;

pub use archive::PackArchive;
pub use config::PackConfig;
pub use entry::PackEntry;
pub use error::{PackError, PackResult};
pub use memory::InMemoryArchive;
pub use reader::PackReader;
pub use store::ArchiveStore;
pub use writer::{PackFile, PackWriter};
