//! Errors raised while reading or writing feature files

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a feature file: magic bytes mismatch")]
    BadMagic,

    #[error("unsupported feature file version {0}")]
    UnsupportedVersion(u16),

    #[error("feature file is truncated: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("checksum mismatch: header {expected:016x}, payload {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("malformed metadata: {0}")]
    Metadata(String),

    #[error("payload encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("JSON feature file error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
