//! Melodiff feature file format and feature cache

pub mod error;
pub mod format;
pub mod json_format;
pub mod key;
pub mod reader;
pub mod store;
pub mod writer;

pub use error::StoreError;
pub use format::{MdfFile, MdfHeader, MdfMetadata, MAGIC, VERSION};
pub use json_format::MdfJsonFile;
pub use key::FeatureKey;
pub use reader::MdfReader;
pub use store::{extract_cached, DirectoryStore, FeatureStore, MemoryStore};
pub use writer::MdfWriter;
