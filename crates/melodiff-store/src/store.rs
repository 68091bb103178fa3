//! Keyed feature caches
//!
//! The analysis core never memoizes; callers that want to reuse extracted
//! features go through a [`FeatureStore`].

use crate::error::{Result, StoreError};
use crate::format::{MdfFile, MdfMetadata, ALGORITHM_ID};
use crate::key::FeatureKey;
use crate::reader::MdfReader;
use crate::writer::MdfWriter;
use melodiff_core::config::ExtractionConfig;
use melodiff_core::{extract_features, Budget, SampleBuffer, Track, TrackFeatures};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub trait FeatureStore: Send + Sync {
    fn get(&self, key: &FeatureKey) -> Result<Option<TrackFeatures>>;

    fn put(&self, key: &FeatureKey, features: &TrackFeatures) -> Result<()>;
}

/// One .mdf file per key inside a directory
pub struct DirectoryStore {
    dir: PathBuf,
    writer: MdfWriter,
}

impl DirectoryStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            writer: MdfWriter::new(),
        })
    }

    pub fn path_for(&self, key: &FeatureKey) -> PathBuf {
        self.dir.join(format!("{}.mdf", key.file_stem()))
    }
}

impl FeatureStore for DirectoryStore {
    fn get(&self, key: &FeatureKey) -> Result<Option<TrackFeatures>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        match MdfReader::read(&path) {
            Ok(file) => {
                if file.metadata.content_key != key.content
                    || file.metadata.config_key != key.config
                {
                    log::warn!("Cached file {} belongs to another key, ignoring", path.display());
                    return Ok(None);
                }
                log::debug!("Cache hit for {}", key);
                Ok(Some(file.features))
            }
            // A damaged entry is a miss; the next put overwrites it
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn put(&self, key: &FeatureKey, features: &TrackFeatures) -> Result<()> {
        let metadata = MdfMetadata {
            algorithm_id: ALGORITHM_ID.to_string(),
            extraction_params: key.params.clone(),
            original_filename: String::new(),
            content_key: key.content,
            config_key: key.config,
        };
        let path = self.path_for(key);
        self.writer.write(&path, &MdfFile::new(features.clone(), metadata))?;
        log::debug!("Cached features for {} at {}", key, path.display());
        Ok(())
    }
}

/// In-process store, mainly for tests and batch runs
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<FeatureKey, TrackFeatures>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeatureStore for MemoryStore {
    fn get(&self, key: &FeatureKey) -> Result<Option<TrackFeatures>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Metadata("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &FeatureKey, features: &TrackFeatures) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Metadata("memory store lock poisoned".to_string()))?;
        entries.insert(key.clone(), features.clone());
        Ok(())
    }
}

/// Features of `buffer` from `store`, extracting and storing them on a miss
pub fn extract_cached(
    store: &dyn FeatureStore,
    buffer: &SampleBuffer,
    config: &ExtractionConfig,
    budget: &Budget,
    track: Track,
) -> anyhow::Result<TrackFeatures> {
    let key = FeatureKey::new(buffer, config)?;
    if let Some(features) = store.get(&key)? {
        log::info!("{}: reusing cached features {}", track, key);
        return Ok(features);
    }

    let features = extract_features(buffer, config, budget, track)?;
    store.put(&key, &features)?;
    Ok(features)
}
