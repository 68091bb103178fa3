//! JSON format for feature files
//!
//! Human-readable alternative to .mdf carrying the full feature matrices,
//! per-dimension statistics and the extraction parameters.

use crate::error::{Result, StoreError};
use crate::key::FeatureKey;
use melodiff_core::config::ExtractionConfig;
use melodiff_core::features::{FeatureKind, FeatureSequence, FeatureStats, TrackInfo};
use melodiff_core::{TempoEstimate, TrackFeatures};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete JSON feature file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdfJsonFile {
    pub version: String,
    pub metadata: MdfJsonMetadata,
    pub extraction: ExtractionConfig,
    pub tempo: TempoEstimate,
    pub mfcc: JsonFeature,
    pub chroma: JsonFeature,
}

/// Metadata about the original audio file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdfJsonMetadata {
    pub original_path: String,
    pub filename: String,
    pub algorithm: String,
    pub sample_rate: u32,
    pub duration_s: f64,
    pub num_samples: usize,
    pub num_frames: usize,
    pub content_key: String,
    pub config_key: String,
    pub created_at: String,
}

/// One feature matrix with its statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonFeature {
    pub dim: usize,
    #[serde(default)]
    pub degenerate_frames: usize,
    pub stats: FeatureStats,
    /// [frame][dimension]
    pub frames: Vec<Vec<f32>>,
}

impl JsonFeature {
    fn from_sequence(sequence: &FeatureSequence) -> Self {
        Self {
            dim: sequence.dim(),
            degenerate_frames: sequence.degenerate_frames(),
            stats: sequence.stats(),
            frames: sequence.vectors().to_vec(),
        }
    }

    fn into_sequence(self, kind: FeatureKind) -> Result<FeatureSequence> {
        FeatureSequence::new(kind, self.dim, self.frames)
            .map(|seq| seq.with_degenerate_frames(self.degenerate_frames))
            .map_err(|e| StoreError::Metadata(e.to_string()))
    }
}

impl MdfJsonFile {
    /// Create a new JSON feature file
    pub fn new(
        original_path: &Path,
        features: &TrackFeatures,
        extraction: &ExtractionConfig,
        key: &FeatureKey,
    ) -> Self {
        let filename = original_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            version: "1.0".to_string(),
            metadata: MdfJsonMetadata {
                original_path: original_path.display().to_string(),
                filename,
                algorithm: crate::format::ALGORITHM_ID.to_string(),
                sample_rate: features.info.sample_rate,
                duration_s: features.info.duration_secs,
                num_samples: features.info.num_samples,
                num_frames: features.info.num_frames,
                content_key: format!("{:016x}", key.content),
                config_key: format!("{:016x}", key.config),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            extraction: extraction.clone(),
            tempo: features.tempo,
            mfcc: JsonFeature::from_sequence(&features.mfcc),
            chroma: JsonFeature::from_sequence(&features.chroma),
        }
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let mdf_file: MdfJsonFile = serde_json::from_str(&json_str)?;
        Ok(mdf_file)
    }

    /// Rebuild the in-memory features
    pub fn into_features(self) -> Result<TrackFeatures> {
        Ok(TrackFeatures {
            info: TrackInfo {
                duration_secs: self.metadata.duration_s,
                sample_rate: self.metadata.sample_rate,
                num_samples: self.metadata.num_samples,
                num_frames: self.metadata.num_frames,
            },
            mfcc: self.mfcc.into_sequence(FeatureKind::Mfcc)?,
            chroma: self.chroma.into_sequence(FeatureKind::Chroma)?,
            tempo: self.tempo,
        })
    }
}
