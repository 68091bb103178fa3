//! Configuration for extraction, alignment and aggregation
//!
//! Every section is optional in TOML and falls back to the defaults below.
//! The aggregation weights and level thresholds are placeholders until they
//! are calibrated against a labelled dataset.

use crate::error::{AnalysisError, Result};
use crate::features::FeatureKind;
use crate::similarity::LocalDistance;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    /// Wall-clock limit for a whole comparison; `0` disables it
    #[serde(default = "default_budget_secs")]
    pub budget_secs: Option<f64>,
}

/// Parameters that determine the extracted features of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    // Audio processing
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,

    // Cepstral
    #[serde(default = "default_mfcc_count")]
    pub mfcc_count: usize,
    #[serde(default = "default_mel_bands")]
    pub mel_bands: usize,
    #[serde(default)]
    pub mel_fmin: f32,
    /// Upper edge of the mel bank, Nyquist when unset
    #[serde(default)]
    pub mel_fmax: Option<f32>,

    // Chroma
    #[serde(default = "default_chroma_bins")]
    pub chroma_bins: usize,
    #[serde(default = "default_chroma_min_freq")]
    pub chroma_min_freq: f32,
    #[serde(default = "default_tuning_hz")]
    pub tuning_hz: f32,

    // Tempo
    #[serde(default = "default_min_bpm")]
    pub min_bpm: f32,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_length: default_frame_length(),
            hop_size: default_hop_size(),
            mfcc_count: default_mfcc_count(),
            mel_bands: default_mel_bands(),
            mel_fmin: 0.0,
            mel_fmax: None,
            chroma_bins: default_chroma_bins(),
            chroma_min_freq: default_chroma_min_freq(),
            tuning_hz: default_tuning_hz(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
        }
    }
}

impl ExtractionConfig {
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    pub fn mel_fmax_or_nyquist(&self) -> f32 {
        self.mel_fmax.unwrap_or_else(|| self.nyquist())
    }

    /// Feature frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Reject parameters the framer and extractors cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return invalid("sample_rate must be > 0");
        }
        if self.frame_length == 0 {
            return invalid("frame_length must be > 0");
        }
        if self.hop_size == 0 {
            return invalid("hop_size must be > 0");
        }
        if self.hop_size > self.frame_length {
            return invalid(format!(
                "hop_size ({}) must not exceed frame_length ({})",
                self.hop_size, self.frame_length
            ));
        }
        if self.mel_bands == 0 || self.mfcc_count == 0 {
            return invalid("mel_bands and mfcc_count must be > 0");
        }
        if self.mfcc_count > self.mel_bands {
            return invalid(format!(
                "mfcc_count ({}) must not exceed mel_bands ({})",
                self.mfcc_count, self.mel_bands
            ));
        }
        let fmax = self.mel_fmax_or_nyquist();
        if !(self.mel_fmin >= 0.0 && self.mel_fmin < fmax && fmax <= self.nyquist()) {
            return invalid(format!(
                "mel range {}..{} Hz must lie within 0..{} Hz",
                self.mel_fmin,
                fmax,
                self.nyquist()
            ));
        }
        if self.chroma_bins == 0 {
            return invalid("chroma_bins must be > 0");
        }
        if !(self.tuning_hz > 0.0 && self.chroma_min_freq > 0.0) {
            return invalid("tuning_hz and chroma_min_freq must be > 0");
        }
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) {
            return invalid("bpm range must satisfy 0 < min_bpm < max_bpm");
        }

        Ok(())
    }
}

/// DTW and report options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Sakoe-Chiba radius in frames; full matrix when unset
    #[serde(default)]
    pub dtw_band_radius: Option<usize>,
    #[serde(default)]
    pub local_distance: LocalDistance,
    #[serde(default)]
    pub include_alignment_path: bool,
    /// Feature whose warping path is reported
    #[serde(default = "default_alignment_feature")]
    pub alignment_feature: FeatureKind,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            dtw_band_radius: None,
            local_distance: LocalDistance::default(),
            include_alignment_path: false,
            alignment_feature: default_alignment_feature(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub weights: AggregationWeights,
    #[serde(default)]
    pub thresholds: SimilarityThresholds,
}

/// Relative weight of each per-feature score in the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationWeights {
    #[serde(default = "default_mfcc_weight")]
    pub mfcc: f64,
    #[serde(default = "default_chroma_weight")]
    pub chroma: f64,
    #[serde(default = "default_tempo_weight")]
    pub tempo: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            mfcc: default_mfcc_weight(),
            chroma: default_chroma_weight(),
            tempo: default_tempo_weight(),
        }
    }
}

/// Lower bounds (inclusive, in [0, 1]) of the moderate and high levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityThresholds {
    #[serde(default = "default_moderate_threshold")]
    pub moderate: f64,
    #[serde(default = "default_high_threshold")]
    pub high: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            moderate: default_moderate_threshold(),
            high: default_high_threshold(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            similarity: SimilarityConfig::default(),
            aggregation: AggregationConfig::default(),
            budget_secs: default_budget_secs(),
        }
    }
}

fn default_sample_rate() -> u32 {
    22050
}
fn default_frame_length() -> usize {
    2048
}
fn default_hop_size() -> usize {
    512
}
fn default_mfcc_count() -> usize {
    13
}
fn default_mel_bands() -> usize {
    40
}
fn default_chroma_bins() -> usize {
    12
}
fn default_chroma_min_freq() -> f32 {
    32.7 // C1
}
fn default_tuning_hz() -> f32 {
    440.0
}
fn default_min_bpm() -> f32 {
    40.0
}
fn default_max_bpm() -> f32 {
    240.0
}
fn default_alignment_feature() -> FeatureKind {
    FeatureKind::Chroma
}
fn default_mfcc_weight() -> f64 {
    0.5
}
fn default_chroma_weight() -> f64 {
    0.4
}
fn default_tempo_weight() -> f64 {
    0.1
}
fn default_moderate_threshold() -> f64 {
    0.40
}
fn default_high_threshold() -> f64 {
    0.70
}
fn default_budget_secs() -> Option<f64> {
    Some(30.0)
}

impl AnalysisConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;

        let w = &self.aggregation.weights;
        let weights = [w.mfcc, w.chroma, w.tempo];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("aggregation weights must be finite and non-negative");
        }
        if w.mfcc + w.chroma <= 0.0 {
            return invalid("at least one of the mfcc/chroma weights must be > 0");
        }

        let t = &self.aggregation.thresholds;
        if !(0.0 <= t.moderate && t.moderate <= t.high && t.high <= 1.0) {
            return invalid("thresholds must satisfy 0 <= moderate <= high <= 1");
        }

        if let Some(secs) = self.budget_secs {
            if !secs.is_finite() || secs < 0.0 {
                return invalid("budget_secs must be a non-negative number");
            }
        }

        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(AnalysisError::InvalidConfig(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.frame_length, 2048);
        assert_eq!(config.extraction.hop_size, 512);
        assert_eq!(config.extraction.mfcc_count, 13);
        assert_eq!(config.extraction.chroma_bins, 12);
        assert!(config.similarity.dtw_band_radius.is_none());
    }

    #[test]
    fn test_hop_larger_than_frame_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.extraction.hop_size = 4096;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        config.extraction.hop_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extraction_rejects_unusable_feature_sizes() {
        let mut config = ExtractionConfig::default();
        config.chroma_bins = 0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        let mut config = ExtractionConfig::default();
        config.mfcc_count = config.mel_bands + 1;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let mut config = AnalysisConfig::default();
        config.aggregation.thresholds.moderate = 0.8;
        config.aggregation.thresholds.high = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            budget_secs = 10.0

            [extraction]
            sample_rate = 16000
            hop_size = 256

            [similarity]
            dtw_band_radius = 40
            local_distance = "euclidean"
            include_alignment_path = true

            [aggregation.weights]
            tempo = 0.0
        "#;

        let config: AnalysisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.extraction.sample_rate, 16000);
        assert_eq!(config.extraction.hop_size, 256);
        assert_eq!(config.extraction.frame_length, 2048);
        assert_eq!(config.similarity.dtw_band_radius, Some(40));
        assert_eq!(config.similarity.local_distance, LocalDistance::Euclidean);
        assert!(config.similarity.include_alignment_path);
        assert_eq!(config.aggregation.weights.tempo, 0.0);
        assert_eq!(config.aggregation.weights.mfcc, 0.5);
        assert_eq!(config.budget_secs, Some(10.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let example = include_str!("../../../melodiff.example.toml");
        let config: AnalysisConfig = toml::from_str(example).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melodiff.toml");
        std::fs::write(&path, "[extraction]\nmfcc_count = 20\n").unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.extraction.mfcc_count, 20);

        std::fs::write(&path, "[extraction]\nmfcc_count = 80\n").unwrap();
        assert!(AnalysisConfig::load(&path).is_err());
    }
}
