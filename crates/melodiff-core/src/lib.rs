//! Melodiff Core - Audio Similarity Library
//!
//! This crate compares two pieces of audio by their timbre (MFCC), harmony
//! (chroma) and tempo. Frame sequences are aligned with dynamic time warping
//! so the score tolerates tempo differences, and the per-feature scores are
//! combined into one weighted report.

pub mod aggregate;
pub mod audio;
pub mod budget;
pub mod config;
pub mod error;
pub mod features;
pub mod framer;
pub mod pipeline;
pub mod similarity;
pub mod transform;

pub use aggregate::{Aggregator, SimilarityLevel, SimilarityReport};
pub use audio::SampleBuffer;
pub use budget::Budget;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Stage, Track};
pub use features::{FeatureKind, FeatureSequence, TempoEstimate, TrackFeatures};
pub use pipeline::{
    compare_buffers, compare_buffers_with_budget, compare_features, extract_features,
};

use std::path::Path;

/// Decode an audio file and extract its features
pub fn extract_file(
    audio_path: &Path,
    config: &AnalysisConfig,
    track: Track,
) -> anyhow::Result<TrackFeatures> {
    // Decode to mono at the analysis rate
    let buffer = audio::decode_audio(audio_path, config.extraction.sample_rate)?;

    let budget = Budget::from_secs(config.budget_secs);
    let features = extract_features(&buffer, &config.extraction, &budget, track)?;

    Ok(features)
}

/// Decode two audio files and compare them
pub fn compare_files(
    path_a: &Path,
    path_b: &Path,
    config: &AnalysisConfig,
) -> anyhow::Result<SimilarityReport> {
    let (a, b) = rayon::join(
        || audio::decode_audio(path_a, config.extraction.sample_rate),
        || audio::decode_audio(path_b, config.extraction.sample_rate),
    );

    Ok(compare_buffers(&a?, &b?, config)?)
}
