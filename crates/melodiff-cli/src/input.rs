//! Loading configuration and track features from the command line
//!
//! A track argument is either an audio file, which is decoded and analysed,
//! or a feature file written by `mdextract` (`.mdf` or `.json`).

use anyhow::{Context, Result};
use melodiff_core::audio::{self, AudioFormat};
use melodiff_core::config::ExtractionConfig;
use melodiff_core::{
    extract_features, AnalysisConfig, AnalysisError, Budget, Track, TrackFeatures,
};
use melodiff_store::{extract_cached, FeatureStore, MdfJsonFile, MdfReader};
use std::path::Path;

/// How a track argument is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Audio,
    Mdf,
    Json,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "mdf" => Some(InputKind::Mdf),
            "json" => Some(InputKind::Json),
            _ if AudioFormat::from_path(path).is_supported() => Some(InputKind::Audio),
            _ => None,
        }
    }
}

/// Configuration from `--config`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            AnalysisConfig::load(path)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Features of one track argument
pub fn load_features(
    path: &Path,
    config: &ExtractionConfig,
    store: Option<&dyn FeatureStore>,
    budget: &Budget,
    track: Track,
) -> Result<TrackFeatures> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let kind = InputKind::from_path(path)
        .with_context(|| format!("Unsupported input: {}", path.display()))?;
    log::info!("{}: loading {} as {:?}", track, path.display(), kind);

    match kind {
        InputKind::Audio => {
            let buffer = audio::decode_audio(path, config.sample_rate)?;
            match store {
                Some(store) => extract_cached(store, &buffer, config, budget, track),
                None => Ok(extract_features(&buffer, config, budget, track)?),
            }
        }
        InputKind::Mdf => {
            let file = MdfReader::read(path)
                .with_context(|| format!("Failed to read feature file: {}", path.display()))?;
            let expected = serde_json::to_string(config)?;
            if file.metadata.extraction_params != expected {
                log::warn!(
                    "{}: {} was extracted with different parameters",
                    track,
                    path.display()
                );
            }
            Ok(file.features)
        }
        InputKind::Json => {
            let file = MdfJsonFile::load(path)
                .with_context(|| format!("Failed to read feature file: {}", path.display()))?;
            if &file.extraction != config {
                log::warn!(
                    "{}: {} was extracted with different parameters",
                    track,
                    path.display()
                );
            }
            Ok(file.into_features()?)
        }
    }
}

/// Features of both tracks, loaded in parallel; a failure on one track
/// cancels the other
pub fn load_pair(
    path_a: &Path,
    path_b: &Path,
    config: &ExtractionConfig,
    store: Option<&dyn FeatureStore>,
    budget: &Budget,
) -> Result<(TrackFeatures, TrackFeatures)> {
    let load = |path: &Path, track: Track| {
        load_features(path, config, store, budget, track).inspect_err(|e| {
            log::debug!("{} failed, cancelling the other track: {:#}", track, e);
            budget.cancel();
        })
    };

    match rayon::join(|| load(path_a, Track::A), || load(path_b, Track::B)) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        // report the root cause rather than the cancellation it triggered
        (Err(ea), Err(eb)) => Err(if is_budget_error(&ea) && !is_budget_error(&eb) {
            eb
        } else {
            ea
        }),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

fn is_budget_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::BudgetExceeded { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use melodiff_store::FeatureKey;
    use melodiff_core::SampleBuffer;

    #[test]
    fn test_input_kind() {
        assert_eq!(InputKind::from_path(Path::new("a.mdf")), Some(InputKind::Mdf));
        assert_eq!(InputKind::from_path(Path::new("a.JSON")), Some(InputKind::Json));
        assert_eq!(InputKind::from_path(Path::new("a.flac")), Some(InputKind::Audio));
        assert_eq!(InputKind::from_path(Path::new("a.txt")), None);
        assert_eq!(InputKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_load_json_features() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::default();
        let buffer = SampleBuffer::mono(vec![0.2; 8192], config.sample_rate).unwrap();
        let features =
            extract_features(&buffer, &config, &Budget::unlimited(), Track::A).unwrap();
        let key = FeatureKey::new(&buffer, &config).unwrap();

        let path = dir.path().join("track.json");
        MdfJsonFile::new(Path::new("track.wav"), &features, &config, &key)
            .save(&path)
            .unwrap();

        let loaded =
            load_features(&path, &config, None, &Budget::unlimited(), Track::B).unwrap();
        assert_eq!(loaded.info, features.info);
        assert_eq!(loaded.mfcc.len(), features.mfcc.len());
    }

    #[test]
    fn test_failed_track_cancels_the_other() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::default();
        let buffer = SampleBuffer::mono(vec![0.2; 8192], config.sample_rate).unwrap();
        let features =
            extract_features(&buffer, &config, &Budget::unlimited(), Track::A).unwrap();
        let key = FeatureKey::new(&buffer, &config).unwrap();
        let path = dir.path().join("track.json");
        MdfJsonFile::new(Path::new("track.wav"), &features, &config, &key)
            .save(&path)
            .unwrap();

        let budget = Budget::unlimited();
        let (a, b) = load_pair(&path, &path, &config, None, &budget).unwrap();
        assert_eq!(a.info, b.info);
        assert!(!budget.is_cancelled());

        let err = load_pair(
            Path::new("/nonexistent/track.wav"),
            &path,
            &config,
            None,
            &budget,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"), "{:#}", err);
        assert!(budget.is_cancelled());
    }

    #[test]
    fn test_missing_input() {
        let config = ExtractionConfig::default();
        assert!(load_features(
            Path::new("/nonexistent/track.wav"),
            &config,
            None,
            &Budget::unlimited(),
            Track::A
        )
        .is_err());
    }
}
