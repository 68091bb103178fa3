//! End-to-end extraction and comparison
//!
//! Each track runs framing, the spectral transform and the three feature
//! extractors independently; the two tracks are processed with
//! `rayon::join` and meet again in the similarity stage.

use crate::aggregate::{Aggregator, FeatureComparison, SimilarityReport};
use crate::audio::SampleBuffer;
use crate::budget::Budget;
use crate::config::{AnalysisConfig, ExtractionConfig};
use crate::error::{AnalysisError, Result, Stage, Track};
use crate::features::{
    ChromaExtractor, FeatureKind, MfccExtractor, TempoEstimator, TrackFeatures, TrackInfo,
};
use crate::framer::Framer;
use crate::similarity::{
    direct_similarity, effective_band_radius, mean_distance, profile_similarity, Dtw,
};
use crate::transform::SpectralEngine;
use std::collections::BTreeMap;


/// Extract every feature of one track
pub fn extract_features(
    buffer: &SampleBuffer,
    config: &ExtractionConfig,
    budget: &Budget,
    track: Track,
) -> Result<TrackFeatures> {
    config.validate()?;
    if buffer.is_empty() {
        return Err(AnalysisError::EmptyInput { track });
    }
    if buffer.sample_rate() != config.sample_rate {
        return Err(AnalysisError::InvalidConfig(format!(
            "{} is sampled at {} Hz but extraction expects {} Hz",
            track,
            buffer.sample_rate(),
            config.sample_rate
        )));
    }

    let mono = buffer.to_mono().normalized();
    let framer = Framer::new(config.frame_length, config.hop_size)?;
    let engine = SpectralEngine::new(config.frame_length);

    log::info!(
        "{}: {:.2}s at {} Hz, {} frames",
        track,
        mono.duration_secs(),
        mono.sample_rate(),
        framer.frame_count(mono.samples().len())
    );

    let spectrogram = engine.analyze(mono.samples(), mono.sample_rate(), &framer, budget, track)?;

    let mfcc = MfccExtractor::new(config);
    let chroma = ChromaExtractor::new(config);
    let tempo = TempoEstimator::new(config);

    budget.check(Stage::Cepstral, Some(track))?;
    let (mfcc, (chroma, tempo)) = rayon::join(
        || mfcc.extract(&spectrogram, track),
        || {
            rayon::join(
                || chroma.extract(&spectrogram, track),
                || tempo.estimate(&spectrogram, track),
            )
        },
    );

    Ok(TrackFeatures {
        info: TrackInfo {
            duration_secs: mono.duration_secs(),
            sample_rate: mono.sample_rate(),
            num_samples: mono.samples().len(),
            num_frames: spectrogram.num_frames(),
        },
        mfcc: mfcc?,
        chroma: chroma?,
        tempo: tempo?,
    })
}

/// Compare two sample buffers under the configured time budget
pub fn compare_buffers(
    a: &SampleBuffer,
    b: &SampleBuffer,
    config: &AnalysisConfig,
) -> Result<SimilarityReport> {
    compare_buffers_with_budget(a, b, config, &Budget::from_secs(config.budget_secs))
}

/// Compare two sample buffers; a failure on one track cancels the other
pub fn compare_buffers_with_budget(
    a: &SampleBuffer,
    b: &SampleBuffer,
    config: &AnalysisConfig,
    budget: &Budget,
) -> Result<SimilarityReport> {
    config.validate()?;

    let extract = |buffer: &SampleBuffer, track: Track| {
        extract_features(buffer, &config.extraction, budget, track).inspect_err(|e| {
            log::debug!("{} failed, cancelling the other track: {}", track, e);
            budget.cancel();
        })
    };

    let (features_a, features_b) =
        match rayon::join(|| extract(a, Track::A), || extract(b, Track::B)) {
            (Ok(fa), Ok(fb)) => (fa, fb),
            // prefer the root cause over the cancellation it triggered
            (Err(ea), Err(eb)) => {
                return Err(if is_budget_error(&ea) && !is_budget_error(&eb) {
                    eb
                } else {
                    ea
                });
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

    compare_features(&features_a, &features_b, config, budget)
}

fn is_budget_error(err: &AnalysisError) -> bool {
    matches!(err, AnalysisError::BudgetExceeded { .. })
}

/// Compare two sets of already extracted features
pub fn compare_features(
    a: &TrackFeatures,
    b: &TrackFeatures,
    config: &AnalysisConfig,
    budget: &Budget,
) -> Result<SimilarityReport> {
    let kinds = [FeatureKind::Mfcc, FeatureKind::Chroma];
    for kind in kinds {
        let (sa, sb) = (a.sequence(kind), b.sequence(kind));
        if sa.dim() != sb.dim() {
            return Err(AnalysisError::IncompatibleInput {
                kind,
                left: sa.dim(),
                right: sb.dim(),
            });
        }
    }

    let sim = &config.similarity;
    let mut features = BTreeMap::new();
    let mut alignment_path = None;
    let mut effective_radius = None;

    for kind in kinds {
        budget.check(Stage::Similarity, None)?;
        let (sa, sb) = (a.sequence(kind), b.sequence(kind));
        let keep_path = sim.include_alignment_path && kind == sim.alignment_feature;

        let alignment = Dtw::new(sim.local_distance)
            .with_band(sim.dtw_band_radius)
            .with_path(keep_path)
            .align(sa, sb, budget)?;

        if let Some(r) = sim.dtw_band_radius {
            effective_radius = Some(effective_band_radius(r, sa.len(), sb.len()));
        }
        if keep_path {
            alignment_path = alignment.path.clone();
        }

        features.insert(
            kind.name().to_string(),
            FeatureComparison {
                dim: sa.dim(),
                frames_a: sa.len(),
                frames_b: sb.len(),
                dtw_score: alignment.score,
                dtw_normalized_cost: alignment.normalized_cost,
                dtw_path_length: alignment.path_length,
                direct_similarity: direct_similarity(sa, sb)?,
                profile_similarity: profile_similarity(sa, sb)?,
                mean_distance: mean_distance(sa, sb)?,
            },
        );
    }

    let report = Aggregator::new(&config.aggregation).report(
        features,
        a.tempo,
        b.tempo,
        sim.local_distance,
        (sim.dtw_band_radius, effective_radius),
        alignment_path,
    )?;

    log::info!("Similarity {}", report.summary());
    Ok(report)
}
