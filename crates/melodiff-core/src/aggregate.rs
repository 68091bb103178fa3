//! Combination of per-feature scores into one report
//!
//! The overall score is the weighted mean of the per-feature scores that
//! are present; a missing tempo score drops out and the remaining weights
//! are renormalized.

use crate::config::{AggregationConfig, AggregationWeights, SimilarityThresholds};
use crate::error::{AnalysisError, Result};
use crate::features::TempoEstimate;
use crate::similarity::LocalDistance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key of the tempo entry in `per_feature_scores`
pub const TEMPO_SCORE: &str = "tempo";

/// Coarse similarity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityLevel {
    Low,
    Moderate,
    High,
}

impl fmt::Display for SimilarityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityLevel::Low => f.write_str("low"),
            SimilarityLevel::Moderate => f.write_str("moderate"),
            SimilarityLevel::High => f.write_str("high"),
        }
    }
}

/// Diagnostics of one feature kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureComparison {
    pub dim: usize,
    pub frames_a: usize,
    pub frames_b: usize,
    /// DTW cost rescaled onto [0, 1]
    pub dtw_score: f64,
    pub dtw_normalized_cost: f64,
    pub dtw_path_length: usize,
    /// Mean cosine of index-matched frames
    pub direct_similarity: f64,
    /// Cosine of the mean vectors
    pub profile_similarity: f64,
    /// Euclidean distance of the mean vectors
    pub mean_distance: f64,
}

/// Settings a report was produced with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSettings {
    pub local_distance: LocalDistance,
    pub requested_band_radius: Option<usize>,
    /// Radius after widening to keep the alignment end reachable
    pub effective_band_radius: Option<usize>,
    pub weights: AggregationWeights,
    pub thresholds: SimilarityThresholds,
}

/// Outcome of comparing two tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// Weighted score in [0, 100]
    pub overall_score_percent: f64,
    pub level: SimilarityLevel,
    /// Feature name to score in [0, 1]
    pub per_feature_scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_path: Option<Vec<(usize, usize)>>,
    /// Diagnostics keyed by feature name
    pub features: BTreeMap<String, FeatureComparison>,
    pub tempo_a: TempoEstimate,
    pub tempo_b: TempoEstimate,
    pub settings: ComparisonSettings,
}

impl SimilarityReport {
    /// One-line summary for logs and terminals
    pub fn summary(&self) -> String {
        let scores: Vec<String> = self
            .per_feature_scores
            .iter()
            .map(|(name, score)| format!("{} {:.3}", name, score))
            .collect();
        format!(
            "{:.1}% ({}) [{}]",
            self.overall_score_percent,
            self.level,
            scores.join(", ")
        )
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: AggregationWeights,
    thresholds: SimilarityThresholds,
}

impl Aggregator {
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            weights: config.weights,
            thresholds: config.thresholds,
        }
    }

    fn weight_of(&self, name: &str) -> f64 {
        match name {
            "mfcc" => self.weights.mfcc,
            "chroma" => self.weights.chroma,
            TEMPO_SCORE => self.weights.tempo,
            _ => 0.0,
        }
    }

    /// Per-feature scores for the given comparisons and tempi
    pub fn feature_scores(
        &self,
        features: &BTreeMap<String, FeatureComparison>,
        tempo_a: &TempoEstimate,
        tempo_b: &TempoEstimate,
    ) -> BTreeMap<String, f64> {
        let mut scores: BTreeMap<String, f64> = features
            .iter()
            .map(|(name, cmp)| (name.clone(), cmp.dtw_score.clamp(0.0, 1.0)))
            .collect();
        if let Some(closeness) = tempo_a.closeness(tempo_b) {
            scores.insert(TEMPO_SCORE.to_string(), closeness);
        }
        scores
    }

    /// Weighted mean over the present scores, in [0, 1]
    pub fn overall(&self, scores: &BTreeMap<String, f64>) -> Result<f64> {
        let (weighted, total) = scores.iter().fold((0.0, 0.0), |(sum, total), (name, score)| {
            let w = self.weight_of(name);
            (sum + w * score, total + w)
        });

        if !(total > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "aggregation weights of the present scores ({}) sum to zero",
                scores.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        }
        Ok((weighted / total).clamp(0.0, 1.0))
    }

    pub fn level(&self, score: f64) -> SimilarityLevel {
        if score >= self.thresholds.high {
            SimilarityLevel::High
        } else if score >= self.thresholds.moderate {
            SimilarityLevel::Moderate
        } else {
            SimilarityLevel::Low
        }
    }

    /// Assemble the final report
    pub fn report(
        &self,
        features: BTreeMap<String, FeatureComparison>,
        tempo_a: TempoEstimate,
        tempo_b: TempoEstimate,
        local_distance: LocalDistance,
        band_radius: (Option<usize>, Option<usize>),
        alignment_path: Option<Vec<(usize, usize)>>,
    ) -> Result<SimilarityReport> {
        let per_feature_scores = self.feature_scores(&features, &tempo_a, &tempo_b);
        let overall = self.overall(&per_feature_scores)?;
        let level = self.level(overall);

        if !per_feature_scores.contains_key(TEMPO_SCORE) {
            log::debug!("Tempo unknown for at least one track, excluded from the overall score");
        }

        Ok(SimilarityReport {
            overall_score_percent: overall * 100.0,
            level,
            per_feature_scores,
            alignment_path,
            features,
            tempo_a,
            tempo_b,
            settings: ComparisonSettings {
                local_distance,
                requested_band_radius: band_radius.0,
                effective_band_radius: band_radius.1,
                weights: self.weights,
                thresholds: self.thresholds,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKind;
    use approx::assert_relative_eq;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn comparison(score: f64) -> FeatureComparison {
        FeatureComparison {
            dim: 12,
            frames_a: 10,
            frames_b: 10,
            dtw_score: score,
            dtw_normalized_cost: 1.0 / score - 1.0,
            dtw_path_length: 10,
            direct_similarity: score,
            profile_similarity: score,
            mean_distance: 0.0,
        }
    }

    fn tempo(bpm: f32) -> TempoEstimate {
        TempoEstimate {
            bpm: Some(bpm),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_weighted_overall() {
        let agg = Aggregator::new(&AggregationConfig::default());
        let overall = agg
            .overall(&scores(&[("mfcc", 1.0), ("chroma", 0.5), ("tempo", 0.0)]))
            .unwrap();
        assert_relative_eq!(overall, 0.5 + 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_tempo_renormalizes() {
        let agg = Aggregator::new(&AggregationConfig::default());
        let overall = agg
            .overall(&scores(&[("mfcc", 0.8), ("chroma", 0.8)]))
            .unwrap();
        assert_relative_eq!(overall, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_weight_sum_is_rejected() {
        let mut config = AggregationConfig::default();
        config.weights.mfcc = 0.0;
        config.weights.chroma = 0.0;
        let agg = Aggregator::new(&config);
        assert!(agg.overall(&scores(&[("mfcc", 0.8), ("chroma", 0.8)])).is_err());
    }

    #[test]
    fn test_levels_follow_thresholds() {
        let agg = Aggregator::new(&AggregationConfig::default());
        assert_eq!(agg.level(0.0), SimilarityLevel::Low);
        assert_eq!(agg.level(0.39), SimilarityLevel::Low);
        assert_eq!(agg.level(0.40), SimilarityLevel::Moderate);
        assert_eq!(agg.level(0.69), SimilarityLevel::Moderate);
        assert_eq!(agg.level(0.70), SimilarityLevel::High);
        assert_eq!(agg.level(1.0), SimilarityLevel::High);
    }

    #[test]
    fn test_report_includes_tempo_when_known() {
        let agg = Aggregator::new(&AggregationConfig::default());
        let features: BTreeMap<_, _> = [
            (FeatureKind::Mfcc.to_string(), comparison(0.9)),
            (FeatureKind::Chroma.to_string(), comparison(0.6)),
        ]
        .into_iter()
        .collect();

        let report = agg
            .report(
                features.clone(),
                tempo(120.0),
                tempo(100.0),
                LocalDistance::Cosine,
                (Some(5), Some(5)),
                None,
            )
            .unwrap();
        assert_eq!(report.per_feature_scores.len(), 3);
        assert_relative_eq!(
            report.per_feature_scores["tempo"],
            1.0 - 20.0 / 120.0,
            epsilon = 1e-9
        );
        assert!(report.overall_score_percent > 0.0 && report.overall_score_percent <= 100.0);

        let report = agg
            .report(
                features,
                tempo(120.0),
                TempoEstimate::unknown(),
                LocalDistance::Cosine,
                (None, None),
                None,
            )
            .unwrap();
        assert!(!report.per_feature_scores.contains_key("tempo"));
        assert_relative_eq!(
            report.overall_score_percent,
            (0.5 * 0.9 + 0.4 * 0.6) / 0.9 * 100.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_report_json_field_names() {
        let agg = Aggregator::new(&AggregationConfig::default());
        let features: BTreeMap<_, _> = [(FeatureKind::Mfcc.to_string(), comparison(1.0))]
            .into_iter()
            .collect();
        let report = agg
            .report(
                features,
                TempoEstimate::unknown(),
                TempoEstimate::unknown(),
                LocalDistance::Cosine,
                (None, None),
                Some(vec![(0, 0), (1, 1)]),
            )
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overall_score_percent"], 100.0);
        assert_eq!(json["level"], "high");
        assert_eq!(json["per_feature_scores"]["mfcc"], 1.0);
        assert_eq!(json["alignment_path"][1][0], 1);

        let back: SimilarityReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
