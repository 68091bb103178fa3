//! Frame-level similarity between two feature sequences
//!
//! Two families of measures: index-matched comparisons (cosine per frame,
//! cosine and distance of the mean vectors) that assume both tracks run at
//! the same speed, and dynamic time warping that tolerates tempo changes.

mod cosine;
mod dtw;

pub use cosine::{
    cosine_similarity, direct_similarity, euclidean_distance, mean_distance, profile_similarity,
};
pub use dtw::{band_contains, effective_band_radius, Dtw, DtwAlignment};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost of pairing two frames inside DTW
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalDistance {
    /// `1 - cosine`, in [0, 2]
    #[default]
    Cosine,
    Euclidean,
}

impl LocalDistance {
    pub fn distance(&self, u: &[f32], v: &[f32]) -> f64 {
        match self {
            LocalDistance::Cosine => (1.0 - cosine_similarity(u, v)).max(0.0),
            LocalDistance::Euclidean => euclidean_distance(u, v),
        }
    }

    /// Map a per-step DTW cost onto [0, 1], 1 for a perfect match
    ///
    /// Cosine distance is bounded, so the cost is rescaled linearly against
    /// its maximum: 1 when both sequences are non-negative (chroma), 2
    /// otherwise. Euclidean distance has no bound and uses `1 / (1 + cost)`.
    pub fn score(&self, normalized_cost: f64, non_negative: bool) -> f64 {
        match self {
            LocalDistance::Cosine => {
                let max_cost = if non_negative { 1.0 } else { 2.0 };
                (1.0 - normalized_cost / max_cost).clamp(0.0, 1.0)
            }
            LocalDistance::Euclidean => 1.0 / (1.0 + normalized_cost),
        }
    }
}

impl fmt::Display for LocalDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalDistance::Cosine => f.write_str("cosine"),
            LocalDistance::Euclidean => f.write_str("euclidean"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_score_spans_unit_range() {
        let cosine = LocalDistance::Cosine;
        assert_eq!(cosine.score(0.0, true), 1.0);
        assert_eq!(cosine.score(1.0, true), 0.0);
        assert_eq!(cosine.score(1.0, false), 0.5);
        assert_eq!(cosine.score(2.0, false), 0.0);
        assert_eq!(LocalDistance::Euclidean.score(1.0, false), 0.5);
    }

    #[test]
    fn test_local_distances() {
        let u = [1.0, 0.0];
        let v = [0.0, 1.0];
        assert!((LocalDistance::Cosine.distance(&u, &v) - 1.0).abs() < 1e-12);
        assert!((LocalDistance::Euclidean.distance(&u, &v) - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(LocalDistance::Cosine.distance(&u, &u), 0.0);
        assert_eq!(LocalDistance::Euclidean.distance(&u, &u), 0.0);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&LocalDistance::Euclidean).unwrap(),
            "\"euclidean\""
        );
        assert_eq!(LocalDistance::default(), LocalDistance::Cosine);
        assert_eq!(LocalDistance::Cosine.to_string(), "cosine");
    }
}
