//! Per-frame feature extraction
//!
//! MFCC and chroma produce one vector per spectrum frame; the tempo
//! estimator reduces the whole spectrogram to one scalar.

mod chroma;
mod mfcc;
mod tempo;

pub use chroma::ChromaExtractor;
pub use mfcc::{MelFilterBank, MfccExtractor};
pub use tempo::{TempoEstimate, TempoEstimator};

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Feature vector for one frame
pub type FeatureVector = Vec<f32>;

/// Kind of frame-level feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Mfcc,
    Chroma,
}

impl FeatureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Mfcc => "mfcc",
            FeatureKind::Chroma => "chroma",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered feature vectors of a whole track, all of the same dimension
///
/// Deserialization goes through [`FeatureSequence::new`], so stored
/// sequences are held to the same dimension check as extracted ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredSequence")]
pub struct FeatureSequence {
    kind: FeatureKind,
    dim: usize,
    vectors: Vec<FeatureVector>,
    /// Frames replaced by neutral values
    degenerate_frames: usize,
}

#[derive(Deserialize)]
struct StoredSequence {
    kind: FeatureKind,
    dim: usize,
    vectors: Vec<FeatureVector>,
    #[serde(default)]
    degenerate_frames: usize,
}

impl TryFrom<StoredSequence> for FeatureSequence {
    type Error = AnalysisError;

    fn try_from(stored: StoredSequence) -> Result<Self> {
        Ok(FeatureSequence::new(stored.kind, stored.dim, stored.vectors)?
            .with_degenerate_frames(stored.degenerate_frames))
    }
}

impl FeatureSequence {
    /// Build a sequence, rejecting vectors that disagree with `dim`
    pub fn new(kind: FeatureKind, dim: usize, vectors: Vec<FeatureVector>) -> Result<Self> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(AnalysisError::IncompatibleInput {
                kind,
                left: dim,
                right: bad.len(),
            });
        }
        Ok(Self {
            kind,
            dim,
            vectors,
            degenerate_frames: 0,
        })
    }

    /// Record how many frames were substituted
    pub fn with_degenerate_frames(mut self, count: usize) -> Self {
        self.degenerate_frames = count;
        self
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Per-frame dimensionality
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn degenerate_frames(&self) -> usize {
        self.degenerate_frames
    }

    /// Mean vector over all frames
    pub fn mean(&self) -> Vec<f64> {
        let mut mean = vec![0.0f64; self.dim];
        if self.vectors.is_empty() {
            return mean;
        }
        for v in &self.vectors {
            for (m, &x) in mean.iter_mut().zip(v.iter()) {
                *m += x as f64;
            }
        }
        let n = self.vectors.len() as f64;
        mean.iter_mut().for_each(|m| *m /= n);
        mean
    }

    /// Per-dimension summary statistics
    pub fn stats(&self) -> FeatureStats {
        let mean = self.mean();
        let mut std = vec![0.0f64; self.dim];
        let mut min = vec![f64::INFINITY; self.dim];
        let mut max = vec![f64::NEG_INFINITY; self.dim];

        for v in &self.vectors {
            for d in 0..self.dim {
                let x = v[d] as f64;
                std[d] += (x - mean[d]).powi(2);
                min[d] = min[d].min(x);
                max[d] = max[d].max(x);
            }
        }

        if self.vectors.is_empty() {
            min.iter_mut().for_each(|m| *m = 0.0);
            max.iter_mut().for_each(|m| *m = 0.0);
        } else {
            let n = self.vectors.len() as f64;
            std.iter_mut().for_each(|s| *s = (*s / n).sqrt());
        }

        FeatureStats {
            mean,
            std,
            min,
            max,
        }
    }
}

/// Per-dimension statistics of a feature sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

/// Basic facts about an analysed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub num_samples: usize,
    pub num_frames: usize,
}

/// Everything extracted from one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFeatures {
    pub info: TrackInfo,
    pub mfcc: FeatureSequence,
    pub chroma: FeatureSequence,
    pub tempo: TempoEstimate,
}

impl TrackFeatures {
    pub fn sequence(&self, kind: FeatureKind) -> &FeatureSequence {
        match kind {
            FeatureKind::Mfcc => &self.mfcc,
            FeatureKind::Chroma => &self.chroma,
        }
    }
}
