//! Error kinds surfaced by the analysis pipeline
//!
//! Every variant names the pipeline stage and, where one exists, the input
//! track that produced it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::features::FeatureKind;

/// Which of the two compared inputs an error or a feature set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    A,
    B,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::A => write!(f, "track A"),
            Track::B => write!(f, "track B"),
        }
    }
}

/// Pipeline stage that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Framing,
    Spectral,
    Cepstral,
    Chroma,
    Tempo,
    Similarity,
    Aggregation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Framing => "framing",
            Stage::Spectral => "spectral analysis",
            Stage::Cepstral => "cepstral extraction",
            Stage::Chroma => "chroma extraction",
            Stage::Tempo => "tempo estimation",
            Stage::Similarity => "similarity",
            Stage::Aggregation => "aggregation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Framing or transform parameters are non-positive or inconsistent
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{track}: sample buffer is empty")]
    EmptyInput { track: Track },

    /// The two sequences of one feature kind disagree on vector length
    #[error("incompatible {kind} sequences: {left} dimensions vs {right} dimensions")]
    IncompatibleInput {
        kind: FeatureKind,
        left: usize,
        right: usize,
    },

    /// Logged and substituted by the stage that detects it, never returned
    /// from a full pipeline run
    #[error("{track}: degenerate {stage} output at frame {frame}")]
    NumericDegenerate {
        track: Track,
        stage: Stage,
        frame: usize,
    },

    #[error("processing budget of {limit:?} exceeded during {stage}{}", track_suffix(.track))]
    BudgetExceeded {
        track: Option<Track>,
        stage: Stage,
        limit: Option<Duration>,
    },
}

fn track_suffix(track: &Option<Track>) -> String {
    match track {
        Some(track) => format!(" of {}", track),
        None => String::new(),
    }
}

impl AnalysisError {
    /// Stage the error is attributed to, if the variant carries one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalysisError::InvalidConfig(_) => None,
            AnalysisError::EmptyInput { .. } => Some(Stage::Framing),
            AnalysisError::IncompatibleInput { .. } => Some(Stage::Aggregation),
            AnalysisError::NumericDegenerate { stage, .. } => Some(*stage),
            AnalysisError::BudgetExceeded { stage, .. } => Some(*stage),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_track_and_stage() {
        let err = AnalysisError::BudgetExceeded {
            track: Some(Track::B),
            stage: Stage::Spectral,
            limit: Some(Duration::from_secs(30)),
        };
        let msg = err.to_string();
        assert!(msg.contains("track B"));
        assert!(msg.contains("spectral analysis"));

        let err = AnalysisError::IncompatibleInput {
            kind: FeatureKind::Mfcc,
            left: 13,
            right: 9,
        };
        assert!(err.to_string().contains("13 dimensions vs 9 dimensions"));
        assert_eq!(err.stage(), Some(Stage::Aggregation));
    }
}
