//! Global tempo estimate from the onset-strength envelope
//!
//! The envelope is the half-wave rectified spectral flux of log-compressed
//! magnitudes. The dominant periodicity is the autocorrelation peak inside
//! the configured BPM range, weighted by a log-normal prior centred on
//! 120 BPM to settle octave ambiguity, and refined by parabolic
//! interpolation.

use crate::config::ExtractionConfig;
use crate::error::{AnalysisError, Result, Stage, Track};
use crate::transform::Spectrogram;
use serde::{Deserialize, Serialize};

/// Compression constant for log magnitudes
const LOG_COMPRESSION: f32 = 100.0;
/// Normalized autocorrelation below which no tempo is reported
const MIN_CONFIDENCE: f32 = 0.05;
/// Centre of the tempo prior
const PRIOR_BPM: f64 = 120.0;

/// Tempo of one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Beats per minute, `None` when the envelope shows no periodicity
    pub bpm: Option<f32>,
    /// Normalized autocorrelation at the chosen lag, in [0, 1]
    pub confidence: f32,
}

impl TempoEstimate {
    pub fn unknown() -> Self {
        Self {
            bpm: None,
            confidence: 0.0,
        }
    }

    /// `1 - |a - b| / max(a, b)`, `None` unless both tempi are known
    pub fn closeness(&self, other: &TempoEstimate) -> Option<f64> {
        let (a, b) = (self.bpm? as f64, other.bpm? as f64);
        let max = a.max(b);
        if max <= 0.0 {
            return None;
        }
        Some((1.0 - (a - b).abs() / max).clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone)]
pub struct TempoEstimator {
    min_bpm: f32,
    max_bpm: f32,
    frame_rate: f32,
}

impl TempoEstimator {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            frame_rate: config.frame_rate(),
        }
    }

    /// Onset strength per frame; the first frame has no predecessor and is 0
    pub fn onset_envelope(&self, spectrogram: &Spectrogram) -> Vec<f32> {
        let mut envelope = Vec::with_capacity(spectrogram.num_frames());
        let mut previous: Option<Vec<f32>> = None;

        for spectrum in &spectrogram.spectra {
            let compressed: Vec<f32> = spectrum
                .bins
                .iter()
                .map(|p| (1.0 + LOG_COMPRESSION * p.max(0.0).sqrt()).ln())
                .collect();

            let flux = match &previous {
                Some(prev) => compressed
                    .iter()
                    .zip(prev.iter())
                    .map(|(c, p)| (c - p).max(0.0))
                    .sum(),
                None => 0.0,
            };

            envelope.push(if flux.is_finite() { flux } else { 0.0 });
            previous = Some(compressed);
        }

        envelope
    }

    pub fn estimate(&self, spectrogram: &Spectrogram, track: Track) -> Result<TempoEstimate> {
        let envelope = self.onset_envelope(spectrogram);
        let estimate = self.estimate_from_envelope(&envelope);

        match estimate.bpm {
            Some(bpm) => log::debug!(
                "{}: tempo {:.1} BPM (confidence {:.3})",
                track,
                bpm,
                estimate.confidence
            ),
            None => log::debug!("{}: no dominant tempo found", track),
        }

        if let Some(bpm) = estimate.bpm {
            if !bpm.is_finite() {
                log::warn!(
                    "{}",
                    AnalysisError::NumericDegenerate {
                        track,
                        stage: Stage::Tempo,
                        frame: 0,
                    }
                );
                return Ok(TempoEstimate::unknown());
            }
        }

        Ok(estimate)
    }

    /// Autocorrelation tempo of an onset envelope
    pub fn estimate_from_envelope(&self, envelope: &[f32]) -> TempoEstimate {
        let n = envelope.len();
        let lag_min = ((60.0 * self.frame_rate / self.max_bpm).ceil() as usize).max(1);
        let lag_max = ((60.0 * self.frame_rate / self.min_bpm).floor() as usize).min(n / 2);

        if lag_max <= lag_min {
            return TempoEstimate::unknown();
        }

        let mean = envelope.iter().map(|&e| e as f64).sum::<f64>() / n as f64;
        let centered: Vec<f64> = envelope.iter().map(|&e| e as f64 - mean).collect();

        let autocorr = |lag: usize| -> f64 {
            let sum: f64 = centered[..n - lag]
                .iter()
                .zip(centered[lag..].iter())
                .map(|(a, b)| a * b)
                .sum();
            sum / (n - lag) as f64
        };

        let r0 = autocorr(0);
        if r0 <= 1e-12 {
            return TempoEstimate::unknown();
        }

        let values: Vec<f64> = (lag_min - 1..=lag_max + 1)
            .map(|lag| if lag + 1 < n { autocorr(lag) } else { 0.0 })
            .collect();
        // values[i] holds lag (lag_min - 1 + i)
        let frame_rate = self.frame_rate as f64;
        let best_idx = (1..values.len() - 1)
            .map(|i| {
                let lag = (lag_min - 1 + i) as f64;
                (i, values[i] * tempo_prior(60.0 * frame_rate / lag))
            })
            .fold((1, f64::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc })
            .0;
        let best = values[best_idx];

        let confidence = (best / r0).clamp(0.0, 1.0) as f32;
        if confidence < MIN_CONFIDENCE {
            return TempoEstimate {
                bpm: None,
                confidence,
            };
        }

        let (left, right) = (values[best_idx - 1], values[best_idx + 1]);
        let denom = left - 2.0 * best + right;
        let shift = if denom.abs() > 1e-12 {
            (0.5 * (left - right) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        let lag = (lag_min - 1 + best_idx) as f64 + shift;
        let bpm = (60.0 * frame_rate / lag) as f32;

        TempoEstimate {
            bpm: Some(bpm),
            confidence,
        }
    }
}

/// Log-normal weight, one octave standard deviation around `PRIOR_BPM`
fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_BPM).log2();
    (-0.5 * octaves * octaves).exp()
}
