//! Mel-frequency cepstral coefficients
//!
//! Power spectrum → triangular mel filter bank (HTK mel scale) → natural log
//! with an energy floor → orthonormal DCT-II truncated to the first
//! coefficients.

use super::{FeatureKind, FeatureSequence, FeatureVector};
use crate::config::ExtractionConfig;
use crate::error::{AnalysisError, Result, Stage, Track};
use crate::transform::{bin_frequency, Spectrogram, Spectrum};
use std::f32::consts::PI;

/// Floor applied to band energies before the log; silent frames are common
/// at track boundaries
const ENERGY_FLOOR: f32 = 1e-10;

/// Hz to mel (HTK)
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Mel to Hz (HTK)
pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters over the bins of an `fft_size` power spectrum
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    /// Weights [band][bin]
    filters: Vec<Vec<f32>>,
}

impl MelFilterBank {
    pub fn new(fft_size: usize, n_mels: usize, sample_rate: u32, fmin: f32, fmax: f32) -> Self {
        let n_freqs = fft_size / 2 + 1;
        let freq_bins: Vec<f32> = (0..n_freqs)
            .map(|k| bin_frequency(k, sample_rate, fft_size))
            .collect();

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let edges: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
            .collect();

        let mut filters = vec![vec![0.0; n_freqs]; n_mels];

        for (m, filter) in filters.iter_mut().enumerate() {
            let left = edges[m];
            let center = edges[m + 1];
            let right = edges[m + 2];

            for (k, &freq) in freq_bins.iter().enumerate() {
                if freq >= left && freq <= center && center > left {
                    filter[k] = (freq - left) / (center - left);
                } else if freq > center && freq <= right && right > center {
                    filter[k] = (right - freq) / (right - center);
                }
            }
        }

        Self { filters }
    }

    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    /// Weighted band energies of one spectrum
    pub fn apply(&self, spectrum: &Spectrum) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .iter()
                    .zip(spectrum.bins.iter())
                    .map(|(w, p)| w * p)
                    .sum()
            })
            .collect()
    }
}

/// MFCC extractor with a precomputed filter bank and DCT basis
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    filter_bank: MelFilterBank,
    /// Orthonormal DCT-II rows [coefficient][band]
    dct: Vec<Vec<f32>>,
}

impl MfccExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        let filter_bank = MelFilterBank::new(
            config.frame_length,
            config.mel_bands,
            config.sample_rate,
            config.mel_fmin,
            config.mel_fmax_or_nyquist(),
        );
        let dct = dct_basis(config.mfcc_count, config.mel_bands);
        Self { filter_bank, dct }
    }

    pub fn num_coefficients(&self) -> usize {
        self.dct.len()
    }

    /// Coefficients of one spectrum; `None` when any value is non-finite
    pub fn coefficients(&self, spectrum: &Spectrum) -> Option<FeatureVector> {
        let log_energies: Vec<f32> = self
            .filter_bank
            .apply(spectrum)
            .into_iter()
            .map(|e| e.max(ENERGY_FLOOR).ln())
            .collect();

        let coeffs: FeatureVector = self
            .dct
            .iter()
            .map(|row| row.iter().zip(log_energies.iter()).map(|(c, e)| c * e).sum())
            .collect();

        if coeffs.iter().all(|c: &f32| c.is_finite()) {
            Some(coeffs)
        } else {
            None
        }
    }

    /// Coefficients for the all-floor (silent) frame
    fn silent_frame(&self) -> FeatureVector {
        let floor = ENERGY_FLOOR.ln();
        self.dct
            .iter()
            .map(|row| row.iter().map(|c| c * floor).sum())
            .collect()
    }

    pub fn extract(&self, spectrogram: &Spectrogram, track: Track) -> Result<FeatureSequence> {
        let mut degenerate = 0;
        let vectors = spectrogram
            .spectra
            .iter()
            .enumerate()
            .map(|(frame, spectrum)| {
                self.coefficients(spectrum).unwrap_or_else(|| {
                    degenerate += 1;
                    log::debug!(
                        "{}",
                        AnalysisError::NumericDegenerate {
                            track,
                            stage: Stage::Cepstral,
                            frame,
                        }
                    );
                    self.silent_frame()
                })
            })
            .collect();

        if degenerate > 0 {
            log::warn!(
                "{}: substituted {} degenerate MFCC frames",
                track,
                degenerate
            );
        }

        Ok(
            FeatureSequence::new(FeatureKind::Mfcc, self.num_coefficients(), vectors)?
                .with_degenerate_frames(degenerate),
        )
    }
}

fn dct_basis(n_coeffs: usize, n_bands: usize) -> Vec<Vec<f32>> {
    let n = n_bands as f32;
    (0..n_coeffs)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_bands)
                .map(|m| scale * (PI * k as f32 * (m as f32 + 0.5) / n).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mel_round_trip() {
        for hz in [0.0, 440.0, 1000.0, 8000.0] {
            assert_relative_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 0.05);
        }
        assert_relative_eq!(hz_to_mel(1000.0), 1000.0, epsilon = 0.5);
    }

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(8, 8);
        for i in 0..8 {
            for j in 0..8 {
                let dot: f32 = basis[i].iter().zip(basis[j].iter()).map(|(a, b)| a * b).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "({}, {}) = {}", i, j, dot);
            }
        }
    }

    #[test]
    fn test_filter_bank_shape() {
        let bank = MelFilterBank::new(2048, 40, 22050, 0.0, 11025.0);
        assert_eq!(bank.num_bands(), 40);
        assert!(bank.filters.iter().all(|f| f.len() == 1025));
        assert!(bank
            .filters
            .iter()
            .flatten()
            .all(|&w| (0.0..=1.0).contains(&w)));
    }

    #[test]
    fn test_silent_spectrum_is_finite() {
        let config = ExtractionConfig::default();
        let extractor = MfccExtractor::new(&config);
        let silent = Spectrum {
            bins: vec![0.0; config.frame_length / 2 + 1],
        };

        let coeffs = extractor.coefficients(&silent).unwrap();
        assert_eq!(coeffs.len(), 13);
        assert!(coeffs.iter().all(|c| c.is_finite()));
        assert_eq!(coeffs, extractor.silent_frame());

        // the floor keeps silence finite, so it is not a substitution
        let spectrogram = Spectrogram {
            spectra: vec![silent; 3],
            sample_rate: config.sample_rate,
            frame_length: config.frame_length,
            hop_size: config.hop_size,
            degenerate_frames: 0,
        };
        let seq = extractor.extract(&spectrogram, Track::A).unwrap();
        assert_eq!(seq.degenerate_frames(), 0);
        assert!(seq.vectors().iter().all(|v| *v == coeffs));
    }

    #[test]
    fn test_extract_produces_one_vector_per_frame() {
        let config = ExtractionConfig::default();
        let extractor = MfccExtractor::new(&config);
        let spectrogram = Spectrogram {
            spectra: vec![
                Spectrum {
                    bins: vec![1.0; 1025]
                };
                5
            ],
            sample_rate: config.sample_rate,
            frame_length: config.frame_length,
            hop_size: config.hop_size,
            degenerate_frames: 0,
        };

        let seq = extractor.extract(&spectrogram, Track::A).unwrap();
        assert_eq!(seq.len(), 5);
        assert_eq!(seq.dim(), 13);
        assert_eq!(seq.kind(), FeatureKind::Mfcc);
        assert_eq!(seq.degenerate_frames(), 0);
    }

    #[test]
    fn test_infinite_power_is_substituted() {
        let config = ExtractionConfig::default();
        let extractor = MfccExtractor::new(&config);
        let mut bins = vec![1.0; 1025];
        bins[100] = f32::INFINITY;
        let spectrogram = Spectrogram {
            spectra: vec![Spectrum { bins }],
            sample_rate: config.sample_rate,
            frame_length: config.frame_length,
            hop_size: config.hop_size,
            degenerate_frames: 0,
        };

        let seq = extractor.extract(&spectrogram, Track::B).unwrap();
        assert_eq!(seq.degenerate_frames(), 1);
        assert!(seq.vectors()[0].iter().all(|c| c.is_finite()));
    }
}
