//! Pitch-class energy profiles
//!
//! Each spectrum bin is assigned to the nearest pitch class under the
//! reference tuning (class 0 = C), octaves folded. Per-class power is summed
//! and the vector is scaled so its largest class is 1.

use super::{FeatureKind, FeatureSequence, FeatureVector};
use crate::config::ExtractionConfig;
use crate::error::{AnalysisError, Result, Stage, Track};
use crate::transform::{bin_frequency, Spectrogram, Spectrum};

/// Semitones from C up to A within one octave
const A_ABOVE_C: f32 = 9.0;

#[derive(Debug, Clone)]
pub struct ChromaExtractor {
    n_chroma: usize,
    /// Pitch class of every spectrum bin, `None` below the minimum frequency
    bin_classes: Vec<Option<usize>>,
}

impl ChromaExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        let n_chroma = config.chroma_bins;
        let c_ref = config.tuning_hz * 2f32.powf(-A_ABOVE_C / 12.0);
        let n_freqs = config.frame_length / 2 + 1;

        let bin_classes = (0..n_freqs)
            .map(|k| {
                let freq = bin_frequency(k, config.sample_rate, config.frame_length);
                if freq < config.chroma_min_freq {
                    return None;
                }
                let steps = (n_chroma as f32 * (freq / c_ref).log2()).round() as i64;
                Some(steps.rem_euclid(n_chroma as i64) as usize)
            })
            .collect();

        Self {
            n_chroma,
            bin_classes,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.n_chroma
    }

    /// Pitch class assigned to spectrum bin `k`
    pub fn class_of_bin(&self, k: usize) -> Option<usize> {
        self.bin_classes.get(k).copied().flatten()
    }

    /// Max-normalized chroma of one spectrum; `None` when the frame carries
    /// no usable energy
    pub fn chroma(&self, spectrum: &Spectrum) -> Option<FeatureVector> {
        let mut chroma = vec![0.0f32; self.n_chroma];
        for (power, class) in spectrum.bins.iter().zip(self.bin_classes.iter()) {
            if let Some(class) = class {
                chroma[*class] += power;
            }
        }

        let max = chroma.iter().cloned().fold(0.0f32, f32::max);
        if !(max > 0.0 && max.is_finite()) {
            return None;
        }
        chroma.iter_mut().for_each(|c| *c /= max);
        Some(chroma)
    }

    pub fn extract(&self, spectrogram: &Spectrogram, track: Track) -> Result<FeatureSequence> {
        let mut degenerate = 0;
        let vectors = spectrogram
            .spectra
            .iter()
            .enumerate()
            .map(|(frame, spectrum)| {
                self.chroma(spectrum).unwrap_or_else(|| {
                    degenerate += 1;
                    log::debug!(
                        "{}",
                        AnalysisError::NumericDegenerate {
                            track,
                            stage: Stage::Chroma,
                            frame,
                        }
                    );
                    // Flat profile: no pitch class preferred
                    vec![1.0; self.n_chroma]
                })
            })
            .collect();

        if degenerate > 0 {
            log::info!(
                "{}: {} silent or degenerate chroma frames set to a flat profile",
                track,
                degenerate
            );
        }

        Ok(
            FeatureSequence::new(FeatureKind::Chroma, self.n_chroma, vectors)?
                .with_degenerate_frames(degenerate),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> (ChromaExtractor, ExtractionConfig) {
        let config = ExtractionConfig::default();
        (ChromaExtractor::new(&config), config)
    }

    fn bin_for(freq: f32, config: &ExtractionConfig) -> usize {
        (freq * config.frame_length as f32 / config.sample_rate as f32).round() as usize
    }

    #[test]
    fn test_reference_pitches_map_to_classes() {
        let (chroma, config) = extractor();
        // A4, A5 and A3 fold onto class 9
        assert_eq!(chroma.class_of_bin(bin_for(440.0, &config)), Some(9));
        assert_eq!(chroma.class_of_bin(bin_for(880.0, &config)), Some(9));
        assert_eq!(chroma.class_of_bin(bin_for(220.0, &config)), Some(9));
        // C5
        assert_eq!(chroma.class_of_bin(bin_for(523.25, &config)), Some(0));
        // DC and sub-audio bins are ignored
        assert_eq!(chroma.class_of_bin(0), None);
        assert_eq!(chroma.class_of_bin(2), None);
    }

    #[test]
    fn test_chroma_is_max_normalized() {
        let (chroma, config) = extractor();
        let mut bins = vec![0.0; 1025];
        bins[bin_for(440.0, &config)] = 4.0;
        bins[bin_for(523.25, &config)] = 2.0;

        let v = chroma.chroma(&Spectrum { bins }).unwrap();
        assert_eq!(v.len(), 12);
        assert_eq!(v[9], 1.0);
        assert_eq!(v[0], 0.5);
    }

    #[test]
    fn test_loudness_does_not_change_chroma() {
        let (chroma, config) = extractor();
        let mut quiet = vec![0.0; 1025];
        quiet[bin_for(440.0, &config)] = 0.01;
        quiet[bin_for(659.25, &config)] = 0.005;
        let loud: Vec<f32> = quiet.iter().map(|p| p * 1000.0).collect();

        let a = chroma.chroma(&Spectrum { bins: quiet }).unwrap();
        let b = chroma.chroma(&Spectrum { bins: loud }).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_silent_frame_becomes_flat() {
        let (chroma, config) = extractor();
        let spectrogram = Spectrogram {
            spectra: vec![Spectrum { bins: vec![0.0; 1025] }],
            sample_rate: config.sample_rate,
            frame_length: config.frame_length,
            hop_size: config.hop_size,
            degenerate_frames: 0,
        };

        let seq = chroma.extract(&spectrogram, Track::A).unwrap();
        assert_eq!(seq.degenerate_frames(), 1);
        assert_eq!(seq.vectors()[0], vec![1.0; 12]);
    }
}
