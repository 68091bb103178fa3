//! Short-time power spectrum
//!
//! One forward FFT plan of the frame length is built per engine and reused
//! for every frame of a track.

use crate::budget::Budget;
use crate::error::{AnalysisError, Result, Stage, Track};
use crate::framer::{Frame, Framer};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Power spectrum of one frame, bins `0..=N/2`
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub bins: Vec<f32>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of all bins
    pub fn energy(&self) -> f32 {
        self.bins.iter().sum()
    }
}

/// Spectra of every frame of one track
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Power values [time_frame][frequency_bin]
    pub spectra: Vec<Spectrum>,
    pub sample_rate: u32,
    pub frame_length: usize,
    pub hop_size: usize,
    /// Frames whose spectrum needed non-finite bins replaced
    pub degenerate_frames: usize,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.spectra.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        bin_frequency(k, self.sample_rate, self.frame_length)
    }
}

/// Center frequency of bin `k` of an `fft_size` transform
pub fn bin_frequency(k: usize, sample_rate: u32, fft_size: usize) -> f32 {
    k as f32 * sample_rate as f32 / fft_size as f32
}

/// FFT-based spectrum computer for a fixed frame length
pub struct SpectralEngine {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
}

impl SpectralEngine {
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self { fft, fft_size }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Power spectrum of one frame. Non-finite bins are replaced by zero and
    /// reported through the returned flag.
    pub fn power_spectrum(&self, frame: &Frame) -> (Spectrum, bool) {
        let mut buffer: Vec<Complex<f32>> = frame
            .samples
            .iter()
            .map(|&s| Complex::new(s, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let mut degenerate = false;
        let bins = buffer[..self.fft_size / 2 + 1]
            .iter()
            .map(|c| {
                let power = c.norm_sqr();
                if power.is_finite() {
                    power
                } else {
                    degenerate = true;
                    0.0
                }
            })
            .collect();

        (Spectrum { bins }, degenerate)
    }

    /// Spectra of every frame of `samples`, checking the budget between frames
    pub fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        framer: &Framer,
        budget: &Budget,
        track: Track,
    ) -> Result<Spectrogram> {
        if framer.frame_length() != self.fft_size {
            return Err(AnalysisError::InvalidConfig(format!(
                "frame length {} does not match transform size {}",
                framer.frame_length(),
                self.fft_size
            )));
        }

        let frames = framer.frames(samples, track)?;
        let mut spectra = Vec::with_capacity(frames.len());
        let mut degenerate_frames = 0;

        for frame in frames {
            budget.check(Stage::Spectral, Some(track))?;

            let (spectrum, degenerate) = self.power_spectrum(&frame);
            if degenerate {
                degenerate_frames += 1;
                log::debug!(
                    "{}",
                    AnalysisError::NumericDegenerate {
                        track,
                        stage: Stage::Spectral,
                        frame: frame.index,
                    }
                );
            }
            spectra.push(spectrum);
        }

        if degenerate_frames > 0 {
            log::warn!(
                "{}: replaced non-finite spectrum bins in {} of {} frames",
                track,
                degenerate_frames,
                spectra.len()
            );
        }

        Ok(Spectrogram {
            spectra,
            sample_rate,
            frame_length: self.fft_size,
            hop_size: framer.hop_size(),
            degenerate_frames,
        })
    }
}
