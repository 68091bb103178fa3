//! Decoded sample container handed to the analysis pipeline

use crate::error::{AnalysisError, Result};

/// Interleaved PCM samples tagged with their sample rate and channel count
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample buffer sample rate must be > 0".to_string(),
            ));
        }
        if channels == 0 {
            return Err(AnalysisError::InvalidConfig(
                "sample buffer channel count must be > 0".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Single-channel buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of sample frames (one sample per channel each)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn duration_ms(&self) -> u32 {
        (self.duration_secs() * 1000.0) as u32
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> SampleBuffer {
        if self.channels == 1 {
            return self.clone();
        }

        let mut mono = Vec::with_capacity(self.frames());
        for chunk in self.samples.chunks(self.channels as usize) {
            let avg: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
            mono.push(avg);
        }

        SampleBuffer {
            samples: mono,
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }

    /// Largest absolute finite sample value
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .filter(|s| s.is_finite())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Scale into [-1, 1] when the peak exceeds full scale; buffers already
    /// in range are returned untouched
    pub fn normalized(&self) -> SampleBuffer {
        let peak = self.peak();
        if peak <= 1.0 {
            return self.clone();
        }

        let gain = 1.0 / peak;
        SampleBuffer {
            samples: self.samples.iter().map(|s| s * gain).collect(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_rate() {
        assert!(SampleBuffer::mono(vec![0.0; 4], 0).is_err());
        assert!(SampleBuffer::new(vec![0.0; 4], 8000, 0).is_err());
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let stereo = SampleBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 8000, 2).unwrap();
        let mono = stereo.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.samples(), &[0.5, 0.5]);
        assert_eq!(stereo.frames(), 2);
    }

    #[test]
    fn test_normalized_only_scales_overshoot() {
        let quiet = SampleBuffer::mono(vec![0.25, -0.5], 8000).unwrap();
        assert_eq!(quiet.normalized(), quiet);

        let loud = SampleBuffer::mono(vec![2.0, -4.0], 8000).unwrap();
        assert_eq!(loud.normalized().samples(), &[0.5, -1.0]);
    }

    #[test]
    fn test_duration() {
        let buffer = SampleBuffer::mono(vec![0.0; 22050], 22050).unwrap();
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(buffer.duration_ms(), 1000);
    }
}
