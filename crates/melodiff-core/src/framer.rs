//! Overlapping analysis frames
//!
//! Splits a mono sample buffer into Hamming-windowed frames of
//! `frame_length` samples spaced `hop_size` apart. The trailing partial
//! frame is zero-padded, never dropped, so every sample lands in at least
//! one frame. Buffers shorter than one frame yield a single padded frame.

use crate::error::{AnalysisError, Result, Track};
use std::f32::consts::PI;

/// One windowed analysis frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in the frame sequence
    pub index: usize,
    /// Offset of the first sample in the source buffer
    pub start: usize,
    /// Windowed samples, always `frame_length` long
    pub samples: Vec<f32>,
}

/// Frame splitter with a precomputed analysis window
#[derive(Debug, Clone)]
pub struct Framer {
    frame_length: usize,
    hop_size: usize,
    window: Vec<f32>,
}

impl Framer {
    pub fn new(frame_length: usize, hop_size: usize) -> Result<Self> {
        if frame_length == 0 || hop_size == 0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "frame_length ({}) and hop_size ({}) must be > 0",
                frame_length, hop_size
            )));
        }
        if hop_size > frame_length {
            return Err(AnalysisError::InvalidConfig(format!(
                "hop_size ({}) must not exceed frame_length ({})",
                hop_size, frame_length
            )));
        }

        Ok(Self {
            frame_length,
            hop_size,
            window: create_hamming_window(frame_length),
        })
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Number of frames produced for `num_samples` samples
    pub fn frame_count(&self, num_samples: usize) -> usize {
        if num_samples == 0 {
            0
        } else if num_samples <= self.frame_length {
            1
        } else {
            (num_samples - self.frame_length).div_ceil(self.hop_size) + 1
        }
    }

    /// Lazily iterate the windowed frames of `samples`
    pub fn frames<'a>(&'a self, samples: &'a [f32], track: Track) -> Result<Frames<'a>> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyInput { track });
        }

        Ok(Frames {
            framer: self,
            samples,
            next: 0,
            count: self.frame_count(samples.len()),
        })
    }
}

/// Iterator over the frames of one buffer
pub struct Frames<'a> {
    framer: &'a Framer,
    samples: &'a [f32],
    next: usize,
    count: usize,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.next >= self.count {
            return None;
        }

        let index = self.next;
        let start = index * self.framer.hop_size;
        let end = (start + self.framer.frame_length).min(self.samples.len());

        let mut windowed: Vec<f32> = self.samples[start..end]
            .iter()
            .zip(self.framer.window.iter())
            .map(|(s, w)| s * w)
            .collect();
        windowed.resize(self.framer.frame_length, 0.0);

        self.next += 1;

        Some(Frame {
            index,
            start,
            samples: windowed,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Symmetric Hamming window
fn create_hamming_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.54 - 0.46 * (2.0 * PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_window() {
        let window = create_hamming_window(513);
        assert_eq!(window.len(), 513);
        assert!((window[0] - 0.08).abs() < 1e-4);
        assert!((window[256] - 1.0).abs() < 1e-4);
        assert!((window[512] - 0.08).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(Framer::new(0, 512), Err(AnalysisError::InvalidConfig(_))));
        assert!(matches!(Framer::new(2048, 0), Err(AnalysisError::InvalidConfig(_))));
        assert!(matches!(Framer::new(512, 1024), Err(AnalysisError::InvalidConfig(_))));
        assert!(Framer::new(512, 512).is_ok());
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let framer = Framer::new(2048, 512).unwrap();
        assert!(matches!(
            framer.frames(&[], Track::B),
            Err(AnalysisError::EmptyInput { track: Track::B })
        ));
    }

    #[test]
    fn test_frame_count_matches_formula() {
        for &(length, hop) in &[(2048, 512), (1024, 256), (400, 160), (256, 256), (7, 3)] {
            let framer = Framer::new(length, hop).unwrap();
            for n in [length + 1, length + hop, 3 * length + 17, 10 * length] {
                let expected = ((n - length) as f64 / hop as f64).ceil() as usize + 1;
                assert_eq!(framer.frame_count(n), expected, "L={} H={} N={}", length, hop, n);

                let samples = vec![0.5f32; n];
                assert_eq!(framer.frames(&samples, Track::A).unwrap().count(), expected);
            }
        }
    }

    #[test]
    fn test_every_sample_is_covered() {
        let framer = Framer::new(64, 24).unwrap();
        let n = 1000;
        let samples = vec![1.0f32; n];
        let mut covered = vec![false; n];

        for frame in framer.frames(&samples, Track::A).unwrap() {
            assert_eq!(frame.samples.len(), 64);
            for i in frame.start..(frame.start + 64).min(n) {
                covered[i] = true;
            }
        }

        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn test_short_buffer_yields_one_padded_frame() {
        let framer = Framer::new(8, 4).unwrap();
        let frames: Vec<Frame> = framer.frames(&[1.0, 1.0, 1.0], Track::A).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples.len(), 8);
        assert!(frames[0].samples[3..].iter().all(|&s| s == 0.0));
        assert!((frames[0].samples[0] - framer.window()[0]).abs() < 1e-6);
    }

    #[test]
    fn test_last_frame_is_zero_padded() {
        let framer = Framer::new(4, 2).unwrap();
        let samples = [1.0f32; 7];
        let frames: Vec<Frame> = framer.frames(&samples, Track::A).unwrap().collect();
        // ceil((7 - 4) / 2) + 1 = 3
        assert_eq!(frames.len(), 3);
        let last = &frames[2];
        assert_eq!(last.start, 4);
        assert_eq!(last.samples[3], 0.0);
        assert!(last.samples[2] > 0.0);
    }
}
