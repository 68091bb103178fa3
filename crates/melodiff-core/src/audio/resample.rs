//! Sample-rate conversion using rubato's synchronous FFT resampler

use anyhow::Result;
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Resample mono audio to the target sample rate
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        1,
    )?;

    let expected_len =
        (samples.len() as f64 * to_rate as f64 / from_rate as f64).ceil() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let next = resampler.input_frames_next();
        let input: [&[f32]; 1] = [&samples[pos..pos + next]];
        let chunk = resampler.process(&input[..], None)?;
        output.extend_from_slice(&chunk[0]);
        pos += next;
    }

    if pos < samples.len() {
        let input: [&[f32]; 1] = [&samples[pos..]];
        let chunk = resampler.process_partial(Some(&input[..]), None)?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the filter tail until the delayed signal is complete
    while output.len() < expected_len + delay {
        let chunk = resampler.process_partial::<&[f32]>(None, None)?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected_len);

    log::trace!(
        "Resampled {} samples at {} Hz to {} samples at {} Hz",
        samples.len(),
        from_rate,
        output.len(),
        to_rate
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_to_target(&samples, 8000, 8000).unwrap(), samples);
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let resampled = resample_to_target(&samples, 44100, 22050).unwrap();
        assert_eq!(resampled.len(), 22050);

        // Mid-signal energy survives the conversion
        let rms: f32 = (resampled[5000..15000].iter().map(|s| s * s).sum::<f32>()
            / 10000.0)
            .sqrt();
        assert!((rms - 0.707).abs() < 0.05);
    }
}
