//! Audio decoding for multiple formats

use super::{decode_with_symphonia, resample_to_target, AudioFormat, SampleBuffer};
use anyhow::{Context, Result};
use std::path::Path;

/// Decode an audio file to a normalized mono buffer at the target sample rate
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> Result<SampleBuffer> {
    if !path.exists() {
        anyhow::bail!("Audio file not found: {}", path.display());
    }

    let format = AudioFormat::from_path(path);

    let decoded = match format {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Mp3 => decode_mp3(path)?,
        AudioFormat::Flac => decode_flac(path)?,
        AudioFormat::Ogg => decode_ogg(path)?,
        AudioFormat::Unknown => {
            anyhow::bail!("Unsupported audio format: {}", path.display());
        }
        _ => decode_with_symphonia(path)?,
    };

    log::debug!(
        "Decoded {}: {} Hz, {} channel(s), {:.2}s",
        path.display(),
        decoded.sample_rate(),
        decoded.channels(),
        decoded.duration_secs()
    );

    let mono = decoded.to_mono();

    let mono = if mono.sample_rate() != target_sample_rate {
        let resampled = resample_to_target(mono.samples(), mono.sample_rate(), target_sample_rate)?;
        SampleBuffer::mono(resampled, target_sample_rate)?
    } else {
        mono
    };

    Ok(mono.normalized())
}

/// Decode WAV file
fn decode_wav(path: &Path) -> Result<SampleBuffer> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(SampleBuffer::new(samples, spec.sample_rate, spec.channels)?)
}

/// Decode MP3 file
fn decode_mp3(path: &Path) -> Result<SampleBuffer> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read MP3 file: {}", path.display()))?;

    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                for &sample in &frame.data {
                    samples.push(sample as f32 / 32768.0);
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("MP3 decode error: {}", e),
        }
    }

    if sample_rate == 0 {
        anyhow::bail!("MP3 file contains no audio frames: {}", path.display());
    }

    Ok(SampleBuffer::new(samples, sample_rate, channels)?)
}

/// Decode FLAC file
fn decode_flac(path: &Path) -> Result<SampleBuffer> {
    let mut reader = claxon::FlacReader::open(path)
        .with_context(|| format!("Failed to open FLAC file: {}", path.display()))?;

    let info = reader.streaminfo();
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;

    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SampleBuffer::new(samples, info.sample_rate, info.channels as u16)?)
}

/// Decode OGG Vorbis file
fn decode_ogg(path: &Path) -> Result<SampleBuffer> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open OGG file: {}", path.display()))?;

    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();

    while let Some(packet) = reader.read_dec_packet_itl()? {
        for &sample in &packet {
            samples.push(sample as f32 / 32768.0);
        }
    }

    Ok(SampleBuffer::new(samples, sample_rate, channels)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_stereo_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 22050, 2, &[16384, 0, 16384, 0, -16384, 0]);

        let buffer = decode_audio(&path, 22050).unwrap();
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.samples().len(), 3);
        assert!((buffer.samples()[0] - 0.25).abs() < 1e-4);
        assert!((buffer.samples()[2] + 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_missing_and_unknown_files_fail() {
        assert!(decode_audio(Path::new("/nonexistent/file.wav"), 22050).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not audio").unwrap();
        assert!(decode_audio(&path, 22050).is_err());
    }
}
