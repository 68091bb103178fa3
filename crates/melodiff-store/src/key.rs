//! Cache keys for extracted features
//!
//! A key pairs a CRC-64 of the decoded mono samples (and their rate) with a
//! CRC-64 of the extraction parameters, so features are reused only for the
//! same audio analysed the same way.

use crate::error::Result;
use crate::format::CRC64;
use melodiff_core::config::ExtractionConfig;
use melodiff_core::SampleBuffer;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub content: u64,
    pub config: u64,
    /// Extraction parameters the config hash was taken over, as JSON
    pub params: String,
}

impl FeatureKey {
    pub fn new(buffer: &SampleBuffer, config: &ExtractionConfig) -> Result<Self> {
        let params = serde_json::to_string(config)?;
        Ok(Self {
            content: content_hash(buffer),
            config: CRC64.checksum(params.as_bytes()),
            params,
        })
    }

    /// File name stem used by directory stores
    pub fn file_stem(&self) -> String {
        format!("{:016x}-{:016x}", self.content, self.config)
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// CRC-64 over the mono samples and sample rate
pub fn content_hash(buffer: &SampleBuffer) -> u64 {
    let mono = buffer.to_mono();
    let mut digest = CRC64.digest();
    digest.update(&mono.sample_rate().to_le_bytes());
    for sample in mono.samples() {
        digest.update(&sample.to_le_bytes());
    }
    digest.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(samples: Vec<f32>) -> SampleBuffer {
        SampleBuffer::mono(samples, 22050).unwrap()
    }

    #[test]
    fn test_same_input_same_key() {
        let config = ExtractionConfig::default();
        let a = FeatureKey::new(&buffer(vec![0.1, 0.2, 0.3]), &config).unwrap();
        let b = FeatureKey::new(&buffer(vec![0.1, 0.2, 0.3]), &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.file_stem().len(), 33);
    }

    #[test]
    fn test_key_changes_with_content_and_config() {
        let config = ExtractionConfig::default();
        let base = FeatureKey::new(&buffer(vec![0.1, 0.2, 0.3]), &config).unwrap();

        let other_audio = FeatureKey::new(&buffer(vec![0.1, 0.2, 0.4]), &config).unwrap();
        assert_ne!(base.content, other_audio.content);
        assert_eq!(base.config, other_audio.config);

        let mut changed = config.clone();
        changed.hop_size = 256;
        let other_config = FeatureKey::new(&buffer(vec![0.1, 0.2, 0.3]), &changed).unwrap();
        assert_eq!(base.content, other_config.content);
        assert_ne!(base.config, other_config.config);
    }

    #[test]
    fn test_sample_rate_is_part_of_content() {
        let a = SampleBuffer::mono(vec![0.5; 16], 22050).unwrap();
        let b = SampleBuffer::mono(vec![0.5; 16], 44100).unwrap();
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
