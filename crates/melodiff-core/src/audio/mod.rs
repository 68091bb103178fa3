//! Audio decoding and resampling
//!
//! Supports WAV, MP3, FLAC and OGG with dedicated pure Rust decoders, and
//! M4A/AAC plus common containers (MP4, MKV, WebM, MOV) through Symphonia.

mod buffer;
mod container;
mod decoder;
mod resample;

pub use buffer::SampleBuffer;
pub use container::decode_with_symphonia;
pub use decoder::decode_audio;
pub use resample::resample_to_target;

use std::path::Path;

/// Supported audio and container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    // Pure audio formats
    Wav,
    Mp3,
    Flac,
    Ogg,
    M4a,

    // Container formats (extract first audio track)
    Mp4,
    Mkv,
    Mov,
    Webm,

    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            Some("m4a") | Some("aac") => AudioFormat::M4a,

            Some("mp4") | Some("m4v") => AudioFormat::Mp4,
            Some("mkv") => AudioFormat::Mkv,
            Some("mov") => AudioFormat::Mov,
            Some("webm") => AudioFormat::Webm,

            _ => AudioFormat::Unknown,
        }
    }

    /// Formats decoded through Symphonia rather than a dedicated decoder
    pub fn needs_symphonia(&self) -> bool {
        matches!(
            self,
            AudioFormat::M4a
                | AudioFormat::Mp4
                | AudioFormat::Mkv
                | AudioFormat::Mov
                | AudioFormat::Webm
        )
    }

    pub fn is_supported(&self) -> bool {
        *self != AudioFormat::Unknown
    }
}
