//! .mdf file format structures
//!
//! Layout: fixed 64-byte little-endian header, metadata section, then the
//! bincode-encoded feature payload, zstd-compressed when flag bit 0 is set.
//! The header checksum is the CRC-64 of the uncompressed payload.

use crc::{Crc, CRC_64_ECMA_182};
use melodiff_core::TrackFeatures;
use serde::{Deserialize, Serialize};

/// Magic bytes for .mdf files: "MDFF"
pub const MAGIC: [u8; 4] = [0x4D, 0x44, 0x46, 0x46];

/// Current format version
pub const VERSION: u16 = 1;

/// Encoded header size in bytes
pub const HEADER_SIZE: usize = 64;

/// Algorithm identifier stored in the metadata
pub const ALGORITHM_ID: &str = "MELODIFF";

pub(crate) const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// File header (64 bytes fixed size)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdfHeader {
    /// Magic bytes: "MDFF"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (bit 0: compressed)
    pub flags: u16,
    /// Size of metadata section
    pub metadata_size: u64,
    /// Size of payload (uncompressed)
    pub payload_size: u64,
    /// Compressed payload size (0 if uncompressed)
    pub payload_size_compressed: u64,
    /// Number of analysis frames
    pub num_frames: u32,
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Duration (milliseconds)
    pub duration_ms: u32,
    /// MFCC coefficients per frame
    pub mfcc_dim: u16,
    /// Chroma classes per frame
    pub chroma_dim: u16,
    /// CRC64 checksum of the uncompressed payload
    pub checksum: u64,
    /// Reserved
    pub reserved: u64,
}

impl MdfHeader {
    pub fn new(features: &TrackFeatures) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            metadata_size: 0,
            payload_size: 0,
            payload_size_compressed: 0,
            num_frames: features.info.num_frames as u32,
            sample_rate: features.info.sample_rate,
            duration_ms: (features.info.duration_secs * 1000.0) as u32,
            mfcc_dim: features.mfcc.dim() as u16,
            chroma_dim: features.chroma.dim() as u16,
            checksum: 0,
            reserved: 0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        (self.flags & 0x1) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        if compressed {
            self.flags |= 0x1;
        } else {
            self.flags &= !0x1;
        }
    }

    /// Stored size of the payload section
    pub fn stored_payload_size(&self) -> u64 {
        if self.is_compressed() {
            self.payload_size_compressed
        } else {
            self.payload_size
        }
    }
}

/// Metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdfMetadata {
    /// Algorithm ID ("MELODIFF")
    pub algorithm_id: String,
    /// Extraction parameters (JSON)
    pub extraction_params: String,
    /// Original filename
    pub original_filename: String,
    /// CRC-64 of the decoded samples
    pub content_key: u64,
    /// CRC-64 of the extraction parameters
    pub config_key: u64,
}

/// Complete .mdf file structure
#[derive(Debug, Clone, PartialEq)]
pub struct MdfFile {
    pub header: MdfHeader,
    pub metadata: MdfMetadata,
    pub features: TrackFeatures,
}

impl MdfFile {
    pub fn new(features: TrackFeatures, metadata: MdfMetadata) -> Self {
        Self {
            header: MdfHeader::new(&features),
            metadata,
            features,
        }
    }
}
