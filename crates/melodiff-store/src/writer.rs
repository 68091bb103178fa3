//! .mdf file writer

use crate::error::{Result, StoreError};
use crate::format::{MdfFile, MdfHeader, MdfMetadata, CRC64};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// zstd level used unless configured otherwise
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

pub struct MdfWriter {
    /// zstd level, `None` writes the payload uncompressed
    compression_level: Option<i32>,
}

impl MdfWriter {
    pub fn new() -> Self {
        Self {
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
        }
    }

    pub fn uncompressed() -> Self {
        Self {
            compression_level: None,
        }
    }

    /// Write .mdf file
    pub fn write(&self, path: &Path, mdf_file: &MdfFile) -> Result<()> {
        let bytes = self.encode(mdf_file)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes)?;
        writer.flush()?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Encode a complete file into memory
    pub fn encode(&self, mdf_file: &MdfFile) -> Result<Vec<u8>> {
        let metadata = encode_metadata(&mdf_file.metadata)?;
        let payload = bincode::serialize(&mdf_file.features)?;

        let mut header = mdf_file.header.clone();
        header.metadata_size = metadata.len() as u64;
        header.payload_size = payload.len() as u64;
        header.checksum = CRC64.checksum(&payload);

        let stored = match self.compression_level {
            Some(level) => {
                let compressed = zstd::encode_all(&payload[..], level)?;
                header.set_compressed(true);
                header.payload_size_compressed = compressed.len() as u64;
                compressed
            }
            None => {
                header.set_compressed(false);
                header.payload_size_compressed = 0;
                payload
            }
        };

        let mut out = Vec::with_capacity(crate::format::HEADER_SIZE + metadata.len() + stored.len());
        write_header(&mut out, &header)?;
        out.extend_from_slice(&metadata);
        out.extend_from_slice(&stored);
        Ok(out)
    }
}

impl Default for MdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_header(out: &mut Vec<u8>, header: &MdfHeader) -> Result<()> {
    // Write as little-endian binary
    out.write_all(&header.magic)?;
    out.write_all(&header.version.to_le_bytes())?;
    out.write_all(&header.flags.to_le_bytes())?;
    out.write_all(&header.metadata_size.to_le_bytes())?;
    out.write_all(&header.payload_size.to_le_bytes())?;
    out.write_all(&header.payload_size_compressed.to_le_bytes())?;
    out.write_all(&header.num_frames.to_le_bytes())?;
    out.write_all(&header.sample_rate.to_le_bytes())?;
    out.write_all(&header.duration_ms.to_le_bytes())?;
    out.write_all(&header.mfcc_dim.to_le_bytes())?;
    out.write_all(&header.chroma_dim.to_le_bytes())?;
    out.write_all(&header.checksum.to_le_bytes())?;
    out.write_all(&header.reserved.to_le_bytes())?;

    Ok(())
}

fn encode_metadata(metadata: &MdfMetadata) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    // Algorithm ID (8 bytes, null-padded)
    let mut algo_id = [0u8; 8];
    let bytes = metadata.algorithm_id.as_bytes();
    let len = bytes.len().min(8);
    algo_id[..len].copy_from_slice(&bytes[..len]);
    out.extend_from_slice(&algo_id);

    // Extraction params as JSON (length-prefixed)
    let params_bytes = metadata.extraction_params.as_bytes();
    out.extend_from_slice(&(params_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(params_bytes);

    // Original filename (null-terminated)
    if metadata.original_filename.as_bytes().contains(&0) {
        return Err(StoreError::Metadata(
            "original filename contains a NUL byte".to_string(),
        ));
    }
    out.extend_from_slice(metadata.original_filename.as_bytes());
    out.push(0);

    // Cache keys
    out.extend_from_slice(&metadata.content_key.to_le_bytes());
    out.extend_from_slice(&metadata.config_key.to_le_bytes());

    Ok(out)
}
