//! .mdf file reader

use crate::error::{Result, StoreError};
use crate::format::{MdfFile, MdfHeader, MdfMetadata, CRC64, HEADER_SIZE, MAGIC, VERSION};
use melodiff_core::TrackFeatures;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

pub struct MdfReader;

impl MdfReader {
    /// Read .mdf file
    pub fn read(path: &Path) -> Result<MdfFile> {
        let file = File::open(path)?;
        // SAFETY: mapped read-only; feature files are written once and not
        // modified in place
        let mmap = unsafe { Mmap::map(&file)? };
        log::debug!("Mapped {} ({} bytes)", path.display(), mmap.len());
        Self::parse(&mmap)
    }

    /// Read only the header, without decoding the payload
    pub fn read_header(path: &Path) -> Result<MdfHeader> {
        let file = File::open(path)?;
        // SAFETY: as in `read`
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse_header(&mut Cursor::new(&mmap))
    }

    /// Decode a complete file from memory
    pub fn parse(bytes: &[u8]) -> Result<MdfFile> {
        let mut cursor = Cursor::new(bytes);

        let header = Self::parse_header(&mut cursor)?;
        let metadata_bytes = cursor.take(header.metadata_size as usize)?;
        let metadata = Self::parse_metadata(metadata_bytes)?;
        let stored = cursor.take(header.stored_payload_size() as usize)?;

        let payload = if header.is_compressed() {
            zstd::decode_all(stored)?
        } else {
            stored.to_vec()
        };
        if payload.len() as u64 != header.payload_size {
            return Err(StoreError::Metadata(format!(
                "payload is {} bytes, header declares {}",
                payload.len(),
                header.payload_size
            )));
        }

        let actual = CRC64.checksum(&payload);
        if actual != header.checksum {
            return Err(StoreError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let features: TrackFeatures = bincode::deserialize(&payload)?;
        if features.mfcc.dim() != header.mfcc_dim as usize
            || features.chroma.dim() != header.chroma_dim as usize
        {
            return Err(StoreError::Metadata(format!(
                "payload dimensions {}/{} disagree with header {}/{}",
                features.mfcc.dim(),
                features.chroma.dim(),
                header.mfcc_dim,
                header.chroma_dim
            )));
        }

        Ok(MdfFile {
            header,
            metadata,
            features,
        })
    }

    fn parse_header(cursor: &mut Cursor<'_>) -> Result<MdfHeader> {
        if cursor.remaining() < HEADER_SIZE {
            return Err(StoreError::Truncated {
                offset: cursor.offset,
                needed: HEADER_SIZE,
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(cursor.take(4)?);
        if magic != MAGIC {
            return Err(StoreError::BadMagic);
        }

        let version = cursor.read_u16()?;
        if version != VERSION {
            return Err(StoreError::UnsupportedVersion(version));
        }

        Ok(MdfHeader {
            magic,
            version,
            flags: cursor.read_u16()?,
            metadata_size: cursor.read_u64()?,
            payload_size: cursor.read_u64()?,
            payload_size_compressed: cursor.read_u64()?,
            num_frames: cursor.read_u32()?,
            sample_rate: cursor.read_u32()?,
            duration_ms: cursor.read_u32()?,
            mfcc_dim: cursor.read_u16()?,
            chroma_dim: cursor.read_u16()?,
            checksum: cursor.read_u64()?,
            reserved: cursor.read_u64()?,
        })
    }

    fn parse_metadata(bytes: &[u8]) -> Result<MdfMetadata> {
        let mut cursor = Cursor::new(bytes);

        // Algorithm ID (8 bytes)
        let algorithm_id = String::from_utf8_lossy(cursor.take(8)?)
            .trim_end_matches('\0')
            .to_string();

        // Extraction params (length-prefixed)
        let params_len = cursor.read_u32()? as usize;
        let extraction_params = String::from_utf8(cursor.take(params_len)?.to_vec())
            .map_err(|e| StoreError::Metadata(e.to_string()))?;

        // Original filename (null-terminated)
        let rest = &bytes[cursor.offset..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| StoreError::Metadata("unterminated filename".to_string()))?;
        let original_filename = String::from_utf8(cursor.take(end)?.to_vec())
            .map_err(|e| StoreError::Metadata(e.to_string()))?;
        cursor.take(1)?;

        Ok(MdfMetadata {
            algorithm_id,
            extraction_params,
            original_filename,
            content_key: cursor.read_u64()?,
            config_key: cursor.read_u64()?,
        })
    }
}

/// Bounds-checked little-endian reader over a byte slice
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(StoreError::Truncated {
                offset: self.offset,
                needed: n,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}
