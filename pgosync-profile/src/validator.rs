//! Structural validation of pprof CPU profile payloads.
//!
//! `net/http/pprof`-style endpoints serve a gzip-compressed
//! `perftools.profiles.Profile` protobuf message. The validator gunzips
//! when the gzip magic is present, then walks the top-level protobuf
//! fields and requires at least one `sample` record (field 2). Payload
//! bytes inside each field are not interpreted further; the artifact is
//! otherwise treated as opaque.

use std::io::Read;

use flate2::bufread::MultiGzDecoder;

use pgosync_core::{PortError, ProfileValidator};

use crate::error::ProfileError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Field number of `Profile.sample` in the pprof schema.
const SAMPLE_FIELD: u64 = 2;

/// Validates pprof payloads without fully decoding them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PprofValidator;

impl PprofValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw: &[u8]) -> Result<(), ProfileError> {
        if raw.is_empty() {
            return Err(ProfileError::EmptyProfile);
        }

        let decoded;
        let data: &[u8] = if raw.starts_with(&GZIP_MAGIC) {
            decoded = gunzip(raw)?;
            &decoded
        } else {
            raw
        };

        if count_samples(data)? == 0 {
            return Err(ProfileError::NoSamples);
        }

        Ok(())
    }
}

impl ProfileValidator for PprofValidator {
    fn validate_cpu_profile(&self, raw: &[u8]) -> Result<(), PortError> {
        Ok(self.validate(raw)?)
    }
}

fn gunzip(raw: &[u8]) -> Result<Vec<u8>, ProfileError> {
    let mut decoded = Vec::new();
    MultiGzDecoder::new(raw)
        .read_to_end(&mut decoded)
        .map_err(ProfileError::Gunzip)?;
    if decoded.is_empty() {
        return Err(ProfileError::EmptyProfile);
    }
    Ok(decoded)
}

/// Walk the top-level protobuf fields and count `sample` records.
fn count_samples(data: &[u8]) -> Result<usize, ProfileError> {
    let mut offset = 0usize;
    let mut samples = 0usize;

    while offset < data.len() {
        let key = read_varint(data, &mut offset)?;
        let field = key >> 3;
        let wire_type = key & 0x7;

        if field == 0 {
            return Err(ProfileError::Parse("field number 0".to_string()));
        }

        match wire_type {
            // varint
            0 => {
                read_varint(data, &mut offset)?;
            }
            // fixed64
            1 => {
                advance(data, &mut offset, 8)?;
            }
            // length-delimited
            2 => {
                let len = read_varint(data, &mut offset)? as usize;
                advance(data, &mut offset, len)?;
                if field == SAMPLE_FIELD {
                    samples += 1;
                }
            }
            // fixed32
            5 => {
                advance(data, &mut offset, 4)?;
            }
            other => {
                return Err(ProfileError::Parse(format!(
                    "unsupported wire type {other} for field {field}"
                )));
            }
        }
    }

    Ok(samples)
}

fn read_varint(data: &[u8], offset: &mut usize) -> Result<u64, ProfileError> {
    let mut value = 0u64;
    let mut shift = 0u32;

    loop {
        let byte = *data
            .get(*offset)
            .ok_or_else(|| ProfileError::Parse("truncated varint".to_string()))?;
        *offset += 1;

        if shift >= 64 {
            return Err(ProfileError::Parse("varint overflow".to_string()));
        }
        value |= u64::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn advance(data: &[u8], offset: &mut usize, len: usize) -> Result<(), ProfileError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| ProfileError::Parse("field length overflow".to_string()))?;
    if end > data.len() {
        return Err(ProfileError::Parse(format!(
            "field of {len} bytes exceeds payload"
        )));
    }
    *offset = end;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
