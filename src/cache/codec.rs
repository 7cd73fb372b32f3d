// ABOUTME: Payload codec for cached values: JSON with optional gzip above a size threshold
// ABOUTME: Decoding recognizes compressed payloads by the gzip magic prefix
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::CacheError;
use crate::constants::cache::{COMPRESSED_PAYLOAD_MAGIC, MAX_DECOMPRESSED_BYTES};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Bytes ready to hand to a cache store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Stored representation, gzip stream or plain JSON
    pub bytes: Vec<u8>,
    /// Whether `bytes` is a gzip stream
    pub compressed: bool,
    /// Size of the JSON text before compression
    pub serialized_len: usize,
}

/// Encoder/decoder for cache payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadCodec {
    compress: bool,
    threshold: usize,
    max_decoded_len: usize,
}

impl PayloadCodec {
    /// Create a codec; payloads strictly larger than `threshold` bytes are
    /// compressed when `compress` is set
    #[must_use]
    pub const fn new(compress: bool, threshold: usize) -> Self {
        Self {
            compress,
            threshold,
            max_decoded_len: MAX_DECOMPRESSED_BYTES,
        }
    }

    /// Copy of this codec with a different cap on decompressed size
    #[must_use]
    pub const fn with_max_decoded_len(mut self, max_decoded_len: usize) -> Self {
        self.max_decoded_len = max_decoded_len;
        self
    }

    /// Serialize `value` to JSON, compressing it if it crosses the threshold
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or compressed
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<EncodedPayload, CacheError> {
        let json =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let serialized_len = json.len();

        if !self.compress || serialized_len <= self.threshold {
            return Ok(EncodedPayload {
                bytes: json,
                compressed: false,
                serialized_len,
            });
        }

        let mut encoder = GzEncoder::new(Vec::with_capacity(serialized_len / 2), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| CacheError::Compression(e.to_string()))?;
        let bytes = encoder
            .finish()
            .map_err(|e| CacheError::Compression(e.to_string()))?;

        Ok(EncodedPayload {
            bytes,
            compressed: true,
            serialized_len,
        })
    }

    /// Deserialize a stored payload, decompressing it first if it is a gzip stream
    ///
    /// Decoding does not depend on the `compress` setting, so entries written
    /// under a different configuration remain readable.
    ///
    /// # Errors
    ///
    /// Returns an error if decompression or JSON deserialization fails
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        if is_compressed(bytes) {
            let limit = u64::try_from(self.max_decoded_len).unwrap_or(u64::MAX);
            let capacity = bytes.len().saturating_mul(4).min(self.max_decoded_len);
            let mut json = Vec::with_capacity(capacity);
            GzDecoder::new(bytes)
                .take(limit.saturating_add(1))
                .read_to_end(&mut json)
                .map_err(|e| CacheError::Compression(e.to_string()))?;
            if json.len() > self.max_decoded_len {
                return Err(CacheError::Compression(format!(
                    "decompressed payload exceeds {} bytes",
                    self.max_decoded_len
                )));
            }
            return serde_json::from_slice(&json)
                .map_err(|e| CacheError::Deserialization(e.to_string()));
        }
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// Whether `bytes` starts with the gzip magic prefix
#[must_use]
pub fn is_compressed(bytes: &[u8]) -> bool {
    bytes.starts_with(&COMPRESSED_PAYLOAD_MAGIC)
}
