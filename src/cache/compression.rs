//! LZ4 Value Compression
//!
//! [`Lz4Transformer`] lets a level keep values compressed at rest while the
//! rest of the pipeline sees plain bytes. Stored frames carry a one-byte
//! algorithm tag, so small or incompressible payloads can be kept raw.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use tierstack::cache::{Lz4Transformer, TwoWayTransformer};
//!
//! let transformer = Lz4Transformer::new();
//! let plain = Bytes::from(vec![b'a'; 4096]);
//!
//! let stored = transformer.inverse_transform(&plain).unwrap();
//! assert!(stored.len() < plain.len());
//! assert_eq!(transformer.transform(&stored), Some(plain));
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use super::transformer::TwoWayTransformer;
use crate::error::{Error, Result};

// =============================================================================
// Compression Algorithm
// =============================================================================

/// Algorithm tag stored in front of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// Stored uncompressed
    None,
    /// LZ4 block with size prefix
    Lz4,
}

impl CompressionAlgorithm {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::None => "none",
            CompressionAlgorithm::Lz4 => "lz4",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            CompressionAlgorithm::None => 0,
            CompressionAlgorithm::Lz4 => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionAlgorithm::None),
            1 => Some(CompressionAlgorithm::Lz4),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Compression Configuration
// =============================================================================

/// Configuration for compression
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Minimum size to compress (smaller values are stored raw)
    pub min_size_bytes: usize,
    /// LZ4 high-compression level
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 1024,
            level: 4,
        }
    }
}

impl CompressionConfig {
    /// Set the minimum size to compress
    pub fn with_min_size(mut self, min_size_bytes: usize) -> Self {
        self.min_size_bytes = min_size_bytes;
        self
    }

    /// Set the compression level
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }
}

// =============================================================================
// LZ4 Transformer
// =============================================================================

/// Compressed frames at rest, plain bytes exposed
#[derive(Debug, Clone, Default)]
pub struct Lz4Transformer {
    config: CompressionConfig,
}

impl Lz4Transformer {
    /// Create with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Encode `data` into a tagged frame
    ///
    /// Falls back to a raw frame when the payload is small, when compression
    /// fails, or when compression does not shrink the payload.
    pub fn encode(&self, data: &[u8]) -> Bytes {
        if data.len() >= self.config.min_size_bytes {
            match self.compress(data) {
                Ok(compressed) if compressed.len() < data.len() => {
                    return frame(CompressionAlgorithm::Lz4, &compressed);
                }
                Ok(_) => {}
                Err(e) => warn!("Compression failed, storing uncompressed: {}", e),
            }
        }
        frame(CompressionAlgorithm::None, data)
    }

    /// Decode a tagged frame back into plain bytes
    pub fn decode(&self, frame: &[u8]) -> Result<Bytes> {
        let (&tag, payload) = frame.split_first().ok_or_else(|| Error::Codec {
            codec: "lz4".into(),
            reason: "empty frame".into(),
        })?;

        match CompressionAlgorithm::from_tag(tag) {
            Some(CompressionAlgorithm::None) => Ok(Bytes::copy_from_slice(payload)),
            Some(CompressionAlgorithm::Lz4) => lz4::block::decompress(payload, None)
                .map(Bytes::from)
                .map_err(|e| Error::Codec {
                    codec: "lz4".into(),
                    reason: e.to_string(),
                }),
            None => Err(Error::Codec {
                codec: "lz4".into(),
                reason: format!("unknown algorithm tag {}", tag),
            }),
        }
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        lz4::block::compress(
            data,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.config.level)),
            true,
        )
        .map_err(|e| Error::Codec {
            codec: "lz4".into(),
            reason: e.to_string(),
        })
    }
}

fn frame(algorithm: CompressionAlgorithm, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 1);
    buf.put_u8(algorithm.tag());
    buf.put_slice(payload);
    buf.freeze()
}

impl TwoWayTransformer for Lz4Transformer {
    type Input = Bytes;
    type Output = Bytes;

    fn transform(&self, value: &Bytes) -> Option<Bytes> {
        self.decode(value)
            .map_err(|e| debug!("Discarding undecodable frame: {}", e))
            .ok()
    }

    fn inverse_transform(&self, value: &Bytes) -> Option<Bytes> {
        Some(self.encode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DATA: &[u8] = b"Hello, this is test data that should compress well. \
        It has some repetition: Hello, this is test data that should compress well.";

    fn eager() -> Lz4Transformer {
        Lz4Transformer::with_config(CompressionConfig::default().with_min_size(0))
    }

    #[test]
    fn test_lz4_roundtrip() {
        let transformer = eager();

        let stored = transformer.encode(TEST_DATA);
        assert_eq!(stored[0], CompressionAlgorithm::Lz4.tag());
        assert!(stored.len() < TEST_DATA.len());

        assert_eq!(transformer.decode(&stored).unwrap().as_ref(), TEST_DATA);
    }

    #[test]
    fn test_small_values_stored_raw() {
        let transformer = Lz4Transformer::new();

        let stored = transformer.encode(b"tiny");
        assert_eq!(stored[0], CompressionAlgorithm::None.tag());
        assert_eq!(&stored[1..], b"tiny");
        assert_eq!(transformer.transform(&stored), Some(Bytes::from_static(b"tiny")));
    }

    #[test]
    fn test_incompressible_data_stored_raw() {
        let transformer = eager();
        let random_data: Vec<u8> = (0..64u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();

        let stored = transformer.encode(&random_data);
        if stored[0] == CompressionAlgorithm::None.tag() {
            assert_eq!(stored.len(), random_data.len() + 1);
        } else {
            assert!(stored.len() <= random_data.len());
        }
        assert_eq!(transformer.decode(&stored).unwrap().as_ref(), random_data.as_slice());
    }

    #[test]
    fn test_corrupt_frames_fail_to_transform() {
        let transformer = eager();

        assert_eq!(transformer.transform(&Bytes::new()), None);
        assert_eq!(transformer.transform(&Bytes::from_static(&[9, 1, 2])), None);
        assert_eq!(transformer.transform(&Bytes::from_static(&[1, 2])), None);
        assert_eq!(
            transformer.transform(&Bytes::from_static(&[1, 0xff, 0xff, 0xff, 0xff, 3])),
            None
        );
    }

    #[test]
    fn test_decode_errors_are_codec_errors() {
        let err = eager().decode(&[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Codec);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(CompressionAlgorithm::None.name(), "none");
        assert_eq!(CompressionAlgorithm::Lz4.to_string(), "lz4");
    }
}
