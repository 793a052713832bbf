//! Field compression pass for export and load.
//!
//! A `Compressor` rewrites a storyboard in place. The storyboard only ever
//! hands it disposable copies, so the live instance keeps plain values.

use std::io::{Read, Write};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::trace;

use crate::codec::{floats_to_le_bytes, le_bytes_to_floats};
use crate::config::CompressionConfig;
use crate::document::{Datum, Value};
use crate::error::{ZineError, ZineResult};
use crate::storyboard::{ZineLayer, ZineStoryboard};

/// Async hook run over a storyboard copy on export (`compress`) and on
/// load (`decompress`).
#[async_trait(?Send)]
pub trait Compressor {
    async fn compress(&self, storyboard: &ZineStoryboard) -> ZineResult<()>;
    async fn decompress(&self, storyboard: &ZineStoryboard) -> ZineResult<()>;
}

/// Identity compressor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompression;

#[async_trait(?Send)]
impl Compressor for NoCompression {
    async fn compress(&self, _storyboard: &ZineStoryboard) -> ZineResult<()> {
        Ok(())
    }

    async fn decompress(&self, _storyboard: &ZineStoryboard) -> ZineResult<()> {
        Ok(())
    }
}

/// Check if data is gzip compressed (magic bytes: 0x1f 0x8b)
pub fn is_gzipped(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Packs large float arrays on layers into gzip'd little-endian bytes.
#[derive(Debug, Clone, Default)]
pub struct FieldCompressor {
    config: CompressionConfig,
}

impl FieldCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config` before use; an out-of-range level is rejected.
    pub fn from_config(config: CompressionConfig) -> ZineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    pub fn pack_floats(&self, values: &[f32]) -> ZineResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.config.level));
        encoder.write_all(&floats_to_le_bytes(values))?;
        Ok(encoder.finish()?)
    }

    pub fn unpack_floats(&self, packed: &[u8]) -> ZineResult<Vec<f32>> {
        if !is_gzipped(packed) {
            return Err(ZineError::compression("packed field is not gzip data"));
        }
        let mut decoder = GzDecoder::new(packed);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        le_bytes_to_floats(&bytes)
    }

    fn should_pack(&self, field: &str, values: &[f32]) -> bool {
        values.len() >= self.config.min_len && self.config.covers(field)
    }

    /// Rewrites every layer field for which `rewrite` returns a new datum.
    fn rewrite_fields<F>(storyboard: &ZineStoryboard, rewrite: F) -> ZineResult<usize>
    where
        F: Fn(&str, &Datum) -> ZineResult<Option<Datum>>,
    {
        let mut count = 0;
        for panel in storyboard.panels() {
            for layer in panel.live_layers() {
                count += Self::rewrite_layer(&layer, &rewrite)?;
            }
        }
        Ok(count)
    }

    fn rewrite_layer<F>(layer: &ZineLayer, rewrite: &F) -> ZineResult<usize>
    where
        F: Fn(&str, &Datum) -> ZineResult<Option<Datum>>,
    {
        let mut count = 0;
        for field in layer.keys() {
            let Some(Value::Datum(datum)) = layer.get_data(&field) else {
                continue;
            };
            if let Some(replacement) = rewrite(&field, &datum)? {
                layer.set_data(&field, replacement)?;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait(?Send)]
impl Compressor for FieldCompressor {
    async fn compress(&self, storyboard: &ZineStoryboard) -> ZineResult<()> {
        let packed = Self::rewrite_fields(storyboard, |field, datum| match datum {
            Datum::Floats(values) if self.should_pack(field, values) => {
                Ok(Some(Datum::Packed(self.pack_floats(values)?)))
            }
            _ => Ok(None),
        })?;
        trace!(fields = packed, "packed float fields");
        Ok(())
    }

    async fn decompress(&self, storyboard: &ZineStoryboard) -> ZineResult<()> {
        let unpacked = Self::rewrite_fields(storyboard, |_field, datum| match datum {
            Datum::Packed(bytes) => Ok(Some(Datum::Floats(self.unpack_floats(bytes)?))),
            _ => Ok(None),
        })?;
        trace!(fields = unpacked, "unpacked float fields");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storyboard::StoryboardOptions;

    #[test]
    fn test_is_gzipped() {
        assert!(is_gzipped(&[0x1f, 0x8b, 0x08, 0x00]));
        assert!(!is_gzipped(b"ZINE"));
        assert!(!is_gzipped(&[]));
    }

    #[test]
    fn test_pack_unpack_floats() {
        let compressor = FieldCompressor::new();
        let values: Vec<f32> = (0..300).map(|i| (i % 7) as f32).collect();
        let packed = compressor.pack_floats(&values).unwrap();

        assert!(is_gzipped(&packed));
        assert!(packed.len() < values.len() * 4);
        assert_eq!(compressor.unpack_floats(&packed).unwrap(), values);
    }

    #[test]
    fn test_from_config_rejects_bad_level() {
        let err = FieldCompressor::from_config(CompressionConfig::new().with_level(12)).unwrap_err();
        assert!(matches!(err, ZineError::InvalidConfig(_)));

        let compressor = FieldCompressor::from_config(CompressionConfig::new().with_level(9)).unwrap();
        assert_eq!(compressor.config().level, 9);
    }

    #[test]
    fn test_unpack_rejects_plain_bytes() {
        let err = FieldCompressor::new().unpack_floats(&[0, 0, 128, 63]).unwrap_err();
        assert!(matches!(err, ZineError::Compression(_)));
    }

    #[tokio::test]
    async fn test_compress_respects_field_filter() {
        let board = ZineStoryboard::with_options(StoryboardOptions::new());
        let layer = board.add_panel().unwrap().add_layer().unwrap();
        layer.set_data("depthField", vec![0.5f32; 8]).unwrap();
        layer.set_data("weights", vec![0.5f32; 8]).unwrap();
        layer.set_data("name", "sky").unwrap();

        let compressor = FieldCompressor::from_config(
            CompressionConfig::new().with_min_len(2).with_fields(["depthField"]),
        )
        .unwrap();
        compressor.compress(&board).await.unwrap();

        let kind = |field: &str| layer.get_data(field).and_then(Value::into_datum).map(|d| d.kind());
        assert_eq!(kind("depthField"), Some("packed"));
        assert_eq!(kind("weights"), Some("floats"));
        assert_eq!(kind("name"), Some("str"));

        compressor.decompress(&board).await.unwrap();
        assert_eq!(kind("depthField"), Some("floats"));
    }

    #[tokio::test]
    async fn test_no_compression_is_identity() {
        let board = ZineStoryboard::new();
        let layer = board.add_panel().unwrap().add_layer().unwrap();
        layer.set_data("depthField", vec![1.0f32; 1024]).unwrap();
        let before = board.store().snapshot();

        NoCompression.compress(&board).await.unwrap();
        assert_eq!(board.store().snapshot(), before);
    }
}
