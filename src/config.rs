//! Settings for the export/import compression pass.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ZineError, ZineResult};

/// Controls which float fields `FieldCompressor` packs on export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Float arrays shorter than this are left unpacked.
    pub min_len: usize,
    /// gzip level, 0-9.
    pub level: u32,
    /// Only pack these field names. Empty means every float field.
    pub fields: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_len: 256,
            level: 6,
            fields: Vec::new(),
        }
    }
}

impl CompressionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set the minimum packed length.
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Builder: Set the gzip level.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Builder: Restrict packing to the named fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// True if `field` is eligible for packing by name.
    pub fn covers(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.iter().any(|f| f == field)
    }

    pub fn validate(&self) -> ZineResult<()> {
        if self.level > 9 {
            return Err(ZineError::InvalidConfig(format!(
                "gzip level {} is out of range 0-9",
                self.level
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON config. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> ZineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ZineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
