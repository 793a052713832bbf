//! Ordered nested document model.
//!
//! This module provides:
//! - `model`: `Datum`, `Value` and the ordered `Document` with path walking

pub mod model;

pub use model::{Datum, Document, Value};
