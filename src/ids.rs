//! Identifier generation for new panels and layers.
//!
//! The store trusts whatever the generator returns; uniqueness is the
//! generator's job.

use std::cell::Cell;

use uuid::Uuid;

/// Produces fresh keys for new panels and layers.
pub trait IdGenerator {
    fn make_id(&self) -> String;
}

/// Random v4 UUIDs in simple (hyphenless) form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn make_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic `prefix0`, `prefix1`, ... ids.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: Cell<u64>,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Cell::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn make_id(&self) -> String {
        let n = self.next.get();
        self.next.set(n + 1);
        format!("{}{}", self.prefix, n)
    }
}

/// Generates a fresh random id.
pub fn make_id() -> String {
    UuidIdGenerator.make_id()
}
