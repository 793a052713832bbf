//! Ordered key-path store and its change bus.
//!
//! This module provides:
//! - `data`: `ZineData`, the document store with get/set/delete by path
//! - `event`: `StoreEvent` and the depth rule (<= 2 is structural)
//! - `bus`: the generic synchronous `EventBus` and `Subscription` handles

pub mod bus;
pub mod data;
pub mod event;

pub use bus::{EventBus, ListenerId, Subscription};
pub use data::ZineData;
pub use event::{is_structural, StoreEvent, StoreEventKind, STRUCTURAL_DEPTH};
