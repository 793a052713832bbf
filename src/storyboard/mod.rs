//! Reactive storyboard projections over a zine store.
//!
//! This module provides:
//! - `board`: `ZineStoryboard`, the root with one panel per top-level entry
//! - `panel`: `ZinePanel`, layer slots with interior holes and tail-shaving
//! - `layer`: `ZineLayer`, field get/set with update events
//! - `lifecycle`: the shared `Constructed -> Listening -> Destroyed` state

pub mod board;
pub mod layer;
pub mod lifecycle;
pub mod panel;

pub use board::{StoryboardEvent, StoryboardOptions, ZineStoryboard};
pub use layer::{LayerEvent, ZineLayer};
pub use lifecycle::Lifecycle;
pub use panel::{PanelEvent, ZinePanel};
