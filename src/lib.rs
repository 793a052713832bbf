//! Zinedoc - ordered key-path document store for zine authoring.
//!
//! A zine is one nested, ordered document. Top-level entries are panels,
//! their children are layers, and layer children are fields (images, depth
//! maps, names). The crate keeps live projection objects in sync with that
//! document purely through change events:
//!
//! - **Store**: `ZineData` gets, sets and deletes by key path and reports
//!   every mutation as an `add`, `remove` or `update` event
//! - **Projections**: `ZineStoryboard` / `ZinePanel` / `ZineLayer` subscribe
//!   to the store and create or tear down children as entries come and go
//! - **Blobs**: export and load go through the `ZINE` codec, with an async
//!   compression pass run on a disposable copy
//!
//! # Example
//!
//! ```rust
//! use zinedoc::{Value, ZineStoryboard};
//!
//! let storyboard = ZineStoryboard::new();
//! let panel = storyboard.add_panel().unwrap();
//! let layer = panel.add_layer().unwrap();
//! layer.set_data("name", "sky").unwrap();
//!
//! assert_eq!(layer.get_data("name"), Some(Value::from("sky")));
//!
//! // Independent copy through an uncompressed round-trip
//! let copy = storyboard.clone_storyboard().unwrap();
//! assert_eq!(copy.keys(), storyboard.keys());
//! ```

pub mod codec;
pub mod compress;
pub mod config;
pub mod document;
pub mod error;
pub mod ids;
pub mod store;
pub mod storyboard;

// Re-exports for convenience
pub use compress::{Compressor, FieldCompressor, NoCompression};
pub use config::CompressionConfig;
pub use document::{Datum, Document, Value};
pub use error::{ZineError, ZineResult};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use store::{StoreEvent, StoreEventKind, Subscription, ZineData};
pub use storyboard::{
    LayerEvent, Lifecycle, PanelEvent, StoryboardEvent, StoryboardOptions, ZineLayer, ZinePanel,
    ZineStoryboard,
};
