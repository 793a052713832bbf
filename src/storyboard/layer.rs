//! `ZineLayer`: one layer of a panel, addressed by `[panel_id, layer_id]`.
//!
//! A layer is a thin view over the store: field reads and writes go to
//! `prefix + [field]`. Field writes are depth-3 mutations, so the store only
//! reports them as plain updates; the layer emits its own `Update` event for
//! every `set_data` so panels and UI can react.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::document::Value;
use crate::error::{ZineError, ZineResult};
use crate::store::{EventBus, Subscription, ZineData};
use crate::storyboard::lifecycle::Lifecycle;

/// Event emitted by a layer.
#[derive(Debug, Clone)]
pub enum LayerEvent {
    /// A field was written through `set_data`.
    Update {
        key: String,
        value: Value,
        key_path: Vec<String>,
    },
}

struct LayerInner {
    store: ZineData,
    prefix: Vec<String>,
    bus: EventBus<LayerEvent>,
    lifecycle: Cell<Lifecycle>,
}

/// Handle to a live layer. Clones share the same layer.
#[derive(Clone)]
pub struct ZineLayer {
    inner: Rc<LayerInner>,
}

/// Non-owning layer reference held by listener closures.
#[derive(Clone)]
pub(crate) struct WeakLayer(Weak<LayerInner>);

impl WeakLayer {
    pub(crate) fn upgrade(&self) -> Option<ZineLayer> {
        self.0.upgrade().map(|inner| ZineLayer { inner })
    }
}

impl ZineLayer {
    pub(crate) fn new(store: ZineData, prefix: Vec<String>) -> Self {
        let layer = Self {
            inner: Rc::new(LayerInner {
                store,
                prefix,
                bus: EventBus::new(),
                lifecycle: Cell::new(Lifecycle::Constructed),
            }),
        };
        // Layers hold no store subscriptions of their own.
        layer.inner.lifecycle.set(Lifecycle::Listening);
        layer
    }

    pub(crate) fn downgrade(&self) -> WeakLayer {
        WeakLayer(Rc::downgrade(&self.inner))
    }

    /// The layer key (last prefix segment).
    pub fn id(&self) -> &str {
        self.inner
            .prefix
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Full path of this layer: `[panel_id, layer_id]`.
    pub fn prefix(&self) -> &[String] {
        &self.inner.prefix
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    /// True if both handles refer to the same live layer.
    pub fn ptr_eq(&self, other: &ZineLayer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn field_path(&self, key: &str) -> Vec<String> {
        let mut path = self.inner.prefix.clone();
        path.push(key.to_string());
        path
    }

    // =========================================================================
    // FIELDS
    // =========================================================================

    /// Value of field `key`, if set.
    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.inner.store.get(&self.field_path(key))
    }

    /// Writes field `key` and emits `LayerEvent::Update`.
    ///
    /// Fails on a destroyed layer: writing through would re-create the
    /// removed entry in the store without any structural event.
    pub fn set_data(&self, key: &str, value: impl Into<Value>) -> ZineResult<()> {
        if self.lifecycle().is_destroyed() {
            return Err(ZineError::destroyed(format!("layer {}", self.id())));
        }
        let key_path = self.field_path(key);
        let value = value.into();
        self.inner.store.set(&key_path, value.clone())?;

        trace!(layer = %self.id(), field = key, "layer update");
        self.inner.bus.emit(&LayerEvent::Update {
            key: key.to_string(),
            value,
            key_path,
        });
        Ok(())
    }

    /// Field names, in document order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.keys(&self.inner.prefix)
    }

    /// True if every field named in `specs` is present.
    pub fn matches_specs<S: AsRef<str>>(&self, specs: &[S]) -> bool {
        let keys = self.keys();
        specs
            .iter()
            .all(|spec| keys.iter().any(|k| k == spec.as_ref()))
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Registers a listener for this layer's `Update` events.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LayerEvent) + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    /// Marks the layer destroyed. Idempotent.
    pub fn destroy(&self) {
        self.inner.lifecycle.set(Lifecycle::Destroyed);
    }
}

impl fmt::Debug for ZineLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZineLayer")
            .field("prefix", &self.inner.prefix)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
