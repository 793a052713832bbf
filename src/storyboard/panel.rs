//! `ZinePanel`: one panel of the storyboard and its live layer slots.
//!
//! Layers are conceptually indexed slots. Removing a layer empties its slot;
//! only trailing empty slots are dropped, so interior holes survive until
//! they reach the tail.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::document::Value;
use crate::error::{ZineError, ZineResult};
use crate::ids::IdGenerator;
use crate::store::{EventBus, StoreEvent, StoreEventKind, Subscription, ZineData};
use crate::storyboard::layer::{LayerEvent, ZineLayer};
use crate::storyboard::lifecycle::Lifecycle;

/// Event emitted by a panel.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    LayerAdd { key_path: Vec<String>, layer: ZineLayer },
    LayerRemove { key_path: Vec<String>, layer: ZineLayer },
    /// Re-emitted `LayerEvent::Update` of one of this panel's layers.
    LayerUpdate { key_path: Vec<String>, layer: ZineLayer },
}

struct LayerSlot {
    layer: ZineLayer,
    /// The panel's listener on the layer's own bus.
    update_subscription: Subscription,
}

impl LayerSlot {
    fn teardown(&self) {
        self.update_subscription.unsubscribe();
        self.layer.destroy();
    }
}

struct PanelInner {
    store: ZineData,
    prefix: Vec<String>,
    ids: Rc<dyn IdGenerator>,
    layers: RefCell<Vec<Option<LayerSlot>>>,
    bus: EventBus<PanelEvent>,
    subscriptions: RefCell<Vec<Subscription>>,
    lifecycle: Cell<Lifecycle>,
}

/// Handle to a live panel. Clones share the same panel.
#[derive(Clone)]
pub struct ZinePanel {
    inner: Rc<PanelInner>,
}

/// Drops trailing empty slots.
fn shave_tail<T>(slots: &mut Vec<Option<T>>) {
    while matches!(slots.last(), Some(None)) {
        slots.pop();
    }
}

impl ZinePanel {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Builds the panel at `prefix`, materializes a layer for every existing
    /// entry, then starts listening.
    pub(crate) fn new(store: ZineData, prefix: Vec<String>, ids: Rc<dyn IdGenerator>) -> Self {
        let panel = Self {
            inner: Rc::new(PanelInner {
                store,
                prefix,
                ids,
                layers: RefCell::new(Vec::new()),
                bus: EventBus::new(),
                subscriptions: RefCell::new(Vec::new()),
                lifecycle: Cell::new(Lifecycle::Constructed),
            }),
        };
        panel.init();
        panel.listen();
        panel
    }

    fn init(&self) {
        for key in self.keys() {
            let mut key_path = self.inner.prefix.clone();
            key_path.push(key);
            let slot = self.attach_layer(key_path);
            self.inner.layers.borrow_mut().push(Some(slot));
        }
    }

    fn listen(&self) {
        let weak = Rc::downgrade(&self.inner);
        let subscription = self.inner.store.subscribe(move |event: &StoreEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let panel = ZinePanel { inner };
            match event.kind {
                StoreEventKind::Add => panel.on_store_add(event),
                StoreEventKind::Remove => panel.on_store_remove(event),
                StoreEventKind::Update => {}
            }
        });
        self.inner.subscriptions.borrow_mut().push(subscription);
        self.inner.lifecycle.set(Lifecycle::Listening);
    }

    /// Creates the layer object and forwards its updates as `LayerUpdate`.
    fn attach_layer(&self, key_path: Vec<String>) -> LayerSlot {
        let layer = ZineLayer::new(self.inner.store.clone(), key_path.clone());
        let panel = Rc::downgrade(&self.inner);
        let weak_layer = layer.downgrade();
        let update_subscription = layer.subscribe(move |_event: &LayerEvent| {
            let (Some(panel), Some(layer)) = (panel.upgrade(), weak_layer.upgrade()) else {
                return;
            };
            panel.bus.emit(&PanelEvent::LayerUpdate {
                key_path: key_path.clone(),
                layer,
            });
        });
        LayerSlot {
            layer,
            update_subscription,
        }
    }

    fn on_store_add(&self, event: &StoreEvent) {
        if !event.is_child_of(&self.inner.prefix) {
            return;
        }
        let slot = self.attach_layer(event.key_path.clone());
        let layer = slot.layer.clone();
        self.inner.layers.borrow_mut().push(Some(slot));

        debug!(panel = %self.id(), layer = %layer.id(), "layer added");
        self.inner.bus.emit(&PanelEvent::LayerAdd {
            key_path: event.key_path.clone(),
            layer,
        });
    }

    fn on_store_remove(&self, event: &StoreEvent) {
        if !event.is_child_of(&self.inner.prefix) {
            return;
        }
        let Some(id) = event.key() else {
            return;
        };

        let removed = {
            let mut layers = self.inner.layers.borrow_mut();
            let index = layers
                .iter()
                .position(|slot| slot.as_ref().is_some_and(|s| s.layer.id() == id));
            match index {
                Some(index) => {
                    // release subscriptions before the slot leaves the list
                    if let Some(slot) = layers[index].as_ref() {
                        slot.teardown();
                    }
                    let slot = layers[index].take();
                    shave_tail(&mut layers);
                    trace!(panel = %self.id(), index, slots = layers.len(), "layer slot emptied");
                    slot
                }
                None => None,
            }
        };

        match removed {
            Some(slot) => {
                debug!(panel = %self.id(), layer = %id, "layer removed");
                self.inner.bus.emit(&PanelEvent::LayerRemove {
                    key_path: event.key_path.clone(),
                    layer: slot.layer,
                });
            }
            None => warn!(panel = %self.id(), layer = %id, "remove event for unknown layer"),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The panel key (last prefix segment).
    pub fn id(&self) -> &str {
        self.inner
            .prefix
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn prefix(&self) -> &[String] {
        &self.inner.prefix
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    /// True if both handles refer to the same live panel.
    pub fn ptr_eq(&self, other: &ZinePanel) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Layer keys in document order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.keys(&self.inner.prefix)
    }

    /// Layer slots, including interior holes left by removals.
    pub fn layers(&self) -> Vec<Option<ZineLayer>> {
        self.inner
            .layers
            .borrow()
            .iter()
            .map(|slot| slot.as_ref().map(|s| s.layer.clone()))
            .collect()
    }

    /// Layer at slot `index`; `None` for a hole or out of range.
    pub fn layer(&self, index: usize) -> Option<ZineLayer> {
        self.inner
            .layers
            .borrow()
            .get(index)
            .and_then(|slot| slot.as_ref().map(|s| s.layer.clone()))
    }

    /// Live layers only, in slot order.
    pub fn live_layers(&self) -> Vec<ZineLayer> {
        self.layers().into_iter().flatten().collect()
    }

    pub fn layer_by_id(&self, id: &str) -> Option<ZineLayer> {
        self.live_layers().into_iter().find(|l| l.id() == id)
    }

    /// Number of live layers (holes excluded).
    pub fn layer_count(&self) -> usize {
        self.inner.layers.borrow().iter().flatten().count()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Creates an empty layer entry under a fresh id and returns its live
    /// layer object.
    pub fn add_layer(&self) -> ZineResult<ZineLayer> {
        if self.lifecycle().is_destroyed() {
            return Err(ZineError::destroyed(format!("panel {}", self.id())));
        }
        let id = self.inner.ids.make_id();
        let mut key_path = self.inner.prefix.clone();
        key_path.push(id.clone());
        self.inner.store.set(&key_path, Value::empty_document())?;

        self.layer_by_id(&id)
            .ok_or_else(|| ZineError::layer_not_found(id))
    }

    /// Deletes `layer`'s entry from the store.
    pub fn remove_layer(&self, layer: &ZineLayer) -> ZineResult<()> {
        let index = self
            .inner
            .layers
            .borrow()
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|s| s.layer.ptr_eq(layer)));
        match index {
            Some(index) => self.remove_layer_index(index),
            None => Err(ZineError::layer_not_found(layer.id())),
        }
    }

    /// Deletes the layer in slot `index`. Holes and out-of-range indices fail.
    pub fn remove_layer_index(&self, index: usize) -> ZineResult<()> {
        let layer = self
            .layer(index)
            .ok_or_else(|| ZineError::layer_not_found(format!("index {}", index)))?;
        self.inner.store.delete(layer.prefix())?;
        Ok(())
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Registers a listener for every panel event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PanelEvent) + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    pub fn on_layer_add<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[String], &ZineLayer) + 'static,
    {
        self.subscribe(move |event| {
            if let PanelEvent::LayerAdd { key_path, layer } = event {
                callback(key_path, layer);
            }
        })
    }

    pub fn on_layer_remove<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[String], &ZineLayer) + 'static,
    {
        self.subscribe(move |event| {
            if let PanelEvent::LayerRemove { key_path, layer } = event {
                callback(key_path, layer);
            }
        })
    }

    pub fn on_layer_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[String], &ZineLayer) + 'static,
    {
        self.subscribe(move |event| {
            if let PanelEvent::LayerUpdate { key_path, layer } = event {
                callback(key_path, layer);
            }
        })
    }

    /// Releases the store subscription and tears down every layer. Idempotent.
    pub fn destroy(&self) {
        if self.inner.lifecycle.replace(Lifecycle::Destroyed).is_destroyed() {
            return;
        }
        for subscription in self.inner.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
        let slots: Vec<_> = self.inner.layers.borrow_mut().drain(..).collect();
        for slot in slots.iter().flatten() {
            slot.teardown();
        }
        debug!(panel = %self.id(), "panel destroyed");
    }
}

impl fmt::Debug for ZinePanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZinePanel")
            .field("prefix", &self.inner.prefix)
            .field("slots", &self.inner.layers.borrow().len())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIdGenerator;

    fn panel_with_layers(n: usize) -> (ZineData, ZinePanel) {
        let store = ZineData::new();
        store.set(&["p"], Value::empty_document()).unwrap();
        let panel = ZinePanel::new(
            store.clone(),
            vec!["p".into()],
            Rc::new(SequentialIdGenerator::new("L")),
        );
        for _ in 0..n {
            panel.add_layer().unwrap();
        }
        (store, panel)
    }

    fn slot_ids(panel: &ZinePanel) -> Vec<Option<String>> {
        panel
            .layers()
            .iter()
            .map(|slot| slot.as_ref().map(|l| l.id().to_string()))
            .collect()
    }

    #[test]
    fn test_materializes_existing_layers() {
        let store = ZineData::new();
        store.set(&["p", "a", "name"], "one").unwrap();
        store.set(&["p", "b"], Value::empty_document()).unwrap();

        let panel = ZinePanel::new(store, vec!["p".into()], Rc::new(SequentialIdGenerator::default()));
        assert_eq!(panel.lifecycle(), Lifecycle::Listening);
        assert_eq!(
            slot_ids(&panel),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn test_add_layer_returns_live_layer() {
        let (store, panel) = panel_with_layers(0);
        let layer = panel.add_layer().unwrap();
        assert_eq!(layer.id(), "L0");
        assert_eq!(layer.prefix(), ["p".to_string(), "L0".to_string()]);
        assert_eq!(store.keys(&["p"]), vec!["L0"]);
        assert!(panel.layer(0).unwrap().ptr_eq(&layer));
    }

    #[test]
    fn test_remove_tail_layer_shrinks_list() {
        let (_store, panel) = panel_with_layers(3);
        panel.remove_layer_index(2).unwrap();
        assert_eq!(
            slot_ids(&panel),
            vec![Some("L0".to_string()), Some("L1".to_string())]
        );
    }

    #[test]
    fn test_remove_head_layer_leaves_hole() {
        let (store, panel) = panel_with_layers(3);
        let first = panel.layer(0).unwrap();
        panel.remove_layer_index(0).unwrap();

        assert_eq!(
            slot_ids(&panel),
            vec![None, Some("L1".to_string()), Some("L2".to_string())]
        );
        assert_eq!(panel.layer_count(), 2);
        assert_eq!(first.lifecycle(), Lifecycle::Destroyed);
        // sibling keys in the document are untouched
        assert_eq!(store.keys(&["p"]), vec!["L1", "L2"]);
    }

    #[test]
    fn test_hole_compacts_once_it_reaches_tail() {
        let (_store, panel) = panel_with_layers(3);
        panel.remove_layer_index(1).unwrap();
        assert_eq!(slot_ids(&panel).len(), 3);

        panel.remove_layer_index(2).unwrap();
        assert_eq!(slot_ids(&panel), vec![Some("L0".to_string())]);
    }

    #[test]
    fn test_remove_hole_or_out_of_range_fails() {
        let (_store, panel) = panel_with_layers(2);
        panel.remove_layer_index(0).unwrap();
        assert!(matches!(panel.remove_layer_index(0), Err(ZineError::LayerNotFound(_))));
        assert!(matches!(panel.remove_layer_index(9), Err(ZineError::LayerNotFound(_))));
    }

    #[test]
    fn test_layer_update_is_forwarded() {
        let (_store, panel) = panel_with_layers(1);
        let updates = Rc::new(RefCell::new(Vec::new()));
        let sink = updates.clone();
        let _sub = panel.on_layer_update(move |key_path, layer| {
            sink.borrow_mut().push((key_path.to_vec(), layer.id().to_string()));
        });

        panel.layer(0).unwrap().set_data("name", "sky").unwrap();
        assert_eq!(
            *updates.borrow(),
            vec![(vec!["p".to_string(), "L0".to_string()], "L0".to_string())]
        );
    }

    #[test]
    fn test_events_for_other_panels_are_ignored() {
        let (store, panel) = panel_with_layers(1);
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let _sub = panel.subscribe(move |_| counter.set(counter.get() + 1));

        store.set(&["q", "x"], Value::empty_document()).unwrap();
        store.set(&["p", "L0", "deep"], 1i64).unwrap();
        store.delete(&["q", "x"]).unwrap();

        assert_eq!(hits.get(), 0);
        assert_eq!(panel.layer_count(), 1);
    }

    #[test]
    fn test_destroy_releases_subscriptions() {
        let (store, panel) = panel_with_layers(2);
        let layer = panel.layer(0).unwrap();
        let before = store.listener_count();

        panel.destroy();
        panel.destroy();

        assert_eq!(store.listener_count(), before - 1);
        assert_eq!(panel.lifecycle(), Lifecycle::Destroyed);
        assert_eq!(layer.lifecycle(), Lifecycle::Destroyed);
        assert!(panel.layers().is_empty());

        // no longer tracks the store
        store.set(&["p", "new"], Value::empty_document()).unwrap();
        assert!(panel.layers().is_empty());
        assert!(matches!(panel.add_layer(), Err(ZineError::Destroyed(_))));
    }
}
