//! `ZineStoryboard`: the root projection over a zine store.
//!
//! One `ZinePanel` per top-level entry, kept in document order. The
//! storyboard owns the store; panels and layers only observe it.
//!
//! Loading and exporting run the configured `Compressor` on a disposable
//! copy, never on the live instance:
//! - `export`: clone, compress the clone, encode it
//! - `load`: decode into a staging storyboard, decompress it, re-encode,
//!   then load the plain blob here

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::compress::{Compressor, FieldCompressor};
use crate::document::Value;
use crate::error::{ZineError, ZineResult};
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::store::{EventBus, StoreEvent, StoreEventKind, Subscription, ZineData};
use crate::storyboard::lifecycle::Lifecycle;
use crate::storyboard::panel::ZinePanel;

/// Event emitted by a storyboard.
#[derive(Debug, Clone)]
pub enum StoryboardEvent {
    PanelAdd { key_path: Vec<String>, panel: ZinePanel },
    PanelRemove { key_path: Vec<String>, panel: ZinePanel },
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Pluggable collaborators of a storyboard.
#[derive(Clone)]
pub struct StoryboardOptions {
    pub compressor: Rc<dyn Compressor>,
    pub ids: Rc<dyn IdGenerator>,
}

impl Default for StoryboardOptions {
    fn default() -> Self {
        Self {
            compressor: Rc::new(FieldCompressor::default()),
            ids: Rc::new(UuidIdGenerator),
        }
    }
}

impl StoryboardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set the compressor used by `load` and `export`.
    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Rc::new(compressor);
        self
    }

    /// Builder: Set the id generator for new panels and layers.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Rc::new(ids);
        self
    }
}

impl fmt::Debug for StoryboardOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryboardOptions").finish_non_exhaustive()
    }
}

// =============================================================================
// STORYBOARD
// =============================================================================

struct BoardInner {
    store: ZineData,
    options: StoryboardOptions,
    panels: RefCell<Vec<ZinePanel>>,
    bus: EventBus<StoryboardEvent>,
    subscriptions: RefCell<Vec<Subscription>>,
    lifecycle: Cell<Lifecycle>,
}

/// Root of the live panel/layer hierarchy.
pub struct ZineStoryboard {
    inner: Rc<BoardInner>,
}

impl Default for ZineStoryboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ZineStoryboard {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty storyboard with default options.
    pub fn new() -> Self {
        Self::with_options(StoryboardOptions::default())
    }

    pub fn with_options(options: StoryboardOptions) -> Self {
        Self::from_store(ZineData::new(), options)
    }

    /// Wraps an existing store, materializing a panel per entry.
    pub fn from_store(store: ZineData, options: StoryboardOptions) -> Self {
        let board = Self {
            inner: Rc::new(BoardInner {
                store,
                options,
                panels: RefCell::new(Vec::new()),
                bus: EventBus::new(),
                subscriptions: RefCell::new(Vec::new()),
                lifecycle: Cell::new(Lifecycle::Constructed),
            }),
        };
        board.init();
        board.listen();
        board
    }

    fn init(&self) {
        for key in self.keys() {
            let panel = self.make_panel(vec![key]);
            self.inner.panels.borrow_mut().push(panel);
        }
    }

    fn listen(&self) {
        let weak = Rc::downgrade(&self.inner);
        let subscription = self.inner.store.subscribe(move |event: &StoreEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let board = ZineStoryboard { inner };
            match event.kind {
                StoreEventKind::Add => board.on_store_add(event),
                StoreEventKind::Remove => board.on_store_remove(event),
                StoreEventKind::Update => {}
            }
        });
        self.inner.subscriptions.borrow_mut().push(subscription);
        self.inner.lifecycle.set(Lifecycle::Listening);
    }

    fn make_panel(&self, key_path: Vec<String>) -> ZinePanel {
        ZinePanel::new(
            self.inner.store.clone(),
            key_path,
            self.inner.options.ids.clone(),
        )
    }

    fn on_store_add(&self, event: &StoreEvent) {
        if !event.is_child_of(&[]) {
            return;
        }
        let panel = self.make_panel(event.key_path.clone());
        self.inner.panels.borrow_mut().push(panel.clone());

        debug!(panel = %panel.id(), "panel added");
        self.inner.bus.emit(&StoryboardEvent::PanelAdd {
            key_path: event.key_path.clone(),
            panel,
        });
    }

    fn on_store_remove(&self, event: &StoreEvent) {
        if !event.is_child_of(&[]) {
            return;
        }
        let Some(id) = event.key() else {
            return;
        };

        let removed = {
            let mut panels = self.inner.panels.borrow_mut();
            panels.iter().position(|p| p.id() == id).map(|index| {
                // release subscriptions before the panel leaves the list
                panels[index].destroy();
                panels.remove(index)
            })
        };

        match removed {
            Some(panel) => {
                debug!(panel = %id, "panel removed");
                self.inner.bus.emit(&StoryboardEvent::PanelRemove {
                    key_path: event.key_path.clone(),
                    panel,
                });
            }
            None => warn!(panel = %id, "remove event for unknown panel"),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The backing store.
    pub fn store(&self) -> &ZineData {
        &self.inner.store
    }

    pub fn options(&self) -> &StoryboardOptions {
        &self.inner.options
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    /// Panel keys in document order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.keys::<&str>(&[])
    }

    /// Number of live panels.
    pub fn len(&self) -> usize {
        self.inner.panels.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn panels(&self) -> Vec<ZinePanel> {
        self.inner.panels.borrow().clone()
    }

    pub fn panel(&self, index: usize) -> Option<ZinePanel> {
        self.inner.panels.borrow().get(index).cloned()
    }

    pub fn panel_by_id(&self, id: &str) -> Option<ZinePanel> {
        self.inner
            .panels
            .borrow()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Creates an empty panel entry under a fresh id and returns its live
    /// panel object.
    pub fn add_panel(&self) -> ZineResult<ZinePanel> {
        self.ensure_live()?;
        let id = self.inner.options.ids.make_id();
        self.inner.store.set(&[id.as_str()], Value::empty_document())?;

        self.panel_by_id(&id)
            .ok_or_else(|| ZineError::panel_not_found(id))
    }

    /// Deletes `panel`'s entry. Fails if it is not one of the live panels.
    pub fn remove_panel(&self, panel: &ZinePanel) -> ZineResult<()> {
        let live = self.inner.panels.borrow().iter().any(|p| p.ptr_eq(panel));
        if !live {
            return Err(ZineError::panel_not_found(panel.id()));
        }
        self.inner.store.delete(panel.prefix())?;
        Ok(())
    }

    pub fn remove_panel_index(&self, index: usize) -> ZineResult<()> {
        let panel = self
            .panel(index)
            .ok_or_else(|| ZineError::panel_not_found(format!("index {}", index)))?;
        self.inner.store.delete(panel.prefix())?;
        Ok(())
    }

    /// Removes every panel, one `PanelRemove` each.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    // =========================================================================
    // SERIALIZATION
    // =========================================================================

    /// Encodes the live document as is.
    pub fn export_uncompressed(&self) -> ZineResult<Vec<u8>> {
        self.inner.store.export()
    }

    /// Loads a blob without running the compressor.
    pub fn load_uncompressed(&self, bytes: &[u8]) -> ZineResult<()> {
        self.ensure_live()?;
        self.inner.store.load(bytes)
    }

    /// Independent copy with its own store and projections.
    pub fn clone_storyboard(&self) -> ZineResult<ZineStoryboard> {
        let copy = ZineStoryboard::with_options(self.inner.options.clone());
        copy.load_uncompressed(&self.export_uncompressed()?)?;
        Ok(copy)
    }

    /// Encodes a compressed copy. The live storyboard is not touched.
    pub async fn export(&self) -> ZineResult<Vec<u8>> {
        let copy = self.clone_storyboard()?;
        let compressed = self.inner.options.compressor.compress(&copy).await;
        let result = compressed.and_then(|()| copy.export_uncompressed());
        copy.destroy();

        let bytes = result?;
        info!(panels = self.len(), bytes = bytes.len(), "zine exported");
        Ok(bytes)
    }

    /// Loads a compressed blob into this (empty) storyboard.
    pub async fn load(&self, bytes: &[u8]) -> ZineResult<()> {
        self.ensure_live()?;
        let entries = self.inner.store.len();
        if entries != 0 {
            return Err(ZineError::NotEmpty { entries });
        }

        let staging = ZineStoryboard::with_options(self.inner.options.clone());
        let staged = match staging.load_uncompressed(bytes) {
            Ok(()) => self.inner.options.compressor.decompress(&staging).await,
            Err(err) => Err(err),
        };
        let plain = staged.and_then(|()| staging.export_uncompressed());
        staging.destroy();

        self.load_uncompressed(&plain?)?;
        info!(panels = self.len(), "zine loaded");
        Ok(())
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Registers a listener for every storyboard event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoryboardEvent) + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    pub fn on_panel_add<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[String], &ZinePanel) + 'static,
    {
        self.subscribe(move |event| {
            if let StoryboardEvent::PanelAdd { key_path, panel } = event {
                callback(key_path, panel);
            }
        })
    }

    pub fn on_panel_remove<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[String], &ZinePanel) + 'static,
    {
        self.subscribe(move |event| {
            if let StoryboardEvent::PanelRemove { key_path, panel } = event {
                callback(key_path, panel);
            }
        })
    }

    /// Releases the store subscription and destroys every panel. Idempotent.
    pub fn destroy(&self) {
        if self.inner.lifecycle.replace(Lifecycle::Destroyed).is_destroyed() {
            return;
        }
        for subscription in self.inner.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
        let panels: Vec<_> = self.inner.panels.borrow_mut().drain(..).collect();
        for panel in &panels {
            panel.destroy();
        }
        debug!(panels = panels.len(), "storyboard destroyed");
    }

    fn ensure_live(&self) -> ZineResult<()> {
        if self.lifecycle().is_destroyed() {
            return Err(ZineError::destroyed("storyboard"));
        }
        Ok(())
    }
}

impl fmt::Debug for ZineStoryboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZineStoryboard")
            .field("panels", &self.keys())
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
