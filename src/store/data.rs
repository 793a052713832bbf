//! `ZineData`: the ordered key-path store.
//!
//! Holds the single mutable document and reports every mutation on its
//! event bus:
//! - `set` on a path that did not exist, at depth <= 2, emits `Add`
//! - `delete` at depth <= 2 emits `Remove`
//! - everything else emits `Update`
//!
//! `ZineData` is a cheap handle; clones share the same document and bus.
//! No borrow of the document is held while events are dispatched, so
//! listeners may read or mutate the store re-entrantly.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::codec;
use crate::document::{Document, Value};
use crate::error::{ZineError, ZineResult};
use crate::store::bus::{EventBus, Subscription};
use crate::store::event::{is_structural, StoreEvent, StoreEventKind};

struct DataInner {
    doc: RefCell<Document>,
    bus: EventBus<StoreEvent>,
}

/// Shared handle to one zine document and its change bus.
#[derive(Clone)]
pub struct ZineData {
    inner: Rc<DataInner>,
}

fn to_key_path<K: AsRef<str>>(path: &[K]) -> Vec<String> {
    path.iter().map(|k| k.as_ref().to_string()).collect()
}

impl ZineData {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty store.
    pub fn new() -> Self {
        Self::from_document(Document::new())
    }

    /// Creates a store over an existing document. No events are emitted.
    pub fn from_document(doc: Document) -> Self {
        Self {
            inner: Rc::new(DataInner {
                doc: RefCell::new(doc),
                bus: EventBus::new(),
            }),
        }
    }

    /// Decodes a blob into a fresh store. No events are emitted.
    pub fn from_bytes(bytes: &[u8]) -> ZineResult<Self> {
        Ok(Self::from_document(codec::decode(bytes)?))
    }

    /// Encodes the current document. Does not mutate the store.
    pub fn export(&self) -> ZineResult<Vec<u8>> {
        codec::encode(&self.inner.doc.borrow())
    }

    /// Clone of the current document.
    pub fn snapshot(&self) -> Document {
        self.inner.doc.borrow().clone()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.inner.doc.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.doc.borrow().is_empty()
    }

    /// True if both handles refer to the same store.
    pub fn ptr_eq(&self, other: &ZineData) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Registers a listener for every store event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + 'static,
    {
        self.inner.bus.subscribe(callback)
    }

    /// Number of listeners currently attached to the store.
    pub fn listener_count(&self) -> usize {
        self.inner.bus.listener_count()
    }

    fn emit(&self, event: StoreEvent) {
        trace!(kind = ?event.kind, key_path = ?event.key_path, "store event");
        self.inner.bus.emit(&event);
    }

    // =========================================================================
    // READS (total)
    // =========================================================================

    /// Value at `path`; the empty path yields the whole document.
    pub fn get<K: AsRef<str>>(&self, path: &[K]) -> Option<Value> {
        let doc = self.inner.doc.borrow();
        if path.is_empty() {
            return Some(Value::Document(doc.clone()));
        }
        doc.lookup(path).cloned()
    }

    pub fn has<K: AsRef<str>>(&self, path: &[K]) -> bool {
        let doc = self.inner.doc.borrow();
        path.is_empty() || doc.lookup(path).is_some()
    }

    /// Ordered keys of the document at `path`; empty if `path` resolves to
    /// nothing or to a terminal.
    pub fn keys<K: AsRef<str>>(&self, path: &[K]) -> Vec<String> {
        self.inner
            .doc
            .borrow()
            .document_at(path)
            .map(Document::keys)
            .unwrap_or_default()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Sets the value at `path`, creating intermediate documents as needed.
    pub fn set<K: AsRef<str>>(&self, path: &[K], value: impl Into<Value>) -> ZineResult<()> {
        let key_path = to_key_path(path);
        let existed = {
            let mut doc = self.inner.doc.borrow_mut();
            let existed = doc.lookup(path).is_some();
            doc.set_path(path, value.into())?;
            existed
        };

        let kind = if !existed && is_structural(&key_path) {
            StoreEventKind::Add
        } else {
            StoreEventKind::Update
        };
        self.emit(StoreEvent::new(kind, key_path));
        Ok(())
    }

    /// Removes the entry at `path` and returns its value. Fails with
    /// `KeyNotFound` if the parent path or the terminal key is missing.
    pub fn delete<K: AsRef<str>>(&self, path: &[K]) -> ZineResult<Value> {
        let key_path = to_key_path(path);
        let removed = self.inner.doc.borrow_mut().delete_path(path)?;

        let kind = if is_structural(&key_path) {
            StoreEventKind::Remove
        } else {
            StoreEventKind::Update
        };
        self.emit(StoreEvent::new(kind, key_path));
        Ok(removed)
    }

    /// Emits one `Remove` per top-level entry, in order, then empties the
    /// document.
    pub fn clear(&self) {
        let keys = self.inner.doc.borrow().keys();
        debug!(entries = keys.len(), "clearing zine");
        for key in keys {
            self.emit(StoreEvent::remove(vec![key]));
        }
        self.inner.doc.borrow_mut().clear();
    }

    /// Decodes `bytes` into this store, which must be empty, then emits one
    /// `Add` per top-level entry in order.
    pub fn load(&self, bytes: &[u8]) -> ZineResult<()> {
        let entries = self.len();
        if entries != 0 {
            return Err(ZineError::NotEmpty { entries });
        }

        let decoded = codec::decode(bytes)?;
        let keys = decoded.keys();
        *self.inner.doc.borrow_mut() = decoded;
        debug!(entries = keys.len(), "loaded zine");

        for key in keys {
            self.emit(StoreEvent::add(vec![key]));
        }
        Ok(())
    }
}

impl Default for ZineData {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ZineData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZineData")
            .field("entries", &self.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
