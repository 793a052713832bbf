//! Store change events and the depth rule that classifies them.

/// Paths at or above this depth name a panel (1) or a layer (2).
pub const STRUCTURAL_DEPTH: usize = 2;

/// Returns true if a mutation at `path` is structural (creates or destroys a
/// panel or layer) rather than a value update. Depth alone decides.
pub fn is_structural<K>(path: &[K]) -> bool {
    path.len() <= STRUCTURAL_DEPTH
}

/// Kind of change reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEventKind {
    Add,
    Remove,
    Update,
}

/// A change at `key_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub kind: StoreEventKind,
    pub key_path: Vec<String>,
}

impl StoreEvent {
    pub fn new(kind: StoreEventKind, key_path: Vec<String>) -> Self {
        Self { kind, key_path }
    }

    pub fn add(key_path: Vec<String>) -> Self {
        Self::new(StoreEventKind::Add, key_path)
    }

    pub fn remove(key_path: Vec<String>) -> Self {
        Self::new(StoreEventKind::Remove, key_path)
    }

    pub fn update(key_path: Vec<String>) -> Self {
        Self::new(StoreEventKind::Update, key_path)
    }

    /// Last path segment.
    pub fn key(&self) -> Option<&str> {
        self.key_path.last().map(String::as_str)
    }

    /// The path minus its last segment.
    pub fn parent(&self) -> &[String] {
        match self.key_path.split_last() {
            Some((_, parent)) => parent,
            None => &[],
        }
    }

    /// True if the event concerns a direct child of `prefix`: the path minus
    /// its last segment equals `prefix` exactly.
    pub fn is_child_of(&self, prefix: &[String]) -> bool {
        !self.key_path.is_empty() && self.parent() == prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_structural_depth() {
        assert!(is_structural(&["p"]));
        assert!(is_structural(&["p", "l"]));
        assert!(!is_structural(&["p", "l", "field"]));
    }

    #[test]
    fn test_is_child_of() {
        let event = StoreEvent::add(path(&["panel-a", "layer-1"]));
        assert!(event.is_child_of(&path(&["panel-a"])));
        assert!(!event.is_child_of(&path(&["panel-b"])));
        assert!(!event.is_child_of(&[]));
        assert_eq!(event.key(), Some("layer-1"));

        let top = StoreEvent::remove(path(&["panel-a"]));
        assert!(top.is_child_of(&[]));

        let deep = StoreEvent::update(path(&["panel-a", "layer-1", "depth"]));
        assert!(!deep.is_child_of(&path(&["panel-a"])));
    }
}
