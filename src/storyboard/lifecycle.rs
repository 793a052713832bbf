//! Projection object lifecycle.

/// `Constructed -> Listening -> Destroyed`. Destroyed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Children are being materialized; no events processed yet.
    Constructed,
    /// Subscribed and reacting to store events.
    Listening,
    /// Subscriptions released.
    Destroyed,
}

impl Lifecycle {
    pub fn is_destroyed(self) -> bool {
        self == Lifecycle::Destroyed
    }
}
