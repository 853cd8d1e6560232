//! Loading state published by the coordinator.

/// SyncState tracks the most recent sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No sync has been attempted yet.
    #[default]
    Initial,
    /// A sync is in progress.
    Loading,
    /// The last sync succeeded; the cache is populated.
    Loaded,
    /// The last sync failed with the given message.
    Failed(String),
}

impl SyncState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncState::Loading)
    }
}
