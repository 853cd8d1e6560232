//! Sync error types.

use std::fmt;

use crate::codec::DecodeError;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Pipeline stage a sync failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Check,
    Fetch,
    Decode,
    Persist,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStage::Check => write!(f, "check"),
            SyncStage::Fetch => write!(f, "fetch"),
            SyncStage::Decode => write!(f, "decode"),
            SyncStage::Persist => write!(f, "persist"),
        }
    }
}

/// Sync error, tagged with the failing stage. The inner error is passed through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("cache check failed: {0}")]
    Check(#[source] StorageError),
    #[error("fetch failed: {0}")]
    Fetch(#[source] RemoteError),
    #[error("decode failed: {0}")]
    Decode(#[source] DecodeError),
    #[error("persist failed: {0}")]
    Persist(#[source] StorageError),
}

/// Flat error taxonomy for mapping failures to user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No HTTP response was obtained.
    Transport,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The payload could not be decoded; carries the field path when known.
    Decode(Option<String>),
    /// The batch could not be written.
    Persistence,
    /// The store could not be queried.
    Storage,
}

impl SyncError {
    pub fn stage(&self) -> SyncStage {
        match self {
            SyncError::Check(_) => SyncStage::Check,
            SyncError::Fetch(_) => SyncStage::Fetch,
            SyncError::Decode(_) => SyncStage::Decode,
            SyncError::Persist(_) => SyncStage::Persist,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Fetch(RemoteError::Transport(_)) => ErrorKind::Transport,
            SyncError::Fetch(RemoteError::Status(code)) => ErrorKind::Status(*code),
            SyncError::Fetch(RemoteError::Decode(e)) | SyncError::Decode(e) => {
                ErrorKind::Decode(e.field_path().map(str::to_string))
            }
            SyncError::Persist(StorageError::Persistence(_)) => ErrorKind::Persistence,
            SyncError::Check(_) | SyncError::Persist(_) => ErrorKind::Storage,
        }
    }
}
