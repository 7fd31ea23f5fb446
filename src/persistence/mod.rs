//! Mirroring of tree changes into an external store.
//!
//! The tree owns the authoritative state. Every state-changing operation
//! reports one or more [`Change`]s to a [`Persistence`] adapter, keyed by full
//! path. Adapter failures are recorded by the tree and never undo the
//! in-memory mutation.

mod change_log;
mod mirror;

use std::path::PathBuf;
use std::time::SystemTime;

use snafu::Snafu;

use crate::filesystem::EntryKind;

pub use change_log::ChangeLog;
pub use mirror::{FileRecord, FolderRecord, MirrorStore};

/// Notification sent by the tree after it has already mutated itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    FolderCreated {
        name: String,
        last_modified: SystemTime,
        full_path: String,
    },
    FileCreated {
        name: String,
        last_modified: SystemTime,
        full_path: String,
    },
    TimestampUpdated {
        timestamp: SystemTime,
        full_path: String,
        kind: EntryKind,
    },
    /// Point update of a single file record.
    FileRenamed {
        name: String,
        new_path: String,
        old_path: String,
    },
    /// Point update of the folder's own record, still keyed by the old path.
    FolderRenamed { name: String, old_path: String },
    /// Applies to every folder and file record at `old_prefix` or below it.
    SubtreePathRewritten {
        old_prefix: String,
        new_prefix: String,
    },
    FileModified {
        content: String,
        size: u64,
        last_modified: SystemTime,
        full_path: String,
    },
    FolderSizeUpdated { size: u64, full_path: String },
}

impl Change {
    pub fn event(&self) -> &'static str {
        match self {
            Change::FolderCreated { .. } => "folder_created",
            Change::FileCreated { .. } => "file_created",
            Change::TimestampUpdated { .. } => "timestamp_updated",
            Change::FileRenamed { .. } => "file_renamed",
            Change::FolderRenamed { .. } => "folder_renamed",
            Change::SubtreePathRewritten { .. } => "subtree_path_rewritten",
            Change::FileModified { .. } => "file_modified",
            Change::FolderSizeUpdated { .. } => "folder_size_updated",
        }
    }
}

/// Receiver of tree changes.
///
/// `open` runs when the tree is constructed and `close` when it is closed.
pub trait Persistence {
    fn open(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn apply(&mut self, change: &Change) -> Result<(), PersistenceError>;

    fn close(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

impl<P: Persistence + ?Sized> Persistence for Box<P> {
    fn open(&mut self) -> Result<(), PersistenceError> {
        (**self).open()
    }

    fn apply(&mut self, change: &Change) -> Result<(), PersistenceError> {
        (**self).apply(change)
    }

    fn close(&mut self) -> Result<(), PersistenceError> {
        (**self).close()
    }
}

/// Adapter that drops every change; the tree works purely in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Persistence for Detached {
    fn apply(&mut self, _change: &Change) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// A change the adapter could not apply. The tree kept going without it.
///
/// `change` is `None` when the adapter failed to open or close.
#[derive(Debug)]
pub struct PersistenceFailure {
    pub change: Option<Change>,
    pub source: PersistenceError,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PersistenceError {
    #[snafu(display("The store has already been closed"))]
    ClosedError,
    #[snafu(display("Persistence backend failed: {}", message))]
    BackendError { message: String },
    #[snafu(display("Failed to read the mirror snapshot: {}", path.display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write the mirror snapshot: {}", path.display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to (de)compress the mirror snapshot"))]
    CompressionError { source: std::io::Error },
    #[snafu(display("Failed to encode the mirror snapshot"))]
    EncodeError {
        source: bincode::error::EncodeError,
    },
    #[snafu(display("Failed to decode the mirror snapshot"))]
    DecodeError {
        source: bincode::error::DecodeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_the_notification_table() {
        let now = SystemTime::now();
        let changes = [
            Change::FolderCreated {
                name: "a".into(),
                last_modified: now,
                full_path: "/root/a".into(),
            },
            Change::SubtreePathRewritten {
                old_prefix: "/root/a".into(),
                new_prefix: "/root/b".into(),
            },
            Change::FolderSizeUpdated {
                size: 0,
                full_path: "/root".into(),
            },
        ];
        let events = changes.iter().map(Change::event).collect::<Vec<_>>();
        assert_eq!(
            events,
            ["folder_created", "subtree_path_rewritten", "folder_size_updated"]
        );
    }

    #[test]
    fn boxed_adapters_forward_every_call() {
        let mut boxed: Box<dyn Persistence> = Box::new(ChangeLog::default());
        assert!(boxed.open().is_ok());
        let change = Change::FolderSizeUpdated {
            size: 3,
            full_path: "/root".into(),
        };
        assert!(boxed.apply(&change).is_ok());
        assert!(boxed.close().is_ok());
    }

    #[test]
    fn detached_accepts_everything() {
        let change = Change::FolderRenamed {
            name: "b".into(),
            old_path: "/root/a".into(),
        };
        assert!(Detached.apply(&change).is_ok());
    }
}
