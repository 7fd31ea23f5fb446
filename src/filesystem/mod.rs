//! In-memory folder and file tree with cascading metadata.
//!
//! Nodes live in an arena owned by [`FileSystem`]; every entry except the
//! root holds a handle to its parent folder. Sizes are derived on demand and
//! timestamps are propagated to every ancestor after a mutation.

mod entry;
mod error;
mod path;
mod tree;

pub use entry::{EntryId, EntryKind, EntryName, FileId, FolderId, Node, PATH_SEPARATOR};
pub use error::{NameError, TreeError};
pub use tree::{DEFAULT_ROOT_NAME, FileSystem};
