use std::path::Path;
use std::time::SystemTime;

use bincode::{Decode, Encode};
use compio::fs;
use snafu::prelude::*;
use tracing::{debug, trace};

use super::{
    Change, ClosedSnafu, CompressionSnafu, DecodeSnafu, EncodeSnafu, Persistence,
    PersistenceError, ReadSnafu, WriteSnafu,
};
use crate::filesystem::{EntryKind, PATH_SEPARATOR};

const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FolderRecord {
    pub name: String,
    pub last_modified: Option<SystemTime>,
    pub size: u64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FileRecord {
    pub name: String,
    pub last_modified: Option<SystemTime>,
    pub content: String,
    pub size: u64,
    pub path: String,
}

trait Keyed {
    fn path(&self) -> &str;
    fn set_path(&mut self, path: String);
}

impl Keyed for FolderRecord {
    fn path(&self) -> &str {
        &self.path
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
    }
}

impl Keyed for FileRecord {
    fn path(&self) -> &str {
        &self.path
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
struct Tables {
    folders: Vec<FolderRecord>,
    files: Vec<FileRecord>,
}

/// Folder and file tables keyed by stored path.
///
/// Behaves like the SQL tables it stands in for: inserts append, updates hit
/// every record with a matching path, and an update matching nothing is not
/// an error. Duplicate paths are possible because the tree accepts
/// duplicate names.
#[derive(Debug, Clone, Default)]
pub struct MirrorStore {
    tables: Tables,
    closed: bool,
}

impl MirrorStore {
    pub fn folders(&self) -> &[FolderRecord] {
        &self.tables.folders
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.tables.files
    }

    /// First folder record stored at `path`.
    pub fn folder(&self, path: &str) -> Option<&FolderRecord> {
        self.tables.folders.iter().find(|record| record.path == path)
    }

    /// First file record stored at `path`.
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.tables.files.iter().find(|record| record.path == path)
    }

    /// Reads a snapshot previously written with [`MirrorStore::write`].
    pub async fn read(path: &Path) -> Result<Self, PersistenceError> {
        debug!("Reading mirror snapshot from {}", path.display());
        let compressed = fs::read(path).await.context(ReadSnafu { path })?;
        let encoded = zstd::decode_all(compressed.as_slice()).context(CompressionSnafu)?;
        let (tables, _) =
            bincode::decode_from_slice::<Tables, _>(&encoded, bincode::config::standard())
                .context(DecodeSnafu)?;
        debug!(
            "Loaded {} folder and {} file records",
            tables.folders.len(),
            tables.files.len()
        );
        Ok(MirrorStore {
            tables,
            closed: false,
        })
    }

    /// Saves both tables as a zstd-compressed bincode snapshot, creating the
    /// parent directory when needed.
    pub async fn write(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context(WriteSnafu { path })?;
        }

        let encoded = bincode::encode_to_vec(&self.tables, bincode::config::standard())
            .context(EncodeSnafu)?;
        let compressed = zstd::encode_all(encoded.as_slice(), SNAPSHOT_COMPRESSION_LEVEL)
            .context(CompressionSnafu)?;
        fs::write(path, compressed)
            .await
            .0
            .context(WriteSnafu { path })?;
        debug!("Wrote mirror snapshot to {}", path.display());
        Ok(())
    }
}

impl Persistence for MirrorStore {
    fn open(&mut self) -> Result<(), PersistenceError> {
        self.closed = false;
        Ok(())
    }

    fn apply(&mut self, change: &Change) -> Result<(), PersistenceError> {
        ensure!(!self.closed, ClosedSnafu);

        let touched = match change {
            Change::FolderCreated {
                name,
                last_modified,
                full_path,
            } => {
                self.tables.folders.push(FolderRecord {
                    name: name.clone(),
                    last_modified: Some(*last_modified),
                    size: 0,
                    path: full_path.clone(),
                });
                1
            }
            Change::FileCreated {
                name,
                last_modified,
                full_path,
            } => {
                self.tables.files.push(FileRecord {
                    name: name.clone(),
                    last_modified: Some(*last_modified),
                    content: String::new(),
                    size: 0,
                    path: full_path.clone(),
                });
                1
            }
            Change::TimestampUpdated {
                timestamp,
                full_path,
                kind: EntryKind::Folder,
            } => update_where(&mut self.tables.folders, full_path, |record| {
                record.last_modified = Some(*timestamp)
            }),
            Change::TimestampUpdated {
                timestamp,
                full_path,
                kind: EntryKind::File,
            } => update_where(&mut self.tables.files, full_path, |record| {
                record.last_modified = Some(*timestamp)
            }),
            Change::FileRenamed {
                name,
                new_path,
                old_path,
            } => update_where(&mut self.tables.files, old_path, |record| {
                record.name = name.clone();
                record.path = new_path.clone();
            }),
            Change::FolderRenamed { name, old_path } => {
                update_where(&mut self.tables.folders, old_path, |record| {
                    record.name = name.clone()
                })
            }
            Change::SubtreePathRewritten {
                old_prefix,
                new_prefix,
            } => {
                rewrite_prefix(&mut self.tables.folders, old_prefix, new_prefix)
                    + rewrite_prefix(&mut self.tables.files, old_prefix, new_prefix)
            }
            Change::FileModified {
                content,
                size,
                last_modified,
                full_path,
            } => update_where(&mut self.tables.files, full_path, |record| {
                record.content = content.clone();
                record.size = *size;
                record.last_modified = Some(*last_modified);
            }),
            Change::FolderSizeUpdated { size, full_path } => {
                update_where(&mut self.tables.folders, full_path, |record| {
                    record.size = *size
                })
            }
        };

        trace!("Applied {} to {} record(s)", change.event(), touched);
        Ok(())
    }

    fn close(&mut self) -> Result<(), PersistenceError> {
        self.closed = true;
        Ok(())
    }
}

fn update_where<R: Keyed>(records: &mut [R], path: &str, mut update: impl FnMut(&mut R)) -> usize {
    let mut touched = 0;
    for record in records.iter_mut().filter(|record| record.path() == path) {
        update(record);
        touched += 1;
    }
    touched
}

/// Replaces `old` with `new` in every path equal to `old` or below it.
/// `/root/stuff2` is not below `/root/stuff`.
fn rewrite_prefix<R: Keyed>(records: &mut [R], old: &str, new: &str) -> usize {
    let mut touched = 0;
    for record in records.iter_mut() {
        let suffix = match record.path().strip_prefix(old) {
            Some(rest) if rest.is_empty() || rest.starts_with(PATH_SEPARATOR) => rest.to_owned(),
            _ => continue,
        };
        record.set_path(format!("{new}{suffix}"));
        touched += 1;
    }
    touched
}
