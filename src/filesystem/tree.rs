use std::time::SystemTime;

use snafu::prelude::*;
use tracing::{debug, trace, warn};

use crate::filesystem::entry::{
    EntryId, EntryKind, EntryName, FileId, FolderId, Node, NodeData, PATH_SEPARATOR,
};
use crate::filesystem::error::{InvalidNameSnafu, KindMismatchSnafu, PathNotFoundSnafu, TreeError};
use crate::filesystem::path;
use crate::persistence::{Change, Detached, Persistence, PersistenceFailure};

pub const DEFAULT_ROOT_NAME: &str = "root";

/// In-memory folder/file tree that keeps sizes and timestamps consistent
/// along the ancestor chain and reports every change to a [`Persistence`]
/// adapter.
///
/// Handles ([`EntryId`], [`FileId`], [`FolderId`]) are only valid for the
/// tree that returned them. Passing a handle from another tree panics.
#[derive(Debug)]
pub struct FileSystem<P: Persistence = Detached> {
    nodes: Vec<Node>,
    persistence: P,
    failures: Vec<PersistenceFailure>,
}

impl FileSystem<Detached> {
    pub fn new() -> Self {
        Self::with_persistence(Detached)
    }
}

impl Default for FileSystem<Detached> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Persistence> FileSystem<P> {
    /// Creates a tree rooted at a folder named [`DEFAULT_ROOT_NAME`] and opens
    /// the adapter.
    pub fn with_persistence(persistence: P) -> Self {
        Self::build(EntryName::unchecked(DEFAULT_ROOT_NAME), persistence)
    }

    pub fn with_root_name(root_name: &str, persistence: P) -> Result<Self, TreeError> {
        let root = EntryName::new(root_name).context(InvalidNameSnafu)?;
        Ok(Self::build(root, persistence))
    }

    fn build(root: EntryName, persistence: P) -> Self {
        let mut tree = FileSystem {
            nodes: vec![Node::folder(root, None)],
            persistence,
            failures: Vec::new(),
        };
        if let Err(source) = tree.persistence.open() {
            warn!("Failed to open persistence, continuing in memory only: {}", source);
            tree.failures.push(PersistenceFailure {
                change: None,
                source,
            });
        }
        tree
    }

    /// Closes the adapter and hands it back together with every failure the
    /// tree recorded over its lifetime.
    pub fn close(mut self) -> (P, Vec<PersistenceFailure>) {
        if let Err(source) = self.persistence.close() {
            warn!("Failed to close persistence: {}", source);
            self.failures.push(PersistenceFailure {
                change: None,
                source,
            });
        }
        (self.persistence, self.failures)
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn persistence_failures(&self) -> &[PersistenceFailure] {
        &self.failures
    }

    pub fn take_persistence_failures(&mut self) -> Vec<PersistenceFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn root(&self) -> FolderId {
        FolderId::new(EntryId::new(0))
    }

    pub fn entry(&self, id: impl Into<EntryId>) -> &Node {
        &self.nodes[id.into().index()]
    }

    pub fn as_file(&self, id: EntryId) -> Option<FileId> {
        self.entry(id).is_file().then(|| FileId::new(id))
    }

    pub fn as_folder(&self, id: EntryId) -> Option<FolderId> {
        self.entry(id).is_folder().then(|| FolderId::new(id))
    }

    /// Direct children of `folder` in insertion order.
    pub fn children(&self, folder: FolderId) -> &[EntryId] {
        self.entry(folder).children()
    }

    pub fn content(&self, file: FileId) -> &str {
        self.entry(file).content().unwrap_or_default()
    }

    pub fn full_path(&self, id: impl Into<EntryId>) -> String {
        path::full_path(&self.nodes, id.into())
    }

    /// Byte length of a file, or the recursive sum over a folder's children.
    /// Never cached.
    pub fn size(&self, id: impl Into<EntryId>) -> u64 {
        match &self.entry(id).data {
            NodeData::File { content } => content.len() as u64,
            NodeData::Folder { children } => children.iter().map(|child| self.size(*child)).sum(),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.size(self.root())
    }

    /// Depth-first pre-order walk below `folder`, paired with the depth
    /// relative to it (direct children are depth 0).
    pub fn descendants(&self, folder: FolderId) -> Vec<(usize, EntryId)> {
        let mut walked = Vec::new();
        let mut stack = self
            .children(folder)
            .iter()
            .rev()
            .map(|child| (0, *child))
            .collect::<Vec<_>>();

        while let Some((depth, id)) = stack.pop() {
            walked.push((depth, id));
            stack.extend(
                self.entry(id)
                    .children()
                    .iter()
                    .rev()
                    .map(|child| (depth + 1, *child)),
            );
        }
        walked
    }

    /// Stamps `id` and every ancestor up to the root with the same time
    /// (`now` when `time` is `None`). Siblings and descendants are untouched.
    pub fn update_last_modified(&mut self, id: impl Into<EntryId>, time: Option<SystemTime>) {
        let timestamp = time.unwrap_or_else(SystemTime::now);
        let mut current = Some(id.into());

        while let Some(id) = current {
            let node = &mut self.nodes[id.index()];
            node.last_modified = Some(timestamp);
            let kind = node.kind();
            current = node.parent.map(FolderId::id);

            let full_path = self.full_path(id);
            trace!("Updated last modified of {}", full_path);
            self.notify(Change::TimestampUpdated {
                timestamp,
                full_path,
                kind,
            });
        }
    }

    /// Recomputes the size of `folder` and of every ancestor, reporting each.
    pub fn update_folder_size(&mut self, folder: FolderId) {
        let mut current = Some(folder);

        while let Some(folder) = current {
            let size = self.size(folder);
            let full_path = self.full_path(folder);
            trace!("Updated size of {} to {}", full_path, size);
            self.notify(Change::FolderSizeUpdated { size, full_path });
            current = self.entry(folder).parent;
        }
    }

    /// Appends a new empty file to `folder`. Duplicate names are accepted;
    /// lookups return the first one inserted.
    pub fn add_file(&mut self, folder: FolderId, name: &str) -> Result<FileId, TreeError> {
        let name = EntryName::new(name).context(InvalidNameSnafu)?;
        let id = self.attach(folder, Node::file(name, folder));
        let (name, last_modified, full_path) = self.creation_record(id);
        debug!("Created file {}", full_path);
        self.notify(Change::FileCreated {
            name,
            last_modified,
            full_path,
        });
        Ok(FileId::new(id))
    }

    /// Appends a new empty folder to `folder`. Duplicate names are accepted;
    /// lookups return the first one inserted.
    pub fn add_folder(&mut self, folder: FolderId, name: &str) -> Result<FolderId, TreeError> {
        let name = EntryName::new(name).context(InvalidNameSnafu)?;
        let id = self.attach(folder, Node::folder(name, Some(folder)));
        let (name, last_modified, full_path) = self.creation_record(id);
        debug!("Created folder {}", full_path);
        self.notify(Change::FolderCreated {
            name,
            last_modified,
            full_path,
        });
        Ok(FolderId::new(id))
    }

    fn attach(&mut self, folder: FolderId, node: Node) -> EntryId {
        let id = EntryId::new(self.nodes.len());
        self.nodes.push(node);
        if let NodeData::Folder { children } = &mut self.nodes[folder.id().index()].data {
            children.push(id);
        }
        self.update_last_modified(id, None);
        id
    }

    fn creation_record(&self, id: EntryId) -> (String, SystemTime, String) {
        let node = self.entry(id);
        (
            node.name.to_string(),
            node.last_modified.unwrap_or_else(SystemTime::now),
            self.full_path(id),
        )
    }

    /// Replaces the content of `file`, then runs both the timestamp and the
    /// size cascade from its parent up to the root.
    pub fn modify(&mut self, file: FileId, content: impl Into<String>) {
        let now = SystemTime::now();
        let node = &mut self.nodes[file.id().index()];
        if let NodeData::File { content: current } = &mut node.data {
            *current = content.into();
        }
        node.last_modified = Some(now);
        let parent = node.parent;

        let full_path = self.full_path(file);
        let content = self.content(file).to_owned();
        let size = self.size(file);
        debug!("Modified file {} ({} bytes)", full_path, size);
        self.notify(Change::FileModified {
            content,
            size,
            last_modified: now,
            full_path,
        });

        if let Some(parent) = parent {
            self.update_last_modified(parent, Some(now));
            self.update_folder_size(parent);
        }
    }

    /// Renames an entry. Descendant paths follow automatically in memory; the
    /// adapter is told to rewrite its stored paths for the whole subtree.
    ///
    /// The rename notifications go out before the timestamp cascade so that
    /// the cascade already finds the records under their new paths. Adapters
    /// see `file_renamed` (or `folder_renamed` then `subtree_path_rewritten`)
    /// first, followed by one `timestamp_updated` per ancestor, all keyed by
    /// the new path.
    pub fn rename(&mut self, id: impl Into<EntryId>, new_name: &str) -> Result<(), TreeError> {
        let id = id.into();
        let new_name = EntryName::new(new_name).context(InvalidNameSnafu)?;

        let old_path = self.full_path(id);
        self.nodes[id.index()].name = new_name.clone();
        let new_path = self.full_path(id);
        debug!("Renamed {} to {}", old_path, new_path);

        match self.entry(id).kind() {
            EntryKind::File => self.notify(Change::FileRenamed {
                name: new_name.to_string(),
                new_path,
                old_path,
            }),
            EntryKind::Folder => {
                self.notify(Change::FolderRenamed {
                    name: new_name.to_string(),
                    old_path: old_path.clone(),
                });
                self.notify(Change::SubtreePathRewritten {
                    old_prefix: old_path,
                    new_prefix: new_path,
                });
            }
        }

        self.update_last_modified(id, Some(SystemTime::now()));
        Ok(())
    }

    /// Looks up `relative` below `folder`; the last segment may name a file or
    /// a folder.
    pub fn return_object_in(&self, folder: FolderId, relative: &str) -> Result<EntryId, TreeError> {
        path::resolve(&self.nodes, folder, relative, None).context(PathNotFoundSnafu {
            path: relative,
        })
    }

    /// Modifies the file at `relative` below `folder`. The last segment only
    /// matches files, so a same-named folder listed earlier is skipped.
    pub fn modify_file_in(
        &mut self,
        folder: FolderId,
        relative: &str,
        content: impl Into<String>,
    ) -> Result<FileId, TreeError> {
        let file = path::resolve(&self.nodes, folder, relative, Some(EntryKind::File))
            .map(FileId::new)
            .context(PathNotFoundSnafu { path: relative })?;
        self.modify(file, content);
        Ok(file)
    }

    /// Resolves a tree path such as `root/stuff/notes.txt` (a leading `/` is
    /// accepted). The path consisting of the root segment alone is the root.
    /// A first segment other than the current root name is a
    /// [`TreeError::PathNotFoundError`].
    pub fn return_object(&self, path: &str) -> Result<EntryId, TreeError> {
        match self.strip_root(path)? {
            "" => Ok(self.root().id()),
            relative => path::resolve(&self.nodes, self.root(), relative, None)
                .context(PathNotFoundSnafu { path }),
        }
    }

    /// Modifies the file at a tree path. The first segment must be the current
    /// root name, otherwise this is a [`TreeError::PathNotFoundError`].
    pub fn modify_file(&mut self, path: &str, content: impl Into<String>) -> Result<FileId, TreeError> {
        let relative = self.strip_root(path)?;
        let file = path::resolve(&self.nodes, self.root(), relative, Some(EntryKind::File))
            .map(FileId::new)
            .context(PathNotFoundSnafu { path })?;
        self.modify(file, content);
        Ok(file)
    }

    pub fn folder_at(&self, path: &str) -> Result<FolderId, TreeError> {
        let id = self.return_object(path)?;
        self.as_folder(id).context(KindMismatchSnafu {
            path,
            expected: EntryKind::Folder,
            found: EntryKind::File,
        })
    }

    pub fn file_at(&self, path: &str) -> Result<FileId, TreeError> {
        let id = self.return_object(path)?;
        self.as_file(id).context(KindMismatchSnafu {
            path,
            expected: EntryKind::File,
            found: EntryKind::Folder,
        })
    }

    fn strip_root<'a>(&self, path: &'a str) -> Result<&'a str, TreeError> {
        let path_from_root = path.strip_prefix(PATH_SEPARATOR).unwrap_or(path);
        let (head, relative) = path_from_root
            .split_once(PATH_SEPARATOR)
            .unwrap_or((path_from_root, ""));
        ensure!(
            self.entry(self.root()).name() == head,
            PathNotFoundSnafu { path }
        );
        Ok(relative)
    }

    fn notify(&mut self, change: Change) {
        if let Err(source) = self.persistence.apply(&change) {
            warn!(
                "Persistence rejected {} ({}), in-memory tree is ahead of the store",
                change.event(),
                source
            );
            self.failures.push(PersistenceFailure {
                change: Some(change),
                source,
            });
        }
    }
}
