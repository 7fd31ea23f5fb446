use std::time::SystemTime;

use derive_more::{Deref, Display, Into};
use snafu::ensure;

use crate::filesystem::error::{EmptySnafu, NameError, SeparatorSnafu};

pub const PATH_SEPARATOR: char = '/';

/// Handle of a node inside the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("#{_0}")]
pub struct EntryId(usize);

impl EntryId {
    pub(crate) fn new(index: usize) -> Self {
        EntryId(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Handle of an entry known to be a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Into)]
pub struct FileId(EntryId);

impl FileId {
    pub(crate) fn new(id: EntryId) -> Self {
        FileId(id)
    }

    pub fn id(self) -> EntryId {
        self.0
    }
}

/// Handle of an entry known to be a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Into)]
pub struct FolderId(EntryId);

impl FolderId {
    pub(crate) fn new(id: EntryId) -> Self {
        FolderId(id)
    }

    pub fn id(self) -> EntryId {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("folder")]
    Folder,
}

/// A single path segment: never empty, never contains [`PATH_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Deref)]
pub struct EntryName(String);

impl EntryName {
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        ensure!(!name.is_empty(), EmptySnafu);
        ensure!(
            !name.contains(PATH_SEPARATOR),
            SeparatorSnafu { name: name.clone() }
        );
        Ok(EntryName(name))
    }

    /// For names known at compile time to be valid.
    pub(crate) fn unchecked(name: &str) -> Self {
        EntryName(name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for EntryName {
    type Error = NameError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        EntryName::new(name)
    }
}

impl PartialEq<str> for EntryName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntryName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    File { content: String },
    Folder { children: Vec<EntryId> },
}

/// One entry of the tree. Read-only outside of [`crate::filesystem::FileSystem`].
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: EntryName,
    pub(crate) last_modified: Option<SystemTime>,
    pub(crate) parent: Option<FolderId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn file(name: EntryName, parent: FolderId) -> Self {
        Node {
            name,
            last_modified: None,
            parent: Some(parent),
            data: NodeData::File {
                content: String::new(),
            },
        }
    }

    pub(crate) fn folder(name: EntryName, parent: Option<FolderId>) -> Self {
        Node {
            name,
            last_modified: None,
            parent,
            data: NodeData::Folder {
                children: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &EntryName {
        &self.name
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// `None` only for the root folder.
    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    pub fn kind(&self) -> EntryKind {
        match self.data {
            NodeData::File { .. } => EntryKind::File,
            NodeData::Folder { .. } => EntryKind::Folder,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind() == EntryKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == EntryKind::Folder
    }

    /// File content, or `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match &self.data {
            NodeData::File { content } => Some(content),
            NodeData::Folder { .. } => None,
        }
    }

    /// Children in insertion order. Always empty for files.
    pub fn children(&self) -> &[EntryId] {
        match &self.data {
            NodeData::File { .. } => &[],
            NodeData::Folder { children } => children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("notes.txt")]
    #[case("stuff")]
    #[case(".hidden")]
    #[case("with spaces")]
    #[case("тест")]
    fn entry_name_accepts_plain_segments(#[case] name: &str) {
        let result = EntryName::new(name);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), name);
    }

    #[test]
    fn entry_name_rejects_empty() {
        assert_eq!(EntryName::new(""), Err(NameError::EmptyError));
    }

    #[rstest]
    #[case("a/b")]
    #[case("/")]
    #[case("trailing/")]
    #[case("/leading")]
    fn entry_name_rejects_separator(#[case] name: &str) {
        assert!(matches!(
            EntryName::try_from(name),
            Err(NameError::SeparatorError { .. })
        ));
    }

    #[test]
    fn name_error_display_mentions_name() {
        let err = EntryName::new("a/b").unwrap_err();
        assert!(err.to_string().contains("'a/b'"));
    }

    #[test]
    fn file_node_has_empty_content_and_no_children() {
        let parent = FolderId::new(EntryId::new(0));
        let node = Node::file(EntryName::new("notes.txt").unwrap(), parent);
        assert_eq!(node.kind(), EntryKind::File);
        assert_eq!(node.content(), Some(""));
        assert!(node.children().is_empty());
        assert_eq!(node.parent(), Some(parent));
        assert_eq!(node.last_modified(), None);
    }

    #[test]
    fn folder_node_without_parent_is_a_root() {
        let node = Node::folder(EntryName::new("root").unwrap(), None);
        assert!(node.is_folder());
        assert_eq!(node.content(), None);
        assert_eq!(node.parent(), None);
    }

    #[test]
    fn entry_kind_displays_lowercase() {
        assert_eq!(EntryKind::File.to_string(), "file");
        assert_eq!(EntryKind::Folder.to_string(), "folder");
    }
}
