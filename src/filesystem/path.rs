//! Path resolution over the node arena.
//!
//! Paths handed to these functions are relative to a starting folder and use
//! [`PATH_SEPARATOR`] between segments. Every lookup scans children in
//! insertion order and the first match wins, so duplicate names shadow later
//! siblings.

use crate::filesystem::entry::{EntryId, EntryKind, FolderId, Node, PATH_SEPARATOR};

/// Builds `/<root>/.../<name>` by walking parent handles up to the root.
pub(crate) fn full_path(nodes: &[Node], id: EntryId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(id) = current {
        let node = &nodes[id.index()];
        segments.push(node.name().as_str());
        current = node.parent().map(FolderId::id);
    }

    segments
        .iter()
        .rev()
        .fold(String::new(), |mut path, segment| {
            path.push(PATH_SEPARATOR);
            path.push_str(segment);
            path
        })
}

/// Resolves `relative` starting from `start`.
///
/// Intermediate segments only match folders. The terminal segment matches
/// any entry when `terminal` is `None`, otherwise only entries of that kind.
pub(crate) fn resolve(
    nodes: &[Node],
    start: FolderId,
    relative: &str,
    terminal: Option<EntryKind>,
) -> Option<EntryId> {
    let mut folder = start;
    let mut rest = relative;

    loop {
        match rest.split_once(PATH_SEPARATOR) {
            None => {
                return first_child(nodes, folder, rest, |node| {
                    terminal.is_none_or(|kind| node.kind() == kind)
                });
            }
            Some((head, tail)) => {
                folder = first_child(nodes, folder, head, Node::is_folder).map(FolderId::new)?;
                rest = tail;
            }
        }
    }
}

fn first_child(
    nodes: &[Node],
    folder: FolderId,
    name: &str,
    accepts: impl Fn(&Node) -> bool,
) -> Option<EntryId> {
    nodes[folder.id().index()]
        .children()
        .iter()
        .copied()
        .find(|child| {
            let node = &nodes[child.index()];
            node.name() == name && accepts(node)
        })
}
