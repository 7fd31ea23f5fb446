use std::fmt::Write as _;

use colored::Colorize;

use crate::ext::SystemTimeExt;
use crate::filesystem::{EntryId, FileSystem, FolderId};
use crate::persistence::Persistence;

const INDENT: &str = "  ";

fn line<P: Persistence>(fs: &FileSystem<P>, id: EntryId, label: &str) -> String {
    let node = fs.entry(id);
    let label = if node.is_folder() {
        format!("{label}/").as_str().blue().bold().to_string()
    } else {
        label.to_string()
    };
    let modified = node
        .last_modified()
        .map(|time| time.to_timestamp())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "{label} {}",
        format!("({} B, modified {modified})", fs.size(id))
            .as_str()
            .dimmed()
    )
}

/// Whole tree, root first, children indented under their folder.
pub fn render_tree<P: Persistence>(fs: &FileSystem<P>) -> String {
    let root = fs.root();
    let mut out = line(fs, root.id(), fs.entry(root).name());
    for (depth, id) in fs.descendants(root) {
        let _ = write!(
            out,
            "\n{}{}",
            INDENT.repeat(depth + 1),
            line(fs, id, fs.entry(id).name())
        );
    }
    out
}

/// A file with its content, or a folder with its subtree. Headed by the full path.
pub fn render_entry<P: Persistence>(fs: &FileSystem<P>, id: EntryId) -> String {
    let mut out = line(fs, id, &fs.full_path(id));
    if let Some(file) = fs.as_file(id) {
        for content_line in fs.content(file).lines() {
            let _ = write!(out, "\n{INDENT}{content_line}");
        }
    } else if let Some(folder) = fs.as_folder(id) {
        for (depth, child) in fs.descendants(folder) {
            let _ = write!(
                out,
                "\n{}{}",
                INDENT.repeat(depth + 1),
                line(fs, child, fs.entry(child).name())
            );
        }
    }
    out
}

/// Direct children of a folder, one per line.
pub fn render_children<P: Persistence>(fs: &FileSystem<P>, folder: FolderId) -> String {
    fs.children(folder)
        .iter()
        .map(|child| line(fs, *child, fs.entry(*child).name()))
        .collect::<Vec<_>>()
        .join("\n")
}
