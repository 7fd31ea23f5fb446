use snafu::Snafu;

use crate::filesystem::EntryKind;

/// Reasons an entry name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum NameError {
    #[snafu(display("Entry name must not be empty"))]
    EmptyError,
    #[snafu(display("Entry name '{}' contains the path separator", name))]
    SeparatorError { name: String },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TreeError {
    #[snafu(display("Invalid entry name"))]
    InvalidNameError { source: NameError },
    #[snafu(display("No entry found at path '{}'", path))]
    PathNotFoundError { path: String },
    #[snafu(display("Entry at '{}' is a {}, expected a {}", path, found, expected))]
    KindMismatchError {
        path: String,
        expected: EntryKind,
        found: EntryKind,
    },
}
