use std::borrow::Cow;

use derive_more::Display;
use hashlink::LinkedHashMap;
use saphyr::{Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::filesystem::{EntryId, FileSystem, FolderId, PATH_SEPARATOR, TreeError};
use crate::persistence::Persistence;

/// One step of a script. Paths are tree paths (`root/...`).
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Operation {
    #[display("mkdir {path}")]
    AddFolder { path: String },
    #[display("touch {path}")]
    AddFile { path: String },
    #[display("write {path}")]
    Write { path: String, content: String },
    #[display("rename {path} -> {to}")]
    Rename { path: String, to: String },
    #[display("show {path}")]
    Show { path: String },
    #[display("list {path}")]
    List { path: String },
}

/// What the caller should print after an operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Show(EntryId),
    List(FolderId),
}

impl Operation {
    /// Parses a single-key mapping such as `mkdir: root/stuff` or
    /// `write: { path: root/a.txt, content: hi }`.
    pub fn from_yaml(item: &Yaml) -> Result<Self, OperationError> {
        let mapping = item.as_mapping().context(NotMapSnafu)?;
        ensure!(
            mapping.len() == 1,
            KeyCountSnafu {
                count: mapping.len()
            }
        );
        let (kind, value) = mapping.iter().next().context(KeyCountSnafu { count: 0usize })?;
        let kind = kind.as_str().context(KindNotStringSnafu)?;
        debug!("Parsing operation of kind '{}'", kind);

        match kind {
            "mkdir" => Ok(Operation::AddFolder {
                path: scalar(value, kind)?,
            }),
            "touch" => Ok(Operation::AddFile {
                path: scalar(value, kind)?,
            }),
            "show" => Ok(Operation::Show {
                path: scalar(value, kind)?,
            }),
            "list" => Ok(Operation::List {
                path: scalar(value, kind)?,
            }),
            "write" => {
                let arguments = value.as_mapping().context(ArgumentsNotMapSnafu { kind })?;
                Ok(Operation::Write {
                    path: field(arguments, kind, "path")?,
                    content: field(arguments, kind, "content")?,
                })
            }
            "rename" => {
                let arguments = value.as_mapping().context(ArgumentsNotMapSnafu { kind })?;
                Ok(Operation::Rename {
                    path: field(arguments, kind, "path")?,
                    to: field(arguments, kind, "to")?,
                })
            }
            other => UnknownKindSnafu { kind: other }.fail(),
        }
    }

    pub fn apply<P: Persistence>(&self, fs: &mut FileSystem<P>) -> Result<Outcome, TreeError> {
        match self {
            Operation::AddFolder { path } => {
                let (parent, name) = split_parent(path)?;
                let parent = fs.folder_at(parent)?;
                fs.add_folder(parent, name)?;
            }
            Operation::AddFile { path } => {
                let (parent, name) = split_parent(path)?;
                let parent = fs.folder_at(parent)?;
                fs.add_file(parent, name)?;
            }
            Operation::Write { path, content } => {
                fs.modify_file(path, content.as_str())?;
            }
            Operation::Rename { path, to } => {
                let id = fs.return_object(path)?;
                fs.rename(id, to)?;
            }
            Operation::Show { path } => return Ok(Outcome::Show(fs.return_object(path)?)),
            Operation::List { path } => return Ok(Outcome::List(fs.folder_at(path)?)),
        }
        Ok(Outcome::Applied)
    }
}

fn split_parent(path: &str) -> Result<(&str, &str), TreeError> {
    path.rsplit_once(PATH_SEPARATOR)
        .filter(|(parent, _)| !parent.is_empty())
        .ok_or_else(|| TreeError::PathNotFoundError {
            path: path.to_owned(),
        })
}

fn scalar(value: &Yaml, kind: &str) -> Result<String, OperationError> {
    value
        .as_str()
        .map(str::to_owned)
        .context(NotStringSnafu { kind, field: "path" })
}

fn field(
    arguments: &LinkedHashMap<Yaml, Yaml>,
    kind: &str,
    name: &'static str,
) -> Result<String, OperationError> {
    arguments
        .get(&Yaml::Value(Scalar::String(Cow::Borrowed(name))))
        .context(MissingFieldSnafu { kind, field: name })?
        .as_str()
        .map(str::to_owned)
        .context(NotStringSnafu { kind, field: name })
}

#[derive(Debug, Snafu)]
pub enum OperationError {
    #[snafu(display("Operation should be a map with a single key"))]
    NotMapError,
    #[snafu(display("Operation should have exactly one key, found {}", count))]
    KeyCountError { count: usize },
    #[snafu(display("Operation kind should be a string"))]
    KindNotStringError,
    #[snafu(display("Unknown operation '{}'", kind))]
    UnknownKindError { kind: String },
    #[snafu(display("Arguments of '{}' should be a map", kind))]
    ArgumentsNotMapError { kind: String },
    #[snafu(display("Operation '{}' is missing '{}'", kind, field))]
    MissingFieldError { kind: String, field: String },
    #[snafu(display("'{}' of operation '{}' should be a string", field, kind))]
    NotStringError { kind: String, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use saphyr::LoadableYamlNode;

    fn parse(source: &str) -> Result<Operation, OperationError> {
        let documents = Yaml::load_from_str(source).expect("Failed to load yaml");
        Operation::from_yaml(&documents[0])
    }

    #[rstest]
    #[case("mkdir: root/stuff", Operation::AddFolder { path: "root/stuff".into() })]
    #[case("touch: root/a.txt", Operation::AddFile { path: "root/a.txt".into() })]
    #[case("show: root/a.txt", Operation::Show { path: "root/a.txt".into() })]
    #[case("list: root", Operation::List { path: "root".into() })]
    #[case(
        "write: { path: root/a.txt, content: hello }",
        Operation::Write { path: "root/a.txt".into(), content: "hello".into() }
    )]
    #[case(
        "rename: { path: root/stuff, to: things }",
        Operation::Rename { path: "root/stuff".into(), to: "things".into() }
    )]
    fn parses_every_operation_kind(#[case] source: &str, #[case] expected: Operation) {
        assert_eq!(parse(source).unwrap(), expected);
    }

    #[test]
    fn rejects_non_map_items() {
        assert!(matches!(parse("- mkdir"), Err(OperationError::NotMapError)));
    }

    #[test]
    fn rejects_multiple_keys() {
        assert!(matches!(
            parse("{ mkdir: root/a, touch: root/b }"),
            Err(OperationError::KeyCountError { count: 2 })
        ));
    }

    #[test]
    fn rejects_unknown_kinds() {
        match parse("delete: root/a") {
            Err(OperationError::UnknownKindError { kind }) => assert_eq!(kind, "delete"),
            other => panic!("Expected UnknownKindError, got {:?}", other),
        }
    }

    #[test]
    fn rejects_missing_fields() {
        match parse("write: { path: root/a.txt }") {
            Err(OperationError::MissingFieldError { kind, field }) => {
                assert_eq!(kind, "write");
                assert_eq!(field, "content");
            }
            other => panic!("Expected MissingFieldError, got {:?}", other),
        }
    }

    #[test]
    fn rejects_non_string_arguments() {
        assert!(matches!(
            parse("write: { path: root/a.txt, content: [1, 2] }"),
            Err(OperationError::NotStringError { .. })
        ));
        assert!(matches!(
            parse("rename: root/a"),
            Err(OperationError::ArgumentsNotMapError { .. })
        ));
    }

    #[test]
    fn operations_display_as_commands() {
        let rename = Operation::Rename {
            path: "root/stuff".into(),
            to: "things".into(),
        };
        assert_eq!(rename.to_string(), "rename root/stuff -> things");
    }

    #[test]
    fn apply_builds_and_renames_the_tree() {
        let mut fs = FileSystem::new();
        let steps = [
            Operation::AddFolder {
                path: "root/stuff".into(),
            },
            Operation::AddFile {
                path: "root/stuff/notes.txt".into(),
            },
            Operation::Write {
                path: "root/stuff/notes.txt".into(),
                content: "hello".into(),
            },
            Operation::Rename {
                path: "root/stuff".into(),
                to: "things".into(),
            },
        ];
        for step in &steps {
            assert_eq!(step.apply(&mut fs).unwrap(), Outcome::Applied);
        }

        let notes = fs.return_object("root/things/notes.txt").unwrap();
        assert_eq!(fs.entry(notes).content(), Some("hello"));
        assert_eq!(fs.total_size(), 5);
    }

    #[test]
    fn apply_reports_entries_to_show_and_list() {
        let mut fs = FileSystem::new();
        let stuff = fs.add_folder(fs.root(), "stuff").unwrap();

        let shown = Operation::Show {
            path: "root/stuff".into(),
        };
        let listed = Operation::List {
            path: "root".into(),
        };
        assert_eq!(shown.apply(&mut fs).unwrap(), Outcome::Show(stuff.id()));
        assert_eq!(listed.apply(&mut fs).unwrap(), Outcome::List(fs.root()));
    }

    #[rstest]
    #[case("root")]
    #[case("/root")]
    #[case("nowhere")]
    #[case("root/missing/child")]
    fn apply_mkdir_without_parent_folder_fails(#[case] path: &str) {
        let mut fs = FileSystem::new();
        let operation = Operation::AddFolder { path: path.into() };
        assert!(matches!(
            operation.apply(&mut fs),
            Err(TreeError::PathNotFoundError { .. })
        ));
    }

    #[test]
    fn apply_touch_inside_a_file_is_a_kind_mismatch() {
        let mut fs = FileSystem::new();
        fs.add_file(fs.root(), "a.txt").unwrap();
        let operation = Operation::AddFile {
            path: "root/a.txt/b.txt".into(),
        };
        assert!(matches!(
            operation.apply(&mut fs),
            Err(TreeError::KindMismatchError { .. })
        ));
    }
}
