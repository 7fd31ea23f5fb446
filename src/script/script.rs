use std::borrow::Cow;
use std::path::{Path, PathBuf};

use compio::fs;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::filesystem::{DEFAULT_ROOT_NAME, EntryName, NameError};
use crate::script::{Operation, OperationError};

fn key(name: &str) -> Yaml<'_> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

/// Ordered list of operations to run against a fresh tree.
#[derive(Debug, Clone)]
pub struct Script {
    root: String,
    operations: Vec<Operation>,
}

impl Script {
    pub async fn read(path: &Path) -> Result<Self, ScriptCreationError> {
        debug!("Opening script file: {}", path.display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.to_path_buf(),
        })?;
        debug!("Successfully read script file: {} bytes", bytes.len());
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.to_path_buf(),
        })?;
        contents.as_str().try_into()
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

impl TryFrom<&str> for Script {
    type Error = ScriptCreationError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents
            .first()
            .ok_or(ScriptCreationError::MalformedScript)?;
        let top_level = document
            .as_mapping()
            .ok_or(ScriptCreationError::TopLevelNotMap)?;

        let root = match top_level.get(&key("root")) {
            Some(value) => value
                .as_str()
                .ok_or(ScriptCreationError::RootNotString)?
                .to_string(),
            None => DEFAULT_ROOT_NAME.to_string(),
        };
        EntryName::new(root.as_str()).context(RootNameSnafu)?;

        let operations = match top_level.get(&key("operations")) {
            Some(value) => value
                .as_sequence()
                .ok_or(ScriptCreationError::OperationsNotSequence)?
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    Operation::from_yaml(item).context(InvalidOperationSnafu { index })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        debug!("Parsed {} operations", operations.len());

        Ok(Script { root, operations })
    }
}

#[derive(Debug, Snafu)]
pub enum ScriptCreationError {
    #[snafu(display("Failed to read the script file: {}", file_path.display()))]
    ReadError {
        file_path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Script file is not valid UTF-8: {}", file_path.display()))]
    EncodingError {
        file_path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the script file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted script file"))]
    MalformedScript,
    #[snafu(display("Top level of script should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Root name should be a string"))]
    RootNotString,
    #[snafu(display("Invalid root name"))]
    RootNameError { source: NameError },
    #[snafu(display("Operations section should be a sequence"))]
    OperationsNotSequence,
    #[snafu(display("Operation #{} is invalid", index))]
    InvalidOperationError {
        index: usize,
        source: OperationError,
    },
}
