use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::application::listing::{render_children, render_entry, render_tree};
use crate::filesystem::{FileSystem, TreeError};
use crate::persistence::{MirrorStore, Persistence, PersistenceError};
use crate::script::{Outcome, Script, ScriptCreationError};

pub struct Application;

impl Application {
    pub async fn run(runtime_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let runtime_config: RuntimeConfig = runtime_config.into();
        let script = Script::read(&runtime_config.script)
            .await
            .context(ScriptSnafu)?;
        debug!("Loaded script: {:?}", script);

        let mut fs = FileSystem::with_root_name(script.root_name(), MirrorStore::default())
            .context(RootSnafu)?;
        let output = execute(&script, &mut fs)?;
        if !output.is_empty() {
            println!("{output}");
        }
        if !runtime_config.quiet {
            println!("{}", render_tree(&fs));
        }

        let (mirror, failures) = fs.close();
        for failure in &failures {
            warn!("Change was not persisted: {}", failure.source);
        }
        if let Some(path) = &runtime_config.mirror {
            mirror.write(path).await.context(MirrorSnafu)?;
            info!("Saved mirror snapshot to {}", path.display());
        }

        Ok(())
    }
}

/// Applies every operation of `script` in order and collects what the
/// `show` and `list` steps rendered. Stops at the first failing operation.
pub fn execute<P: Persistence>(
    script: &Script,
    fs: &mut FileSystem<P>,
) -> Result<String, ApplicationError> {
    let mut rendered = Vec::new();
    for (index, operation) in script.operations().iter().enumerate() {
        debug!("Running operation #{}: {}", index, operation);
        let outcome = operation.apply(fs).context(OperationSnafu {
            index,
            operation: operation.to_string(),
        })?;
        match outcome {
            Outcome::Applied => {}
            Outcome::Show(id) => rendered.push(render_entry(fs, id)),
            Outcome::List(folder) => rendered.push(render_children(fs, folder)),
        }
    }
    info!("Applied {} operations", script.operations().len());
    Ok(rendered.join("\n"))
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the script"))]
    ScriptError { source: ScriptCreationError },
    #[snafu(display("Script names an invalid root folder"))]
    RootError { source: TreeError },
    #[snafu(display("Operation #{} ({}) failed", index, operation))]
    OperationError {
        index: usize,
        operation: String,
        source: TreeError,
    },
    #[snafu(display("Failed to save the mirror snapshot"))]
    MirrorError { source: PersistenceError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    use crate::persistence::ChangeLog;

    const SCRIPT: &str = r#"
operations:
  - mkdir: root/stuff
  - touch: root/stuff/notes.txt
  - write: { path: root/stuff/notes.txt, content: hello }
  - show: root/stuff/notes.txt
  - rename: { path: root/stuff, to: things }
  - list: root
"#;

    #[test]
    fn execute_collects_rendered_output() {
        colored::control::set_override(false);
        let script: Script = SCRIPT.try_into().unwrap();
        let mut fs = FileSystem::new();

        let output = execute(&script, &mut fs).unwrap();

        let lines = output.lines().collect::<Vec<_>>();
        assert!(lines[0].starts_with("/root/stuff/notes.txt (5 B, modified "));
        assert_eq!(lines[1], "  hello");
        assert!(lines[2].starts_with("things/ (5 B, modified "));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn execute_reports_every_change_to_the_adapter() {
        let script: Script = SCRIPT.try_into().unwrap();
        let mut fs = FileSystem::with_persistence(ChangeLog::default());

        execute(&script, &mut fs).unwrap();

        let events = fs.persistence().events();
        assert_eq!(events.first(), Some(&"timestamp_updated"));
        assert!(events.contains(&"folder_created"));
        assert!(events.contains(&"file_created"));
        assert!(events.contains(&"file_modified"));
        assert!(events.contains(&"subtree_path_rewritten"));
    }

    #[test]
    fn execute_stops_at_the_first_failure() {
        let yaml = r#"
operations:
  - mkdir: root/a
  - touch: root/missing/b.txt
  - mkdir: root/c
"#;
        let script: Script = yaml.try_into().unwrap();
        let mut fs = FileSystem::new();

        match execute(&script, &mut fs) {
            Err(ApplicationError::OperationError {
                index, operation, ..
            }) => {
                assert_eq!(index, 1);
                assert_eq!(operation, "touch root/missing/b.txt");
            }
            other => panic!("Expected OperationError, got {:?}", other),
        }
        assert_eq!(fs.children(fs.root()).len(), 1);
    }

    #[test]
    fn execute_uses_the_script_root_name() {
        let yaml = "root: home\noperations:\n  - mkdir: home/docs\n  - mkdir: root/docs";
        let script: Script = yaml.try_into().unwrap();
        let mut fs = FileSystem::with_root_name(script.root_name(), ChangeLog::default()).unwrap();

        let result = execute(&script, &mut fs);

        assert!(matches!(
            result,
            Err(ApplicationError::OperationError { index: 1, .. })
        ));
        assert!(fs.return_object("home/docs").is_ok());
    }

    #[compio::test]
    async fn run_writes_the_mirror_snapshot() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{SCRIPT}").expect("Failed to write to temp file");
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mirror_path = temp_dir.path().join("state").join("mirror.bin");

        Application::run(RuntimeConfig {
            script: file.path().to_path_buf(),
            mirror: Some(mirror_path.clone()),
            quiet: true,
        })
        .await
        .unwrap();

        let mirror = MirrorStore::read(&mirror_path).await.unwrap();
        assert!(mirror.folder("/root/things").is_some());
        assert!(mirror.folder("/root/stuff").is_none());
        let notes = mirror.file("/root/things/notes.txt").unwrap();
        assert_eq!(notes.content, "hello");
        assert_eq!(notes.size, 5);
    }

    #[compio::test]
    async fn run_fails_on_a_missing_script() {
        let result = Application::run(RuntimeConfig {
            script: "does-not-exist.yaml".into(),
            mirror: None,
            quiet: true,
        })
        .await;

        assert!(matches!(result, Err(ApplicationError::ScriptError { .. })));
    }
}
