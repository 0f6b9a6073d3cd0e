use std::env;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use crate::error::Error;

/// Request-unique scratch area for one execution.
///
/// Either a single source file with a conventional sibling artifact slot
/// (Python, C, C++) or an owned directory (Java, whose compiler ties the file
/// name to the class name). Cleanup is best-effort and happens on drop, so
/// every exit path through the pipeline releases it.
pub struct Workspace {
    source: PathBuf,
    dir: Option<PathBuf>,
}

impl Workspace {
    /// Write `contents` to a fresh uniquely-named source file with the given
    /// extension under the system temp directory
    pub async fn source_file(extension: &str, contents: &str) -> Result<Self, Error> {
        let source = env::temp_dir().join(format!("trace-exec-{}.{}", Uuid::new_v4(), extension));
        fs::write(&source, contents).await?;
        Ok(Self { source, dir: None })
    }

    /// Create a fresh uniquely-named directory holding a single source file
    /// with a fixed name
    pub async fn directory(file_name: &str, contents: &str) -> Result<Self, Error> {
        let dir = env::temp_dir().join(format!("trace-exec-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).await?;
        let source = dir.join(file_name);
        fs::write(&source, contents).await?;
        Ok(Self {
            source,
            dir: Some(dir),
        })
    }

    /// Path of the staged source file
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Conventional path for the compiled artifact: the source path with its
    /// extension stripped
    pub fn artifact(&self) -> PathBuf {
        self.source.with_extension("")
    }

    /// Owned directory, if this workspace is directory-shaped
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        match &self.dir {
            Some(dir) => {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    if e.kind() != ErrorKind::NotFound {
                        warn!("Failed to remove workspace {}: {}", dir.display(), e);
                    }
                }
            }
            None => {
                // The artifact never exists for interpreted runs or failed
                // compiles, so NotFound is the common case
                remove_best_effort(&self.source);
                remove_best_effort(&self.artifact());
            }
        }
    }
}

fn remove_best_effort(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn source_file_is_written_and_removed_on_drop() {
        let workspace = Workspace::source_file("py", "x = 1\n").await.unwrap();
        let source = workspace.source().to_path_buf();

        assert!(source.exists());
        assert_eq!(source.extension().unwrap(), "py");
        assert_eq!(std::fs::read_to_string(&source).unwrap(), "x = 1\n");

        drop(workspace);
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn directory_workspace_removes_whole_tree_on_drop() {
        let workspace = Workspace::directory("Main.java", "class Main {}").await.unwrap();
        let dir = workspace.dir().unwrap().to_path_buf();

        assert!(dir.join("Main.java").exists());

        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn artifact_path_strips_the_extension() {
        let workspace = Workspace::source_file("c", "int main(void) { return 0; }")
            .await
            .unwrap();
        let artifact = workspace.artifact();

        assert_eq!(artifact.extension(), None);
        assert_eq!(
            artifact.to_string_lossy(),
            workspace.source().to_string_lossy().trim_end_matches(".c")
        );
    }

    #[tokio::test]
    async fn workspaces_get_unique_paths() {
        let a = Workspace::source_file("py", "").await.unwrap();
        let b = Workspace::source_file("py", "").await.unwrap();
        assert_ne!(a.source(), b.source());
    }

    #[tokio::test]
    async fn dropping_after_artifact_creation_removes_both() {
        let workspace = Workspace::source_file("c", "").await.unwrap();
        let artifact = workspace.artifact();
        std::fs::write(&artifact, b"\x7fELF").unwrap();

        drop(workspace);
        assert!(!artifact.exists());
    }
}
