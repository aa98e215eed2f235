use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs;
use uuid::Uuid;

use crate::constants::{CLEANUP_RETRY_DELAY, DEFAULT_CLEANUP_ATTEMPTS};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace root {}: {source}", .path.display())]
    CreateRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create workspace {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove workspace {} after {attempts} attempts: {source}", .path.display())]
    CleanupFailed {
        path: PathBuf,
        attempts: u32,
        source: std::io::Error,
    },
}

/// Directory owned by exactly one execution.
///
/// Normally handed back through [`WorkspaceManager::release`]. If the owner
/// never gets there (panic, dropped future) the directory is removed on drop.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(workspace = %self.id, "Workspace removed on drop"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                workspace = %self.id,
                path = %self.path.display(),
                error = %e,
                "Failed to remove abandoned workspace"
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
    cleanup_attempts: u32,
    retry_delay: Duration,
}

impl WorkspaceManager {
    pub fn new<T: AsRef<Path>>(root: T) -> Self {
        WorkspaceManager {
            root: root.as_ref().into(),
            cleanup_attempts: DEFAULT_CLEANUP_ATTEMPTS,
            retry_delay: CLEANUP_RETRY_DELAY,
        }
    }

    pub fn with_cleanup_attempts(mut self, attempts: u32) -> Self {
        self.cleanup_attempts = attempts.max(1);
        self
    }

    /// Creates a fresh directory named after a new v4 UUID.
    ///
    /// The leaf is created with `create_dir`, not `create_dir_all`, so an
    /// existing directory is an error instead of being silently shared.
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::CreateRoot {
                path: self.root.clone(),
                source,
            })?;

        let id = Uuid::new_v4();
        let path = self.root.join(id.to_string());
        fs::create_dir(&path)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(workspace = %id, "Workspace acquired");
        Ok(Workspace {
            id,
            path,
            released: false,
        })
    }

    /// Removes the workspace. Failure is logged and swallowed: the caller's
    /// result never depends on cleanup.
    #[tracing::instrument(skip(self, workspace), fields(workspace = %workspace.id))]
    pub async fn release(&self, mut workspace: Workspace) {
        match self.remove_with_retry(&workspace.path).await {
            Ok(()) => tracing::debug!("Workspace released"),
            Err(e) => tracing::error!(error = %e, "Workspace cleanup failed"),
        }
        workspace.released = true;
    }

    async fn remove_with_retry(&self, path: &Path) -> Result<(), WorkspaceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match fs::remove_dir_all(path).await {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(source) if attempt >= self.cleanup_attempts => {
                    return Err(WorkspaceError::CleanupFailed {
                        path: path.into(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Workspace removal failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
