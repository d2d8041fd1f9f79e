//! Port that runs commands on this machine.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::SchedResult;
use crate::port::{CommandOutput, RemoteExecutionPort, process};

/// Runs commands through `bash -c` on the local host.
///
/// Used when the orchestrator itself runs on a cluster login node. Files
/// are already where the scheduler sees them, so transfers do nothing.
#[derive(Debug, Clone, Default)]
pub struct LocalPort {
    work_dir: Option<PathBuf>,
}

impl LocalPort {
    /// Create a port running in the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match self.work_dir {
            Some(ref dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl RemoteExecutionPort for LocalPort {
    fn name(&self) -> &str {
        "local"
    }

    async fn execute_capture(&self, command: &str) -> SchedResult<CommandOutput> {
        tracing::debug!("local: {}", command);
        process::run("bash", ["-c", command], self.work_dir.as_deref()).await
    }

    async fn put_files(&self, _paths: &[PathBuf]) -> SchedResult<()> {
        Ok(())
    }

    async fn get_files(&self, _paths: &[PathBuf]) -> SchedResult<()> {
        Ok(())
    }

    async fn make_dir(&self, path: &Path) -> SchedResult<bool> {
        let path = self.resolve(path);
        if fs::try_exists(&path).await? {
            return Ok(false);
        }
        fs::create_dir_all(&path).await?;
        Ok(true)
    }

    async fn remove_dir(&self, path: &Path) -> SchedResult<()> {
        let path = self.resolve(path);
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn shutdown(&self) -> SchedResult<()> {
        Ok(())
    }
}
