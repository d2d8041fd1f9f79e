//! Command execution and file transfer against the machine that talks to
//! the scheduler.

mod local;
mod process;
mod ssh;

pub use local::LocalPort;
pub use ssh::{SshPort, SshTarget};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::SchedResult;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code ([`crate::EXIT_UNKNOWN`] when killed by a signal).
    pub exit_code: i32,

    /// Standard output, one entry per line.
    pub lines: Vec<String>,

    /// Standard error, one entry per line.
    pub stderr: Vec<String>,
}

impl CommandOutput {
    /// Build an output from raw stdout/stderr text.
    pub fn new(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            exit_code,
            lines: stdout.lines().map(str::to_string).collect(),
            stderr: stderr.lines().map(str::to_string).collect(),
        }
    }

    /// Whether the command exited with status 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Blocking command execution plus file transfer.
///
/// A local implementation treats transfers as no-ops; a remote one needs
/// both directions to work.
#[async_trait]
pub trait RemoteExecutionPort: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Run a shell command and return its exit code.
    async fn execute(&self, command: &str) -> SchedResult<i32> {
        Ok(self.execute_capture(command).await?.exit_code)
    }

    /// Run a shell command and capture its output.
    async fn execute_capture(&self, command: &str) -> SchedResult<CommandOutput>;

    /// Copy local files to the remote working directory.
    async fn put_files(&self, paths: &[PathBuf]) -> SchedResult<()>;

    /// Copy remote files back to the same local paths.
    async fn get_files(&self, paths: &[PathBuf]) -> SchedResult<()>;

    /// Create a directory; false if it already existed.
    async fn make_dir(&self, path: &Path) -> SchedResult<bool>;

    /// Remove a directory and everything in it.
    async fn remove_dir(&self, path: &Path) -> SchedResult<()>;

    /// Release the connection.
    async fn shutdown(&self) -> SchedResult<()>;
}

/// Serializes file transfers of one orchestrator.
///
/// Commands still run concurrently; only `put_files`/`get_files` wait for
/// each other.
pub struct TransferGate {
    inner: Arc<dyn RemoteExecutionPort>,
    transfers: Mutex<()>,
}

impl TransferGate {
    pub fn new(inner: Arc<dyn RemoteExecutionPort>) -> Self {
        Self {
            inner,
            transfers: Mutex::new(()),
        }
    }

    /// The wrapped port.
    pub fn inner(&self) -> &Arc<dyn RemoteExecutionPort> {
        &self.inner
    }
}

#[async_trait]
impl RemoteExecutionPort for TransferGate {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn execute(&self, command: &str) -> SchedResult<i32> {
        self.inner.execute(command).await
    }

    async fn execute_capture(&self, command: &str) -> SchedResult<CommandOutput> {
        self.inner.execute_capture(command).await
    }

    async fn put_files(&self, paths: &[PathBuf]) -> SchedResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let _guard = self.transfers.lock().await;
        self.inner.put_files(paths).await
    }

    async fn get_files(&self, paths: &[PathBuf]) -> SchedResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let _guard = self.transfers.lock().await;
        self.inner.get_files(paths).await
    }

    async fn make_dir(&self, path: &Path) -> SchedResult<bool> {
        self.inner.make_dir(path).await
    }

    async fn remove_dir(&self, path: &Path) -> SchedResult<()> {
        self.inner.remove_dir(path).await
    }

    async fn shutdown(&self) -> SchedResult<()> {
        self.inner.shutdown().await
    }
}
