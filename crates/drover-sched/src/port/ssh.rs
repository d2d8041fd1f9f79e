//! Port that drives a cluster login node through the system `ssh`/`scp`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{SchedError, SchedResult};
use crate::port::{CommandOutput, RemoteExecutionPort, process};
use crate::shell;

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Login node host name.
    pub host: String,

    /// Remote user (ssh config default when absent).
    pub user: Option<String>,

    /// SSH port.
    pub port: Option<u16>,

    /// Private key file.
    pub identity: Option<PathBuf>,

    /// Remote directory commands run in and relative files map to.
    pub remote_dir: PathBuf,

    /// Control socket for connection multiplexing.
    pub control_path: Option<PathBuf>,
}

impl SshTarget {
    /// Create a target for `host` with the remote home as working directory.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
            identity: None,
            remote_dir: PathBuf::from("."),
            control_path: None,
        }
    }

    /// Parse `user@host` or `host`.
    pub fn parse(destination: &str) -> SchedResult<Self> {
        let (user, host) = match destination.split_once('@') {
            Some((user, host)) => (Some(user.to_string()), host),
            None => (None, destination),
        };
        if host.is_empty() || user.as_deref() == Some("") {
            return Err(SchedError::Configuration(format!(
                "invalid ssh destination: {destination}"
            )));
        }
        Ok(Self {
            user,
            ..Self::new(host)
        })
    }

    /// Set the remote working directory.
    pub fn with_remote_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.remote_dir = dir.into();
        self
    }

    /// Set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the identity file.
    pub fn with_identity(mut self, identity: impl Into<PathBuf>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Multiplex all commands over one master connection.
    pub fn with_control_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.control_path = Some(path.into());
        self
    }

    /// `user@host` or `host`.
    pub fn destination(&self) -> String {
        match self.user {
            Some(ref user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Remote path a local path maps to. Relative paths keep their
    /// directories, matching where a command run in `remote_dir` writes.
    pub fn remote_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.remote_dir.join(path)
        }
    }

    /// Options shared by `ssh` and `scp`.
    fn common_options(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(ref identity) = self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        if let Some(ref control) = self.control_path {
            args.push("-o".to_string());
            args.push("ControlMaster=auto".to_string());
            args.push("-o".to_string());
            args.push(format!("ControlPath={}", control.display()));
            args.push("-o".to_string());
            args.push("ControlPersist=yes".to_string());
        }
        args
    }

    /// Arguments for `ssh` running `command` in the remote directory.
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.common_options();
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(self.destination());
        args.push(format!(
            "cd {} && {}",
            shell::quote(&self.remote_dir.display().to_string()),
            command
        ));
        args
    }

    /// Arguments for `scp`; `scp` spells the port flag `-P`.
    fn scp_args(&self, from: &[String], to: String) -> Vec<String> {
        let mut args = self.common_options();
        if let Some(port) = self.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        args.push("-q".to_string());
        args.extend(from.iter().cloned());
        args.push(to);
        args
    }
}

/// Runs commands on a remote login node over SSH.
#[derive(Debug, Clone)]
pub struct SshPort {
    target: SshTarget,
}

impl SshPort {
    pub fn new(target: SshTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    async fn scp(&self, from: &[String], to: String) -> SchedResult<()> {
        let args = self.target.scp_args(from, to);
        let output = process::run("scp", &args, None).await?;
        if output.is_success() {
            Ok(())
        } else {
            Err(SchedError::Transfer(format!(
                "scp exited with {}: {}",
                output.exit_code,
                output.stderr.join(" ")
            )))
        }
    }
}

#[async_trait]
impl RemoteExecutionPort for SshPort {
    fn name(&self) -> &str {
        &self.target.host
    }

    async fn execute_capture(&self, command: &str) -> SchedResult<CommandOutput> {
        tracing::debug!("ssh {}: {}", self.target.host, command);
        let output = process::run("ssh", self.target.ssh_args(command), None).await?;
        // ssh reserves 255 for its own failures.
        if output.exit_code == 255 {
            return Err(SchedError::Transport {
                command: "ssh".to_string(),
                message: output.stderr.join(" "),
            });
        }
        Ok(output)
    }

    async fn put_files(&self, paths: &[PathBuf]) -> SchedResult<()> {
        for path in paths {
            let remote = self.target.remote_path(path);
            if let Some(parent) = remote.parent().filter(|p| !p.as_os_str().is_empty()) {
                let parent = shell::quote(&parent.display().to_string());
                let code = self.execute(&format!("mkdir -p {parent}")).await?;
                if code != 0 {
                    return Err(SchedError::Transfer(format!(
                        "mkdir {parent} exited with {code}"
                    )));
                }
            }
            let to = format!("{}:{}", self.target.destination(), remote.display());
            self.scp(&[path.display().to_string()], to).await?;
        }
        Ok(())
    }

    async fn get_files(&self, paths: &[PathBuf]) -> SchedResult<()> {
        for path in paths {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            let remote = format!(
                "{}:{}",
                self.target.destination(),
                self.target.remote_path(path).display()
            );
            self.scp(&[remote], path.display().to_string()).await?;
        }
        Ok(())
    }

    async fn make_dir(&self, path: &Path) -> SchedResult<bool> {
        let command = make_dir_command(&self.target.remote_path(path));
        let output = self.execute_capture(&command).await?;
        make_dir_outcome(&output)
    }

    async fn remove_dir(&self, path: &Path) -> SchedResult<()> {
        let path = shell::quote(&self.target.remote_path(path).display().to_string());
        let code = self.execute(&format!("rm -rf {path}")).await?;
        if code != 0 {
            return Err(SchedError::Transport {
                command: "rm".to_string(),
                message: format!("exit code {code}"),
            });
        }
        Ok(())
    }

    async fn shutdown(&self) -> SchedResult<()> {
        let Some(ref control) = self.target.control_path else {
            return Ok(());
        };
        let args = vec![
            "-o".to_string(),
            format!("ControlPath={}", control.display()),
            "-O".to_string(),
            "exit".to_string(),
            self.target.destination(),
        ];
        let output = process::run("ssh", &args, None).await?;
        if !output.is_success() {
            tracing::warn!(
                "Closing ssh master for {} failed: {}",
                self.target.host,
                output.stderr.join(" ")
            );
        }
        Ok(())
    }
}

const EXISTS_MARKER: &str = "EXISTS";

/// Create `path` unless something is already there; prints a marker then.
fn make_dir_command(path: &Path) -> String {
    let path = shell::quote(&path.display().to_string());
    format!("if test -e {path}; then echo {EXISTS_MARKER}; else mkdir -p {path}; fi")
}

/// `Ok(true)` when created, `Ok(false)` when it existed.
fn make_dir_outcome(output: &CommandOutput) -> SchedResult<bool> {
    if !output.is_success() {
        return Err(SchedError::Transport {
            command: "mkdir".to_string(),
            message: format!(
                "exit code {}: {}",
                output.exit_code,
                output.stderr.join(" ")
            ),
        });
    }
    Ok(!output.lines.iter().any(|line| line.trim() == EXISTS_MARKER))
}
