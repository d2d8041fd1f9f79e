//! Configuration for the orchestrator and its SLURM strategy.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with DROVER_ prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch;
use crate::error::{SchedError, SchedResult};

/// SLURM job shape and naming, fixed for the lifetime of one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlurmConfig {
    /// Job name shared by every submission of one orchestrator. Queries and
    /// cancellations are scoped by it.
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// SLURM partition to submit to (cluster default when absent).
    #[serde(default)]
    pub partition: Option<String>,

    /// Tasks requested per logical command.
    #[serde(default = "default_task_count")]
    pub task_count: u32,

    /// Upper bound on tasks a single node accepts.
    #[serde(default = "default_max_tasks_per_node")]
    pub max_tasks_per_node: u32,

    /// Nodes a packed dispatcher job may span.
    #[serde(default = "default_max_node_count")]
    pub max_node_count: u32,

    /// User whose jobs the status query lists (`$USER` on the remote side
    /// when absent).
    #[serde(default)]
    pub queue_query_user: Option<String>,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            partition: None,
            task_count: default_task_count(),
            max_tasks_per_node: default_max_tasks_per_node(),
            max_node_count: default_max_node_count(),
            queue_query_user: None,
        }
    }
}

impl SlurmConfig {
    /// Create a configuration with the given job name.
    pub fn named(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            ..Default::default()
        }
    }

    /// Set the partition.
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Set tasks per command.
    pub fn with_task_count(mut self, task_count: u32) -> Self {
        self.task_count = task_count;
        self
    }

    /// Set the per-node task limit and node limit.
    pub fn with_node_limits(mut self, max_tasks_per_node: u32, max_node_count: u32) -> Self {
        self.max_tasks_per_node = max_tasks_per_node;
        self.max_node_count = max_node_count;
        self
    }

    /// Set the user whose queue is polled.
    pub fn with_queue_user(mut self, user: impl Into<String>) -> Self {
        self.queue_query_user = Some(user.into());
        self
    }

    /// Number of commands packed into one scheduler submission.
    pub fn max_batch_size(&self) -> usize {
        batch::max_batch_size(
            self.task_count,
            self.max_tasks_per_node,
            self.max_node_count,
        )
    }

    /// Nodes needed to host one command's tasks.
    pub fn nodes_per_command(&self) -> u32 {
        self.task_count
            .div_ceil(self.max_tasks_per_node.max(1))
            .clamp(1, self.max_node_count.max(1))
    }

    /// Validate the job shape.
    pub fn validate(&self) -> SchedResult<()> {
        if self.job_name.is_empty() {
            return Err(SchedError::Configuration(
                "job_name must not be empty".to_string(),
            ));
        }
        if !self
            .job_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SchedError::Configuration(format!(
                "job_name may only contain [A-Za-z0-9_-]: {}",
                self.job_name
            )));
        }
        if self.task_count == 0 || self.max_tasks_per_node == 0 || self.max_node_count == 0 {
            return Err(SchedError::Configuration(
                "task_count, max_tasks_per_node and max_node_count must be greater than 0"
                    .to_string(),
            ));
        }
        let capacity = u64::from(self.max_tasks_per_node) * u64::from(self.max_node_count);
        if u64::from(self.task_count) > capacity {
            return Err(SchedError::Configuration(format!(
                "task_count {} exceeds {} nodes x {} tasks per node",
                self.task_count, self.max_node_count, self.max_tasks_per_node
            )));
        }
        if let Some(ref partition) = self.partition {
            if partition.trim().is_empty() {
                return Err(SchedError::Configuration(
                    "partition must not be empty; omit it to use the cluster default".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of scheduler jobs in flight at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Delay between monitor iterations in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Relay captured remote stdout/stderr into the log.
    #[serde(default = "default_true")]
    pub relay_output: bool,

    /// Remote directory that generated output files live in.
    #[serde(default = "default_work_dir")]
    pub remote_work_dir: PathBuf,

    /// SLURM strategy settings.
    #[serde(default)]
    pub slurm: SlurmConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            poll_interval_ms: default_poll_interval_ms(),
            relay_output: true,
            remote_work_dir: default_work_dir(),
            slurm: SlurmConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a configuration around the given SLURM settings.
    pub fn with_slurm(slurm: SlurmConfig) -> Self {
        Self {
            slurm,
            ..Default::default()
        }
    }

    /// Set parallelism.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    /// Enable or disable remote output relaying.
    pub fn with_relay_output(mut self, relay: bool) -> Self {
        self.relay_output = relay;
        self
    }

    /// Set the remote working directory.
    pub fn with_remote_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.remote_work_dir = dir.into();
        self
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SchedResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: OrchestratorConfig = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load from file if provided
    /// 2. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> SchedResult<Self> {
        let config = if let Some(path) = config_file {
            Self::from_file(path)?
        } else {
            OrchestratorConfig::default()
        };

        let config = config.merge_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables present in `lookup` override the current values.
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DROVER_PARALLELISM").and_then(|v| v.parse().ok()) {
            self.parallelism = val;
        }
        if let Some(val) = lookup("DROVER_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = val;
        }
        if let Some(v) = lookup("DROVER_RELAY_OUTPUT") {
            self.relay_output = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("DROVER_WORK_DIR") {
            self.remote_work_dir = PathBuf::from(v);
        }

        // SLURM
        if let Some(v) = lookup("DROVER_JOB_NAME") {
            self.slurm.job_name = v;
        }
        if let Some(v) = lookup("DROVER_PARTITION") {
            self.slurm.partition = Some(v);
        }
        if let Some(val) = lookup("DROVER_TASK_COUNT").and_then(|v| v.parse().ok()) {
            self.slurm.task_count = val;
        }
        if let Some(val) = lookup("DROVER_MAX_TASKS_PER_NODE").and_then(|v| v.parse().ok()) {
            self.slurm.max_tasks_per_node = val;
        }
        if let Some(val) = lookup("DROVER_MAX_NODE_COUNT").and_then(|v| v.parse().ok()) {
            self.slurm.max_node_count = val;
        }
        if let Some(v) = lookup("DROVER_QUEUE_USER") {
            self.slurm.queue_query_user = Some(v);
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> SchedResult<()> {
        if self.parallelism == 0 {
            return Err(SchedError::Configuration(
                "parallelism must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SchedError::Configuration(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        self.slurm.validate()
    }
}

fn default_job_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("drover-{}", &id[..12])
}

fn default_task_count() -> u32 {
    1
}

fn default_max_tasks_per_node() -> u32 {
    20
}

fn default_max_node_count() -> u32 {
    10
}

fn default_parallelism() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.parallelism, 1);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.slurm.task_count, 1);
        assert_eq!(config.slurm.max_tasks_per_node, 20);
        assert_eq!(config.slurm.max_node_count, 10);
        assert!(config.slurm.job_name.starts_with("drover-"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_job_names_differ() {
        assert_ne!(SlurmConfig::default().job_name, SlurmConfig::default().job_name);
    }

    #[test]
    fn test_yaml_partial_document() {
        let yaml = "parallelism: 4\nslurm:\n  job_name: sweep\n  partition: short\n";
        let config: OrchestratorConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.slurm.job_name, "sweep");
        assert_eq!(config.slurm.partition.as_deref(), Some("short"));
        assert_eq!(config.slurm.max_node_count, 10);
    }

    #[test]
    fn test_merge_env_overrides() {
        let config = OrchestratorConfig::default().merge_env(|key| match key {
            "DROVER_PARALLELISM" => Some("8".to_string()),
            "DROVER_RELAY_OUTPUT" => Some("false".to_string()),
            "DROVER_JOB_NAME" => Some("from_env".to_string()),
            "DROVER_TASK_COUNT" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(config.parallelism, 8);
        assert!(!config.relay_output);
        assert_eq!(config.slurm.job_name, "from_env");
        assert_eq!(config.slurm.task_count, 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = OrchestratorConfig::default().with_parallelism(0);
        assert!(config.validate().is_err());

        let config = OrchestratorConfig::with_slurm(SlurmConfig::named("bad name"));
        assert!(config.validate().is_err());

        let config = OrchestratorConfig::with_slurm(
            SlurmConfig::named("big").with_task_count(41).with_node_limits(4, 10),
        );
        assert!(matches!(
            config.validate(),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_nodes_per_command() {
        let slurm = SlurmConfig::named("n").with_task_count(45).with_node_limits(20, 10);
        assert_eq!(slurm.nodes_per_command(), 3);
        let slurm = SlurmConfig::named("n").with_task_count(1);
        assert_eq!(slurm.nodes_per_command(), 1);
    }
}
