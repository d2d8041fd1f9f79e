//! Checkpoints of orchestrator state.
//!
//! A checkpoint is a flat document with the job shape, the job counter and
//! every outstanding command. Keys keep their historical PascalCase names
//! so existing checkpoint files stay readable.

mod json_store;
mod sqlite_store;

pub use json_store::JsonCheckpointStore;
pub use sqlite_store::SqliteCheckpointStore;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{OrchestratorConfig, SlurmConfig};
use crate::error::{SchedError, SchedResult};

/// Current checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A command that had not reached the scheduler yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEntry {
    pub command: String,
    #[serde(default)]
    pub output_files: Vec<PathBuf>,
}

/// A command the scheduler had accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InFlightEntry {
    pub job_id: u64,
    pub command: String,
    #[serde(default)]
    pub output_files: Vec<PathBuf>,
}

/// Serialized snapshot of one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Checkpoint {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "chrono::Utc::now")]
    pub saved_at: DateTime<Utc>,

    #[serde(rename = "ParallelNumber", default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(rename = "SleepTimeMs", default = "default_sleep_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub relay_output: bool,

    #[serde(default = "default_work_dir")]
    pub remote_work_dir: PathBuf,

    pub job_name: String,

    #[serde(default)]
    pub partition: Option<String>,

    #[serde(rename = "TaskNumber", default = "default_task_count")]
    pub task_count: u32,

    #[serde(rename = "MaxTaskNumberPerNode", default = "default_max_tasks_per_node")]
    pub max_tasks_per_node: u32,

    #[serde(rename = "MaxNodeNumber", default = "default_max_node_count")]
    pub max_node_count: u32,

    #[serde(default)]
    pub queue_query_user: Option<String>,

    #[serde(default)]
    pub job_counter: u64,

    #[serde(default)]
    pub queued_jobs: Vec<QueuedEntry>,

    #[serde(default)]
    pub in_flight_jobs: Vec<InFlightEntry>,
}

impl Checkpoint {
    /// Start a checkpoint from a configuration, with no jobs.
    pub fn from_config(config: &OrchestratorConfig, job_counter: u64) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            parallelism: config.parallelism,
            poll_interval_ms: config.poll_interval_ms,
            relay_output: config.relay_output,
            remote_work_dir: config.remote_work_dir.clone(),
            job_name: config.slurm.job_name.clone(),
            partition: config.slurm.partition.clone(),
            task_count: config.slurm.task_count,
            max_tasks_per_node: config.slurm.max_tasks_per_node,
            max_node_count: config.slurm.max_node_count,
            queue_query_user: config.slurm.queue_query_user.clone(),
            job_counter,
            queued_jobs: Vec::new(),
            in_flight_jobs: Vec::new(),
        }
    }

    /// Configuration the checkpointed orchestrator ran with.
    pub fn config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            parallelism: self.parallelism,
            poll_interval_ms: self.poll_interval_ms,
            relay_output: self.relay_output,
            remote_work_dir: self.remote_work_dir.clone(),
            slurm: SlurmConfig {
                job_name: self.job_name.clone(),
                partition: self.partition.clone(),
                task_count: self.task_count,
                max_tasks_per_node: self.max_tasks_per_node,
                max_node_count: self.max_node_count,
                queue_query_user: self.queue_query_user.clone(),
            },
        }
    }

    /// Queued plus in-flight commands.
    pub fn outstanding(&self) -> usize {
        self.queued_jobs.len() + self.in_flight_jobs.len()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> SchedResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check the format version.
    pub fn from_json(json: &str) -> SchedResult<Self> {
        let checkpoint: Checkpoint = serde_json::from_str(json)?;
        if checkpoint.version > CHECKPOINT_VERSION {
            return Err(SchedError::Persistence(format!(
                "checkpoint version {} is newer than supported version {}",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        Ok(checkpoint)
    }
}

/// Trait for checkpoint storage.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Save a checkpoint, replacing any earlier one for the same job name.
    async fn save(&self, checkpoint: &Checkpoint) -> SchedResult<()>;

    /// Load the checkpoint for `job_name`, or the most recent one.
    async fn load(&self, job_name: Option<&str>) -> SchedResult<Option<Checkpoint>>;

    /// Delete the checkpoint for `job_name`.
    async fn remove(&self, job_name: &str) -> SchedResult<bool>;
}

fn default_version() -> u32 {
    CHECKPOINT_VERSION
}

fn default_parallelism() -> usize {
    1
}

fn default_sleep_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
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
