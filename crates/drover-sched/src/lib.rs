//! Drover: job orchestration for SLURM clusters
//!
//! This crate lets a client submit any number of shell commands to a
//! batch-scheduled cluster without managing the connection, the per-user
//! job quota or partial failures itself.
//!
//! # Overview
//!
//! An [`Orchestrator`] owns a FIFO queue of commands and a set of in-flight
//! scheduler jobs. One background monitor task per orchestrator:
//! 1. **Polls**: lists this orchestrator's live job ids on the scheduler
//! 2. **Retires**: jobs that left the scheduler are marked done and their
//!    output files are fetched
//! 3. **Promotes**: queued commands are submitted while fewer than
//!    `parallelism` jobs are in flight
//!
//! Callers get a [`JobHandle`] per submission and either await it or poll
//! its state.
//!
//! # Components
//!
//! | Piece | Role |
//! |-------|------|
//! | [`RemoteExecutionPort`] | Runs commands and moves files ([`LocalPort`], [`SshPort`]) |
//! | [`CommandBuilder`] | Scheduler strategy ([`SlurmCommandBuilder`]) |
//! | [`BatchAccumulator`] | Packs short commands into few submissions |
//! | [`CheckpointStore`] | Persists queued and in-flight work |
//!
//! # Example: Submit and Wait
//!
//! ```ignore
//! use std::sync::Arc;
//! use drover_sched::{Orchestrator, OrchestratorConfig, SlurmConfig, SshPort, SshTarget};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let port = SshPort::new(SshTarget::parse("alice@login.cluster")?);
//!     let config = OrchestratorConfig::with_slurm(
//!         SlurmConfig::named("sweep").with_partition("short"),
//!     )
//!     .with_parallelism(8);
//!
//!     let orchestrator = Orchestrator::new(config, Arc::new(port)).await?;
//!
//!     let mut handles = Vec::new();
//!     for k in 0..100 {
//!         let out = format!("fit-{k}.json");
//!         handles.push(
//!             orchestrator
//!                 .submit(&format!("python fit.py --k {k} -o {out}"), vec![out.into()])
//!                 .await?,
//!         );
//!     }
//!
//!     orchestrator.wait_until_done().await?;
//!     for handle in &handles {
//!         println!("job {}: {:?}", handle.number(), handle.exit_value());
//!     }
//!
//!     orchestrator.shutdown();
//!     orchestrator.await_termination().await;
//!     Ok(())
//! }
//! ```
//!
//! # Example: Packing Short Commands
//!
//! ```ignore
//! use drover_sched::IoManifest;
//!
//! for k in 0..500 {
//!     orchestrator
//!         .put_batch_system(&format!("./fit {k}"), IoManifest::new())
//!         .await?;
//! }
//! // One handle per scheduler submission, not per command.
//! let groups = orchestrator.submit_batch_system().await?;
//! ```
//!
//! # Checkpoints
//!
//! ```ignore
//! use drover_sched::{JsonCheckpointStore, Orchestrator};
//!
//! let store = JsonCheckpointStore::new("./sweep.checkpoint.json");
//! orchestrator.save_to(&store).await?; // leaves the orchestrator paused
//!
//! // Later, possibly in another process:
//! let checkpoint = store.load(None).await?.expect("checkpoint");
//! let (orchestrator, handles) = Orchestrator::load(&checkpoint, port).await?;
//! ```

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod job;
pub mod lifecycle;
mod monitor;
pub mod orchestrator;
pub mod persistence;
pub mod port;
mod queue;
pub mod shell;
pub mod slurm;

// Re-exports
pub use batch::{BatchAccumulator, BatchGroup, IoManifest, max_batch_size, round_robin};
pub use builder::CommandBuilder;
pub use config::{OrchestratorConfig, SlurmConfig};
pub use error::{SchedError, SchedResult};
pub use job::{EXIT_UNKNOWN, JobHandle, JobState, JobStatus, degrade_exit_code};
pub use lifecycle::Lifecycle;
pub use orchestrator::{Orchestrator, REMOTE_OUTPUT_TARGET};
pub use persistence::{
    CHECKPOINT_VERSION, Checkpoint, CheckpointStore, InFlightEntry, JsonCheckpointStore,
    QueuedEntry, SqliteCheckpointStore,
};
pub use port::{CommandOutput, LocalPort, RemoteExecutionPort, SshPort, SshTarget, TransferGate};
pub use slurm::SlurmCommandBuilder;
