//! Job handles and their state machine.
//!
//! ```text
//! Queued ──promote──> Running ──retire──> Done
//!   │                   │
//!   └──cancel──> Cancelled <──cancel (acknowledged)
//! ```
//!
//! A failed submission moves a job from `Queued` straight to `Done` with
//! [`EXIT_UNKNOWN`]. Status changes are written only while the owning
//! orchestrator's queue mutex is held; handles read lock-free snapshots.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::orchestrator::Shared;

/// Exit code reported when the real exit status is unknown or the job
/// failed locally (submission rejected, transfer failed).
pub const EXIT_UNKNOWN: i32 = -1;

/// State of a job handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// Waiting in the local queue; nothing has reached the scheduler yet.
    Queued,
    /// Accepted by the scheduler and not yet seen to finish.
    Running,
    /// Finished (successfully or not); outputs have been fetched.
    Done,
    /// Cancelled before finishing; outputs were not fetched.
    Cancelled,
}

impl JobState {
    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Cancelled)
    }

    /// Get a human-readable state name.
    pub fn name(self) -> &'static str {
        match self {
            JobState::Queued => "Queued",
            JobState::Running => "Running",
            JobState::Done => "Done",
            JobState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of a job's observable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobStatus {
    /// Current state.
    pub state: JobState,

    /// Scheduler job id; only present while `Running`.
    pub remote_id: Option<u64>,

    /// Exit code, [`EXIT_UNKNOWN`] until the job is `Done`.
    pub exit_code: i32,
}

impl JobStatus {
    fn queued() -> Self {
        Self {
            state: JobState::Queued,
            remote_id: None,
            exit_code: EXIT_UNKNOWN,
        }
    }
}

/// Exit code to report when output retrieval failed.
///
/// A clean exit becomes [`EXIT_UNKNOWN`]; a failure code is kept since it
/// already tells the caller the job went wrong.
pub fn degrade_exit_code(exit_code: i32) -> i32 {
    if exit_code == 0 { EXIT_UNKNOWN } else { exit_code }
}

/// Orchestrator-owned record behind a [`JobHandle`].
#[derive(Debug)]
pub(crate) struct JobRecord {
    number: u64,
    output_files: Vec<PathBuf>,
    status: watch::Sender<JobStatus>,
}

impl JobRecord {
    pub(crate) fn new(number: u64, output_files: Vec<PathBuf>) -> Arc<Self> {
        let (status, _rx) = watch::channel(JobStatus::queued());
        Arc::new(Self {
            number,
            output_files,
            status,
        })
    }

    pub(crate) fn number(&self) -> u64 {
        self.number
    }

    pub(crate) fn output_files(&self) -> &[PathBuf] {
        &self.output_files
    }

    pub(crate) fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    /// Queued -> Running. Returns false if the job was not queued.
    pub(crate) fn mark_running(&self, remote_id: u64) -> bool {
        self.status.send_if_modified(|status| {
            if status.state != JobState::Queued {
                return false;
            }
            status.state = JobState::Running;
            status.remote_id = Some(remote_id);
            true
        })
    }

    /// Any non-terminal state -> Done.
    ///
    /// Returns false for a record that is already finished or cancelled.
    pub(crate) fn mark_done(&self, exit_code: i32) -> bool {
        self.status.send_if_modified(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.state = JobState::Done;
            status.remote_id = None;
            status.exit_code = exit_code;
            true
        })
    }

    /// Any non-terminal state -> Cancelled.
    pub(crate) fn mark_cancelled(&self) -> bool {
        self.status.send_if_modified(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.state = JobState::Cancelled;
            status.remote_id = None;
            true
        })
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.status.subscribe()
    }
}

/// Caller-facing view of one submitted unit of work.
///
/// Handles are cheap to clone. They expose status, cancellation and
/// completion waiting; everything else stays with the orchestrator.
#[derive(Clone)]
pub struct JobHandle {
    record: Arc<JobRecord>,
    shared: Arc<Shared>,
}

impl JobHandle {
    pub(crate) fn new(record: Arc<JobRecord>, shared: Arc<Shared>) -> Self {
        Self { record, shared }
    }

    /// Local job number (used for output naming, not identity on the cluster).
    pub fn number(&self) -> u64 {
        self.record.number()
    }

    /// Current status snapshot.
    pub fn status(&self) -> JobStatus {
        self.record.status()
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.status().state
    }

    /// Scheduler job id while running.
    pub fn job_id(&self) -> Option<u64> {
        self.status().remote_id
    }

    /// True once the job is `Done` or `Cancelled`.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    /// True if the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state() == JobState::Cancelled
    }

    /// Exit code once the job is `Done`.
    pub fn exit_value(&self) -> Option<i32> {
        let status = self.status();
        (status.state == JobState::Done).then_some(status.exit_code)
    }

    /// Files fetched back when the job finishes.
    pub fn output_files(&self) -> &[PathBuf] {
        self.record.output_files()
    }

    /// Cancel the job.
    ///
    /// A queued job is dropped from the queue. A running job is cancelled on
    /// the scheduler only when `may_interrupt` is set, and its local state
    /// changes only if the scheduler acknowledged. Returns false when
    /// nothing was cancelled, including every call on a finished job.
    pub async fn cancel(&self, may_interrupt: bool) -> bool {
        self.shared.cancel_job(&self.record, may_interrupt).await
    }

    /// Wait until the job reaches a terminal state.
    ///
    /// Returns early with the current, non-terminal status if the
    /// orchestrator is killed first.
    pub async fn wait(&self) -> JobStatus {
        let mut status = self.record.subscribe();
        let mut lifecycle = self.shared.lifecycle.subscribe();
        tokio::select! {
            biased;
            result = status.wait_for(|status| status.state.is_terminal()) => match result {
                Ok(status) => *status,
                Err(_) => self.status(),
            },
            _ = lifecycle.wait_for(|state| state.is_stopped()) => self.status(),
        }
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.record.subscribe()
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("number", &self.number())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert_eq!(JobState::Running.to_string(), "Running");
    }

    #[test]
    fn test_record_lifecycle() {
        let record = JobRecord::new(7, vec![PathBuf::from("out.txt")]);
        assert_eq!(record.status().state, JobState::Queued);
        assert_eq!(record.status().exit_code, EXIT_UNKNOWN);

        assert!(record.mark_running(4821));
        assert_eq!(record.status().remote_id, Some(4821));
        assert!(!record.mark_running(4822));

        assert!(record.mark_done(0));
        let status = record.status();
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.remote_id, None);
        assert_eq!(status.exit_code, 0);
    }

    #[test]
    fn test_done_only_once() {
        let record = JobRecord::new(1, Vec::new());
        assert!(record.mark_done(3));
        assert!(!record.mark_done(0));
        assert_eq!(record.status().exit_code, 3);
        assert!(!record.mark_cancelled());
    }

    #[test]
    fn test_cancel_suppresses_done() {
        let record = JobRecord::new(2, Vec::new());
        assert!(record.mark_running(10));
        assert!(record.mark_cancelled());
        assert!(!record.mark_done(0));
        assert_eq!(record.status().state, JobState::Cancelled);
        assert_eq!(record.status().remote_id, None);
    }

    #[test]
    fn test_degrade_exit_code() {
        assert_eq!(degrade_exit_code(0), EXIT_UNKNOWN);
        assert_eq!(degrade_exit_code(3), 3);
        assert_eq!(degrade_exit_code(EXIT_UNKNOWN), EXIT_UNKNOWN);
    }
}
