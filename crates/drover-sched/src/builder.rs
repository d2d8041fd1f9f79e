//! Scheduler strategy: turning logical commands into scheduler invocations.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::port::CommandOutput;

/// Scheduler-specific command construction and output parsing.
///
/// Implementations are pure functions over an immutable configuration; the
/// orchestrator owns every side effect. One implementation is chosen when
/// the orchestrator is built.
pub trait CommandBuilder: Send + Sync {
    /// Scheduler name for log messages.
    fn name(&self) -> &str;

    /// Job name every submission is tagged with.
    fn job_name(&self) -> &str;

    /// Foreground invocation that blocks for the job's whole duration.
    fn build_run_command(&self, command: &str, output: &Path) -> String;

    /// Invocation that enqueues `command` and returns immediately.
    fn build_submit_command(&self, command: &str, output: &Path) -> String;

    /// Enqueue a dispatcher job that runs all `commands` concurrently.
    fn build_dispatch_command(&self, commands: &[String], output: &Path) -> String;

    /// Job id from the submission reply; `None` if the submission failed.
    fn parse_submitted_id(&self, lines: &[String]) -> Option<u64>;

    /// Status query listing this orchestrator's live job ids.
    fn build_list_running_command(&self) -> String;

    /// Ids from the status reply; `None` if the reply is incomplete and
    /// nothing may be concluded from it.
    fn parse_running_ids(&self, lines: &[String]) -> Option<FxHashSet<u64>>;

    /// Cancellation scoped to this orchestrator's job name and `remote_id`.
    fn build_cancel_command(&self, remote_id: u64) -> String;

    /// Whether a cancellation reply reports success.
    fn cancel_succeeded(&self, output: &CommandOutput) -> bool;

    /// Commands one submission may carry.
    fn max_batch_size(&self) -> usize;
}
