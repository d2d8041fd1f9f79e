//! Scripted SLURM cluster for integration tests.
//!
//! Understands the command shapes `SlurmCommandBuilder` produces: piped
//! `sbatch` submissions, `squeue ... && echo END`, `scancel --name=N ID` and
//! foreground `srun`. Jobs stay "running" until the test finishes them.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use drover_sched::{
    CommandOutput, OrchestratorConfig, RemoteExecutionPort, SchedError, SchedResult, SlurmConfig,
};

#[derive(Debug, Default)]
struct ClusterState {
    next_id: u64,
    running: Vec<u64>,
    submissions: Vec<String>,
    cancels: Vec<String>,
    runs: Vec<String>,
    fetched: Vec<PathBuf>,
    uploaded: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
    pub fail_queries: AtomicBool,
    pub sentinel_on_failure: AtomicBool,
    pub refuse_cancel: AtomicBool,
    pub fail_get: AtomicBool,
    pub fail_put: AtomicBool,
    pub finish_on_poll: AtomicBool,
    pub submit_delay_ms: AtomicUsize,
    pub queries: AtomicUsize,
    pub closed: AtomicBool,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClusterState {
                next_id: 4821,
                ..ClusterState::default()
            }),
            ..Self::default()
        }
    }

    /// Jobs vanish from the queue right after being listed once.
    pub fn auto_finishing() -> Self {
        let cluster = Self::new();
        cluster.finish_on_poll.store(true, Ordering::SeqCst);
        cluster
    }

    pub fn running(&self) -> Vec<u64> {
        self.state.lock().unwrap().running.clone()
    }

    pub fn finish(&self, id: u64) {
        self.state.lock().unwrap().running.retain(|r| *r != id);
    }

    pub fn finish_all(&self) {
        self.state.lock().unwrap().running.clear();
    }

    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn cancels(&self) -> Vec<String> {
        self.state.lock().unwrap().cancels.clone()
    }

    pub fn runs(&self) -> Vec<String> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn fetched(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub fn uploaded(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploaded.clone()
    }

    fn submit(&self, command: &str) -> CommandOutput {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(command.to_string());
        if command.contains("REJECT") {
            return CommandOutput::new(1, "", "sbatch: error: Batch job submission failed");
        }
        let id = state.next_id;
        state.next_id += 1;
        state.running.push(id);
        CommandOutput::new(0, &format!("Submitted batch job {id}\n"), "")
    }

    fn squeue(&self, command: &str) -> CommandOutput {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            // The sentinel only follows a failed squeue when chained with `;`.
            let stdout = if command.contains("; echo END")
                || self.sentinel_on_failure.load(Ordering::SeqCst)
            {
                "END\n"
            } else {
                ""
            };
            return CommandOutput::new(1, stdout, "slurm_load_jobs error: Socket timed out");
        }
        let mut state = self.state.lock().unwrap();
        let mut stdout: String = state.running.iter().map(|id| format!("{id}\n")).collect();
        stdout.push_str("END\n");
        if self.finish_on_poll.load(Ordering::SeqCst) {
            state.running.clear();
        }
        CommandOutput::new(0, &stdout, "")
    }

    fn scancel(&self, command: &str) -> CommandOutput {
        let mut state = self.state.lock().unwrap();
        state.cancels.push(command.to_string());
        let id: Option<u64> = command.split_whitespace().last().and_then(|s| s.parse().ok());
        match id {
            Some(id) if !self.refuse_cancel.load(Ordering::SeqCst) && state.running.contains(&id) => {
                state.running.retain(|r| *r != id);
                CommandOutput::new(0, "", "")
            }
            Some(id) => CommandOutput::new(
                1,
                "",
                &format!("scancel: error: Kill job error on job id {id}: Invalid job id specified"),
            ),
            None => CommandOutput::new(1, "", "scancel: error: no job id"),
        }
    }
}

#[async_trait]
impl RemoteExecutionPort for FakeCluster {
    fn name(&self) -> &str {
        "fake"
    }

    async fn execute_capture(&self, command: &str) -> SchedResult<CommandOutput> {
        if command.ends_with("| sbatch") {
            let delay = self.submit_delay_ms.load(Ordering::SeqCst) as u64;
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            return Ok(self.submit(command));
        }
        if command.starts_with("squeue ") {
            return Ok(self.squeue(command));
        }
        if command.starts_with("scancel ") {
            return Ok(self.scancel(command));
        }
        if command.starts_with("srun ") {
            self.state.lock().unwrap().runs.push(command.to_string());
            let code = if command.contains("exit 3") { 3 } else { 0 };
            return Ok(CommandOutput::new(code, "ran\n", ""));
        }
        Ok(CommandOutput::new(127, "", "command not found"))
    }

    async fn put_files(&self, paths: &[PathBuf]) -> SchedResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(SchedError::Transfer("scp: connection lost".to_string()));
        }
        self.state.lock().unwrap().uploaded.extend_from_slice(paths);
        Ok(())
    }

    async fn get_files(&self, paths: &[PathBuf]) -> SchedResult<()> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(SchedError::Transfer("scp: no such file".to_string()));
        }
        self.state.lock().unwrap().fetched.extend_from_slice(paths);
        Ok(())
    }

    async fn make_dir(&self, _path: &Path) -> SchedResult<bool> {
        Ok(true)
    }

    async fn remove_dir(&self, _path: &Path) -> SchedResult<()> {
        Ok(())
    }

    async fn shutdown(&self) -> SchedResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Fast-polling configuration for tests.
pub fn test_config(parallelism: usize) -> OrchestratorConfig {
    OrchestratorConfig::with_slurm(SlurmConfig::named("sweep"))
        .with_parallelism(parallelism)
        .with_poll_interval_ms(10)
        .with_relay_output(false)
}

/// Poll `check` until it holds, failing the test after five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
