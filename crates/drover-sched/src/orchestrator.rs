//! Public orchestrator: submission API, lifecycle and checkpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashSet;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::batch::{BatchAccumulator, IoManifest};
use crate::builder::CommandBuilder;
use crate::config::OrchestratorConfig;
use crate::error::{SchedError, SchedResult};
use crate::job::{EXIT_UNKNOWN, JobHandle, JobRecord, degrade_exit_code};
use crate::lifecycle::{Lifecycle, LifecycleCell};
use crate::monitor;
use crate::persistence::{Checkpoint, CheckpointStore, InFlightEntry, QueuedEntry};
use crate::port::{CommandOutput, RemoteExecutionPort, TransferGate};
use crate::queue::{InFlightJob, JobQueue, QueuedJob};
use crate::slurm::SlurmCommandBuilder;

/// Log target for relayed remote output.
pub const REMOTE_OUTPUT_TARGET: &str = "drover::remote";

/// State shared by the orchestrator, its monitor task and its handles.
///
/// Locking discipline: every read-modify-write of the queue and every job
/// status change happens while `queue` is held. A monitor iteration keeps
/// the lock for its whole duration, remote calls included, so promotions
/// and retirements of one orchestrator are strictly ordered and a caller
/// that acquires the lock knows no iteration is half done.
pub(crate) struct Shared {
    pub(crate) queue: Mutex<JobQueue>,
    pub(crate) lifecycle: LifecycleCell,
    pub(crate) wake: Notify,
    pub(crate) port: TransferGate,
    pub(crate) builder: Arc<dyn CommandBuilder>,
    pub(crate) config: OrchestratorConfig,
    accepting: AtomicBool,
    dropped: AtomicBool,
    pub(crate) batches: Mutex<BatchAccumulator>,
}

impl Shared {
    pub(crate) fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Whether the owning `Orchestrator` is gone; a paused monitor then
    /// tears down instead of waiting for an unpause that cannot come.
    pub(crate) fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Check, under the queue lock, that new work may be added.
    fn ensure_accepting(&self) -> SchedResult<()> {
        self.lifecycle.ensure_alive()?;
        if !self.is_accepting() {
            return Err(SchedError::ShuttingDown);
        }
        Ok(())
    }

    /// Scheduler log file for job `number`.
    fn log_path(&self, number: u64) -> PathBuf {
        self.config
            .remote_work_dir
            .join(format!("{}-{}.out", self.builder.job_name(), number))
    }

    /// Scheduler log file for the dispatcher of packed group `number`.
    fn batch_log_path(&self, number: u64) -> PathBuf {
        self.config
            .remote_work_dir
            .join(format!("{}-batch-{}.out", self.builder.job_name(), number))
    }

    pub(crate) fn relay(&self, output: &CommandOutput) {
        if !self.config.relay_output {
            return;
        }
        for line in &output.lines {
            info!(target: REMOTE_OUTPUT_TARGET, "{}", line);
        }
        for line in &output.stderr {
            warn!(target: REMOTE_OUTPUT_TARGET, "{}", line);
        }
    }

    /// Live job ids of this orchestrator on the scheduler.
    pub(crate) async fn list_running(&self) -> SchedResult<FxHashSet<u64>> {
        let command = self.builder.build_list_running_command();
        let output = self.port.execute_capture(&command).await?;
        if !output.is_success() {
            return Err(SchedError::TransientQuery(format!(
                "{} status query exited with {}: {}",
                self.builder.name(),
                output.exit_code,
                output.stderr.join(" ")
            )));
        }
        self.builder.parse_running_ids(&output.lines).ok_or_else(|| {
            SchedError::TransientQuery(format!(
                "{} status reply was incomplete ({} lines, exit code {})",
                self.builder.name(),
                output.lines.len(),
                output.exit_code
            ))
        })
    }

    /// Fetch outputs and mark the job done.
    ///
    /// A record that is already terminal (cancelled meanwhile) is left
    /// alone and nothing is fetched.
    pub(crate) async fn finish(&self, record: &JobRecord, exit_code: i32) {
        if record.status().state.is_terminal() {
            return;
        }
        let exit_code = match self.port.get_files(record.output_files()).await {
            Ok(()) => exit_code,
            Err(e) => {
                warn!("Fetching outputs of job {} failed: {}", record.number(), e);
                degrade_exit_code(exit_code)
            }
        };
        record.mark_done(exit_code);
    }

    /// Retire every in-flight job missing from `running`.
    ///
    /// The status query carries no exit status, so a vanished job is
    /// reported as exit code 0.
    pub(crate) async fn retire(&self, queue: &mut JobQueue, running: &FxHashSet<u64>) {
        for job in queue.take_finished(running) {
            info!("Job {} (scheduler id {}) finished", job.record.number(), job.remote_id);
            self.finish(&job.record, 0).await;
        }
    }

    /// Submit queued jobs in FIFO order while there is free capacity.
    pub(crate) async fn promote(&self, queue: &mut JobQueue) {
        while queue.in_flight_len() < self.config.parallelism {
            let Some(job) = queue.pop_front() else {
                break;
            };
            self.promote_one(queue, job).await;
        }
    }

    async fn promote_one(&self, queue: &mut JobQueue, job: QueuedJob) {
        let QueuedJob { record, command } = job;
        let remote_id = match self.port.execute_capture(&command).await {
            Ok(output) => {
                self.relay(&output);
                self.builder.parse_submitted_id(&output.lines)
            }
            Err(e) => {
                warn!("Submitting job {} failed: {}", record.number(), e);
                None
            }
        };

        match remote_id {
            Some(remote_id) => {
                record.mark_running(remote_id);
                info!("Job {} submitted as {}", record.number(), remote_id);
                queue.insert_in_flight(InFlightJob {
                    record,
                    remote_id,
                    command,
                });
            }
            None => {
                warn!(
                    "{}",
                    SchedError::Submission(format!(
                        "job {} got no {} job id",
                        record.number(),
                        self.builder.name()
                    ))
                );
                // Partial output may exist, so retrieval is still attempted.
                self.finish(&record, EXIT_UNKNOWN).await;
            }
        }
    }

    /// Ask the scheduler to cancel `remote_id`; true only when it agreed.
    async fn cancel_remote(&self, remote_id: u64) -> bool {
        let command = self.builder.build_cancel_command(remote_id);
        match self.port.execute_capture(&command).await {
            Ok(output) if self.builder.cancel_succeeded(&output) => true,
            Ok(output) => {
                warn!(
                    "Cancelling scheduler job {} was not confirmed: {}",
                    remote_id,
                    output.stderr.join(" ")
                );
                false
            }
            Err(e) => {
                warn!("Cancelling scheduler job {} failed: {}", remote_id, e);
                false
            }
        }
    }

    pub(crate) async fn cancel_job(&self, record: &JobRecord, may_interrupt: bool) -> bool {
        let mut queue = self.queue.lock().await;
        if self.lifecycle.get().is_stopped() {
            return false;
        }
        let number = record.number();

        if queue.remove_queued(number).is_some() {
            record.mark_cancelled();
            info!("Job {} cancelled before submission", number);
            return true;
        }

        let Some(remote_id) = queue.in_flight(number).map(|job| job.remote_id) else {
            return false;
        };
        if !may_interrupt || !self.cancel_remote(remote_id).await {
            return false;
        }
        queue.remove_in_flight(number);
        record.mark_cancelled();
        info!("Job {} (scheduler id {}) cancelled", number, remote_id);
        true
    }

    /// Cancel every outstanding job. Returns how many were cancelled.
    async fn cancel_all(&self) -> usize {
        let mut queue = self.queue.lock().await;
        let mut cancelled = 0;

        while let Some(job) = queue.pop_front() {
            if job.record.mark_cancelled() {
                cancelled += 1;
            }
        }

        let running: Vec<(u64, u64)> = queue
            .in_flight_sorted()
            .into_iter()
            .map(|job| (job.record.number(), job.remote_id))
            .collect();
        for (number, remote_id) in running {
            if !self.cancel_remote(remote_id).await {
                continue;
            }
            if let Some(job) = queue.remove_in_flight(number) {
                job.record.mark_cancelled();
                cancelled += 1;
            }
        }
        cancelled
    }
}

/// Coordinates queued commands, in-flight scheduler jobs and checkpoints.
///
/// One background monitor task per orchestrator polls the scheduler,
/// retires finished jobs and submits queued ones while fewer than
/// `parallelism` are in flight.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use drover_sched::{LocalPort, Orchestrator, OrchestratorConfig, SlurmConfig};
///
/// # async fn example() -> drover_sched::SchedResult<()> {
/// let config = OrchestratorConfig::with_slurm(SlurmConfig::named("sweep")).with_parallelism(4);
/// let orchestrator = Orchestrator::new(config, Arc::new(LocalPort::new())).await?;
///
/// let handle = orchestrator.submit("python fit.py --k 3", vec!["fit-3.json".into()]).await?;
/// let status = handle.wait().await;
/// println!("exit code {}", status.exit_code);
///
/// orchestrator.shutdown();
/// orchestrator.await_termination().await;
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    shared: Arc<Shared>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Create an orchestrator that submits to SLURM through `port`.
    pub async fn new(
        config: OrchestratorConfig,
        port: Arc<dyn RemoteExecutionPort>,
    ) -> SchedResult<Self> {
        let builder = Arc::new(SlurmCommandBuilder::new(config.slurm.clone()));
        Self::with_builder(config, port, builder).await
    }

    /// Create an orchestrator with a custom scheduler strategy.
    pub async fn with_builder(
        config: OrchestratorConfig,
        port: Arc<dyn RemoteExecutionPort>,
        builder: Arc<dyn CommandBuilder>,
    ) -> SchedResult<Self> {
        Self::start(config, port, builder, JobQueue::new(), Lifecycle::Active).await
    }

    /// Rebuild an orchestrator from a checkpoint.
    ///
    /// Jobs that were in flight come back as running with their scheduler
    /// ids, so the first poll retires those that finished in the meantime.
    /// The monitor stays paused until every job is restored.
    pub async fn load(
        checkpoint: &Checkpoint,
        port: Arc<dyn RemoteExecutionPort>,
    ) -> SchedResult<(Self, Vec<JobHandle>)> {
        let config = checkpoint.config();
        let builder = Arc::new(SlurmCommandBuilder::new(config.slurm.clone()));
        Self::load_with_builder(checkpoint, port, builder).await
    }

    /// Rebuild an orchestrator from a checkpoint with a custom strategy.
    pub async fn load_with_builder(
        checkpoint: &Checkpoint,
        port: Arc<dyn RemoteExecutionPort>,
        builder: Arc<dyn CommandBuilder>,
    ) -> SchedResult<(Self, Vec<JobHandle>)> {
        let queue = JobQueue::with_counter(checkpoint.job_counter);
        let orchestrator =
            Self::start(checkpoint.config(), port, builder, queue, Lifecycle::Paused).await?;

        let mut handles = Vec::with_capacity(checkpoint.outstanding());
        {
            let mut queue = orchestrator.shared.queue.lock().await;
            for entry in &checkpoint.in_flight_jobs {
                let record = JobRecord::new(queue.next_number(), entry.output_files.clone());
                record.mark_running(entry.job_id);
                handles.push(JobHandle::new(record.clone(), orchestrator.shared.clone()));
                queue.insert_in_flight(InFlightJob {
                    record,
                    remote_id: entry.job_id,
                    command: entry.command.clone(),
                });
            }
            for entry in &checkpoint.queued_jobs {
                let record = JobRecord::new(queue.next_number(), entry.output_files.clone());
                handles.push(JobHandle::new(record.clone(), orchestrator.shared.clone()));
                queue.push(record, entry.command.clone());
            }
        }
        info!(
            "Restored {} queued and {} in-flight jobs for {}",
            checkpoint.queued_jobs.len(),
            checkpoint.in_flight_jobs.len(),
            checkpoint.job_name
        );

        orchestrator.unpause()?;
        Ok((orchestrator, handles))
    }

    async fn start(
        config: OrchestratorConfig,
        port: Arc<dyn RemoteExecutionPort>,
        builder: Arc<dyn CommandBuilder>,
        queue: JobQueue,
        initial: Lifecycle,
    ) -> SchedResult<Self> {
        let port = TransferGate::new(port);
        if let Err(e) = Self::prepare(&config, &port).await {
            if let Err(close) = port.shutdown().await {
                warn!("Closing {} after failed start: {}", port.name(), close);
            }
            return Err(e);
        }

        let batches = BatchAccumulator::new(builder.max_batch_size());
        let shared = Arc::new(Shared {
            queue: Mutex::new(queue),
            lifecycle: LifecycleCell::new(initial),
            wake: Notify::new(),
            port,
            builder,
            config,
            accepting: AtomicBool::new(true),
            dropped: AtomicBool::new(false),
            batches: Mutex::new(batches),
        });

        let monitor = tokio::spawn(monitor::run(shared.clone()));
        info!(
            "Orchestrator {} started on {} (parallelism {}, batch size {})",
            shared.builder.job_name(),
            shared.port.name(),
            shared.config.parallelism,
            shared.builder.max_batch_size()
        );

        Ok(Self {
            shared,
            monitor: Mutex::new(Some(monitor)),
        })
    }

    async fn prepare(config: &OrchestratorConfig, port: &TransferGate) -> SchedResult<()> {
        config.validate()?;
        let created = port
            .make_dir(&config.remote_work_dir)
            .await
            .map_err(|e| {
                SchedError::Configuration(format!(
                    "cannot prepare remote work directory {:?}: {}",
                    config.remote_work_dir, e
                ))
            })?;
        if created {
            debug!("Created remote work directory {:?}", config.remote_work_dir);
        }
        Ok(())
    }

    /// Get the configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle.get()
    }

    /// Append `submit` to the queue under a fresh job number.
    async fn enqueue<F>(&self, output_files: Vec<PathBuf>, build: F) -> SchedResult<JobHandle>
    where
        F: FnOnce(&Shared, u64) -> String,
    {
        let mut queue = self.shared.queue.lock().await;
        self.shared.ensure_accepting()?;
        let number = queue.next_number();
        let record = JobRecord::new(number, output_files);
        queue.push(record.clone(), build(self.shared.as_ref(), number));
        drop(queue);

        debug!("Job {} queued", number);
        self.shared.wake.notify_one();
        Ok(JobHandle::new(record, self.shared.clone()))
    }

    /// A handle for work that failed before it could be queued.
    async fn failed_handle(&self, output_files: Vec<PathBuf>) -> SchedResult<JobHandle> {
        let mut queue = self.shared.queue.lock().await;
        self.shared.ensure_accepting()?;
        let record = JobRecord::new(queue.next_number(), output_files);
        record.mark_done(EXIT_UNKNOWN);
        Ok(JobHandle::new(record, self.shared.clone()))
    }

    /// Queue a command for submission and return its handle immediately.
    ///
    /// `output_files` are fetched back once the job finishes.
    pub async fn submit(
        &self,
        command: &str,
        output_files: Vec<PathBuf>,
    ) -> SchedResult<JobHandle> {
        self.enqueue(output_files, |shared, number| {
            shared
                .builder
                .build_submit_command(command, &shared.log_path(number))
        })
        .await
    }

    /// Copy `input_files` to the remote side, then queue the command.
    ///
    /// If the upload fails the command is not queued and the returned
    /// handle is already done with [`EXIT_UNKNOWN`].
    pub async fn submit_with_inputs(
        &self,
        command: &str,
        input_files: &[PathBuf],
        output_files: Vec<PathBuf>,
    ) -> SchedResult<JobHandle> {
        self.shared.lifecycle.ensure_alive()?;
        if let Err(e) = self.shared.port.put_files(input_files).await {
            warn!("Uploading inputs for {:?} failed: {}", command, e);
            return self.failed_handle(output_files).await;
        }
        self.submit(command, output_files).await
    }

    /// Run a command in the foreground and return its exit code.
    ///
    /// The command bypasses the queue. Outputs are fetched afterwards; a
    /// failed fetch turns exit code 0 into [`EXIT_UNKNOWN`].
    pub async fn run(&self, command: &str, output_files: &[PathBuf]) -> SchedResult<i32> {
        let log = {
            let mut queue = self.shared.queue.lock().await;
            self.shared.ensure_accepting()?;
            self.shared.log_path(queue.next_number())
        };

        let invocation = self.shared.builder.build_run_command(command, &log);
        let exit_code = match self.shared.port.execute_capture(&invocation).await {
            Ok(output) => {
                self.shared.relay(&output);
                output.exit_code
            }
            Err(e) => {
                warn!("Running {:?} failed: {}", command, e);
                EXIT_UNKNOWN
            }
        };

        match self.shared.port.get_files(output_files).await {
            Ok(()) => Ok(exit_code),
            Err(e) => {
                warn!("Fetching outputs of {:?} failed: {}", command, e);
                Ok(degrade_exit_code(exit_code))
            }
        }
    }

    /// Add a command to the pending packed groups.
    ///
    /// An empty command only attaches `manifest` to the current group.
    /// Groups still pending at shutdown are discarded, never submitted.
    pub async fn put_batch_system(&self, command: &str, manifest: IoManifest) -> SchedResult<()> {
        let _queue = self.shared.queue.lock().await;
        self.shared.ensure_accepting()?;
        self.shared.batches.lock().await.push(command, manifest);
        Ok(())
    }

    /// Submit every pending group and clear them.
    ///
    /// A group with one command is submitted as an ordinary job; larger
    /// groups run under a dispatcher job. Each group yields one handle.
    pub async fn submit_batch_system(&self) -> SchedResult<Vec<JobHandle>> {
        self.shared.ensure_accepting()?;
        let groups = self.shared.batches.lock().await.take();
        let mut handles = Vec::with_capacity(groups.len());

        for group in groups {
            let IoManifest { inputs, outputs } = group.manifest;
            if let Err(e) = self.shared.port.put_files(&inputs).await {
                warn!(
                    "Uploading inputs for a group of {} commands failed: {}",
                    group.commands.len(),
                    e
                );
                handles.push(self.failed_handle(outputs).await?);
                continue;
            }

            let handle = match group.commands.as_slice() {
                [command] => self.submit(command, outputs).await?,
                commands => {
                    self.enqueue(outputs, |shared, number| {
                        shared
                            .builder
                            .build_dispatch_command(commands, &shared.batch_log_path(number))
                    })
                    .await?
                }
            };
            handles.push(handle);
        }

        info!("Submitted {} packed groups", handles.len());
        Ok(handles)
    }

    /// Stop promotions; returns once no monitor iteration is in progress.
    pub async fn pause(&self) -> SchedResult<()> {
        self.shared.lifecycle.transition(Lifecycle::Paused)?;
        let _queue = self.shared.queue.lock().await;
        Ok(())
    }

    /// Resume promotions.
    pub fn unpause(&self) -> SchedResult<()> {
        self.shared.lifecycle.transition(Lifecycle::Active)?;
        Ok(())
    }

    /// Stop accepting work and let outstanding jobs drain.
    ///
    /// The monitor exits once nothing is queued or in flight.
    pub fn shutdown(&self) {
        if self.shared.is_accepting() {
            info!("Orchestrator {} shutting down", self.shared.builder.job_name());
        }
        self.shared.stop_accepting();
    }

    /// Cancel all queued and in-flight jobs, then shut down.
    ///
    /// Returns how many jobs were cancelled. In-flight jobs whose
    /// cancellation the scheduler did not confirm keep draining normally.
    pub async fn shutdown_now(&self) -> SchedResult<usize> {
        self.shared.lifecycle.ensure_alive()?;
        self.shared.stop_accepting();
        let cancelled = self.shared.cancel_all().await;
        info!(
            "Orchestrator {} cancelled {} jobs",
            self.shared.builder.job_name(),
            cancelled
        );
        Ok(cancelled)
    }

    /// Freeze local bookkeeping and stop without cancelling remote jobs.
    ///
    /// For a remote side that became unreachable. Jobs still queued or in
    /// flight stay in their current state.
    pub async fn kill(&self) -> SchedResult<()> {
        self.pause().await?;
        self.shared.stop_accepting();
        self.shared.lifecycle.transition(Lifecycle::Killed)?;
        warn!("Orchestrator {} killed", self.shared.builder.job_name());
        Ok(())
    }

    /// Whether killing now would lose nothing that polling could still do.
    ///
    /// True after the first full poll cycle once the queue is empty or all
    /// in-flight slots are taken.
    pub async fn kill_recommended(&self) -> bool {
        let queue = self.shared.queue.lock().await;
        queue.cycle_completed()
            && (queue.queued_len() == 0 || queue.in_flight_len() >= self.shared.config.parallelism)
    }

    /// Wait until nothing is queued or in flight.
    pub async fn wait_until_done(&self) -> SchedResult<()> {
        loop {
            if self.outstanding().await == 0 {
                return Ok(());
            }
            self.shared.lifecycle.ensure_alive()?;
            tokio::time::sleep(self.shared.config.poll_interval()).await;
        }
    }

    /// Wait for the monitor task to finish its teardown.
    pub async fn await_termination(&self) {
        let monitor = self.monitor.lock().await.take();
        if let Some(monitor) = monitor {
            if let Err(e) = monitor.await {
                warn!("Monitor task ended abnormally: {}", e);
            }
        }
    }

    /// Pause and snapshot every outstanding job.
    ///
    /// The orchestrator stays paused afterwards so the snapshot keeps
    /// matching its state; call [`Orchestrator::unpause`] to continue.
    pub async fn save(&self) -> SchedResult<Checkpoint> {
        self.pause().await?;
        let queue = self.shared.queue.lock().await;

        let mut checkpoint = Checkpoint::from_config(&self.shared.config, queue.job_counter());
        checkpoint.queued_jobs = queue
            .queued()
            .map(|job| QueuedEntry {
                command: job.command.clone(),
                output_files: job.record.output_files().to_vec(),
            })
            .collect();
        checkpoint.in_flight_jobs = queue
            .in_flight_sorted()
            .into_iter()
            .map(|job| InFlightEntry {
                job_id: job.remote_id,
                command: job.command.clone(),
                output_files: job.record.output_files().to_vec(),
            })
            .collect();

        debug!(
            "Checkpoint of {} with {} outstanding jobs",
            checkpoint.job_name,
            checkpoint.outstanding()
        );
        Ok(checkpoint)
    }

    /// [`Orchestrator::save`] and write the result to `store`.
    pub async fn save_to(&self, store: &dyn CheckpointStore) -> SchedResult<Checkpoint> {
        let checkpoint = self.save().await?;
        store.save(&checkpoint).await?;
        Ok(checkpoint)
    }

    /// Queued plus in-flight jobs.
    pub async fn outstanding(&self) -> usize {
        self.shared.queue.lock().await.outstanding()
    }

    /// Jobs waiting for a free slot.
    pub async fn queued_len(&self) -> usize {
        self.shared.queue.lock().await.queued_len()
    }

    /// Jobs the scheduler has accepted and not yet seen to finish.
    pub async fn in_flight_len(&self) -> usize {
        self.shared.queue.lock().await.in_flight_len()
    }

    /// A fresh output file name under the remote work directory.
    pub async fn next_output_path(&self, extension: &str) -> PathBuf {
        let number = self.shared.queue.lock().await.next_number();
        self.shared.config.remote_work_dir.join(format!(
            "{}-{}.{}",
            self.shared.builder.job_name(),
            number,
            extension
        ))
    }

    /// Remote work directory.
    pub fn remote_work_dir(&self) -> &Path {
        &self.shared.config.remote_work_dir
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Let the monitor drain and exit instead of polling forever.
        self.shared.dropped.store(true, Ordering::SeqCst);
        self.shared.stop_accepting();
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("job_name", &self.shared.builder.job_name())
            .field("lifecycle", &self.lifecycle())
            .field("accepting", &self.shared.is_accepting())
            .finish()
    }
}
