//! Local bookkeeping of queued and in-flight jobs.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::job::JobRecord;

/// A job waiting for a free slot, with the command it will submit.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub(crate) record: Arc<JobRecord>,
    pub(crate) command: String,
}

/// A job the scheduler accepted.
///
/// The command is kept only so a checkpoint can describe the job.
#[derive(Debug)]
pub(crate) struct InFlightJob {
    pub(crate) record: Arc<JobRecord>,
    pub(crate) remote_id: u64,
    pub(crate) command: String,
}

/// FIFO queue of not-yet-submitted jobs plus the set of in-flight jobs.
///
/// A job is in at most one of the two collections; once it leaves both it
/// never comes back. The whole structure sits behind the orchestrator's
/// mutex.
#[derive(Debug, Default)]
pub(crate) struct JobQueue {
    queued: VecDeque<QueuedJob>,
    in_flight: FxHashMap<u64, InFlightJob>,
    job_counter: u64,
    cycle_completed: bool,
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start counting job numbers from `counter` (checkpoint restore).
    pub(crate) fn with_counter(counter: u64) -> Self {
        Self {
            job_counter: counter,
            ..Self::default()
        }
    }

    /// Allocate the next job number.
    pub(crate) fn next_number(&mut self) -> u64 {
        self.job_counter += 1;
        self.job_counter
    }

    pub(crate) fn job_counter(&self) -> u64 {
        self.job_counter
    }

    /// Append a job to the tail of the queue.
    pub(crate) fn push(&mut self, record: Arc<JobRecord>, command: String) {
        self.queued.push_back(QueuedJob { record, command });
    }

    /// Take the head of the queue.
    pub(crate) fn pop_front(&mut self) -> Option<QueuedJob> {
        self.queued.pop_front()
    }

    /// Remove a queued job by number, keeping the order of the rest.
    pub(crate) fn remove_queued(&mut self, number: u64) -> Option<QueuedJob> {
        let position = self
            .queued
            .iter()
            .position(|job| job.record.number() == number)?;
        self.queued.remove(position)
    }

    pub(crate) fn insert_in_flight(&mut self, job: InFlightJob) {
        self.in_flight.insert(job.record.number(), job);
    }

    pub(crate) fn in_flight(&self, number: u64) -> Option<&InFlightJob> {
        self.in_flight.get(&number)
    }

    pub(crate) fn remove_in_flight(&mut self, number: u64) -> Option<InFlightJob> {
        self.in_flight.remove(&number)
    }

    /// Remove and return every in-flight job whose remote id is not in
    /// `running`, in job-number order.
    pub(crate) fn take_finished(&mut self, running: &FxHashSet<u64>) -> Vec<InFlightJob> {
        let mut finished: Vec<u64> = self
            .in_flight
            .values()
            .filter(|job| !running.contains(&job.remote_id))
            .map(|job| job.record.number())
            .collect();
        finished.sort_unstable();
        finished
            .into_iter()
            .filter_map(|number| self.in_flight.remove(&number))
            .collect()
    }

    pub(crate) fn queued(&self) -> impl Iterator<Item = &QueuedJob> {
        self.queued.iter()
    }

    /// In-flight jobs ordered by job number.
    pub(crate) fn in_flight_sorted(&self) -> Vec<&InFlightJob> {
        let mut jobs: Vec<&InFlightJob> = self.in_flight.values().collect();
        jobs.sort_unstable_by_key(|job| job.record.number());
        jobs
    }

    pub(crate) fn in_flight_ids(&self) -> Vec<u64> {
        self.in_flight_sorted()
            .into_iter()
            .map(|job| job.remote_id)
            .collect()
    }

    pub(crate) fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Queued plus in-flight.
    pub(crate) fn outstanding(&self) -> usize {
        self.queued.len() + self.in_flight.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.outstanding() == 0
    }

    pub(crate) fn mark_cycle_completed(&mut self) {
        self.cycle_completed = true;
    }

    pub(crate) fn cycle_completed(&self) -> bool {
        self.cycle_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(n: usize) -> JobQueue {
        let mut queue = JobQueue::new();
        for i in 0..n {
            let number = queue.next_number();
            queue.push(JobRecord::new(number, Vec::new()), format!("echo {i}"));
        }
        queue
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = queue_with(3);
        assert_eq!(queue.pop_front().unwrap().command, "echo 0");
        assert_eq!(queue.pop_front().unwrap().command, "echo 1");
        assert_eq!(queue.pop_front().unwrap().command, "echo 2");
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_remove_queued_keeps_order() {
        let mut queue = queue_with(4);
        let removed = queue.remove_queued(2).unwrap();
        assert_eq!(removed.command, "echo 1");
        assert!(queue.remove_queued(2).is_none());

        let order: Vec<_> = queue.queued().map(|job| job.command.clone()).collect();
        assert_eq!(order, vec!["echo 0", "echo 2", "echo 3"]);
    }

    #[test]
    fn test_take_finished() {
        let mut queue = queue_with(3);
        for remote_id in [100, 101, 102] {
            let job = queue.pop_front().unwrap();
            queue.insert_in_flight(InFlightJob {
                record: job.record,
                remote_id,
                command: job.command,
            });
        }
        assert_eq!(queue.outstanding(), 3);

        let running: FxHashSet<u64> = [101].into_iter().collect();
        let finished = queue.take_finished(&running);
        let ids: Vec<u64> = finished.iter().map(|job| job.remote_id).collect();
        assert_eq!(ids, vec![100, 102]);
        assert_eq!(queue.in_flight_ids(), vec![101]);
    }

    #[test]
    fn test_counter_restore() {
        let mut queue = JobQueue::with_counter(41);
        assert_eq!(queue.next_number(), 42);
        assert_eq!(queue.job_counter(), 42);
        assert!(queue.is_empty());
    }
}
