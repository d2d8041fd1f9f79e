//! Background monitor task, one per orchestrator.
//!
//! Every poll interval the monitor reconciles local bookkeeping with the
//! scheduler: it retires in-flight jobs that left the scheduler's queue and
//! submits queued jobs while fewer than `parallelism` are in flight.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::lifecycle::Lifecycle;
use crate::orchestrator::Shared;
use crate::port::RemoteExecutionPort;

/// What the loop does after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Drained,
}

/// Monitor task body. Runs until killed or drained after shutdown.
pub(crate) async fn run(shared: Arc<Shared>) {
    let mut lifecycle = shared.lifecycle.subscribe();
    let interval = shared.config.poll_interval();

    loop {
        match shared.lifecycle.get() {
            Lifecycle::Killed | Lifecycle::Dead => break,
            Lifecycle::Paused if shared.is_dropped() => break,
            Lifecycle::Paused => {}
            Lifecycle::Active => {
                if iterate(&shared).await == Step::Drained {
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shared.wake.notified() => {}
            changed = lifecycle.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    teardown(&shared).await;
}

/// One reconciliation pass, holding the queue lock throughout.
async fn iterate(shared: &Shared) -> Step {
    let mut queue = shared.queue.lock().await;

    // A pause that landed while we waited for the lock wins.
    if shared.lifecycle.get() != Lifecycle::Active {
        return Step::Continue;
    }
    if queue.is_empty() {
        return if shared.is_accepting() {
            Step::Continue
        } else {
            Step::Drained
        };
    }

    if queue.in_flight_len() > 0 {
        match shared.list_running().await {
            Ok(running) => shared.retire(&mut queue, &running).await,
            Err(e) => {
                // Never conclude anything from a failed query.
                warn!("Skipping poll of {}: {}", shared.builder.job_name(), e);
                return Step::Continue;
            }
        }
    }

    shared.promote(&mut queue).await;
    queue.mark_cycle_completed();
    debug!(
        "Poll of {}: {} queued, {} in flight",
        shared.builder.job_name(),
        queue.queued_len(),
        queue.in_flight_len()
    );
    Step::Continue
}

async fn teardown(shared: &Shared) {
    match shared.lifecycle.get() {
        Lifecycle::Killed => on_kill(shared).await,
        Lifecycle::Paused => on_abandon(shared).await,
        _ => on_shutdown(shared),
    }
    let pending = shared.batches.lock().await.pending_commands();
    if pending > 0 {
        warn!(
            "Orchestrator {} discarded {} unsubmitted packed commands",
            shared.builder.job_name(),
            pending
        );
    }

    if let Err(e) = shared.port.shutdown().await {
        error!("Closing {} failed: {}", shared.port.name(), e);
    }
    if let Err(e) = shared.lifecycle.transition(Lifecycle::Dead) {
        error!("Orchestrator {} teardown: {}", shared.builder.job_name(), e);
    }
}

/// Report what was abandoned. Nothing is cancelled remotely.
async fn on_kill(shared: &Shared) {
    let queue = shared.queue.lock().await;
    let abandoned = queue.in_flight_ids();
    if queue.queued_len() > 0 || !abandoned.is_empty() {
        warn!(
            "Orchestrator {} abandoned {} queued jobs and scheduler jobs {:?}",
            shared.builder.job_name(),
            queue.queued_len(),
            abandoned
        );
    }
}

/// Dropped while paused: outstanding work is left as checkpointed.
async fn on_abandon(shared: &Shared) {
    let queue = shared.queue.lock().await;
    info!(
        "Orchestrator {} dropped while paused with {} outstanding jobs",
        shared.builder.job_name(),
        queue.outstanding()
    );
}

fn on_shutdown(shared: &Shared) {
    info!("Orchestrator {} drained", shared.builder.job_name());
}
