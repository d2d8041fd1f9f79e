//! Resume command implementation.
//!
//! Reloads a checkpoint written by `drover submit --checkpoint` and drains it.

use std::path::Path;

use anyhow::Result;
use console::style;

use drover_sched::Orchestrator;

use super::common::{default_checkpoint_path, drain, open_port, open_store, print_summary};

/// Execute the resume command.
pub async fn execute(checkpoint: Option<&Path>, job_name: Option<&str>, ssh: Option<&str>) -> Result<()> {
    let path = match checkpoint {
        Some(path) => path.to_path_buf(),
        None => default_checkpoint_path()?,
    };
    let store = open_store(&path)?;
    let checkpoint = store.load(job_name).await?.ok_or_else(|| {
        anyhow::anyhow!("No checkpoint found in {}", path.display())
    })?;

    println!(
        "{} Resuming {}: {} queued, {} in flight (saved {})",
        style("→").cyan().bold(),
        style(&checkpoint.job_name).yellow(),
        checkpoint.queued_jobs.len(),
        checkpoint.in_flight_jobs.len(),
        checkpoint.saved_at.format("%Y-%m-%d %H:%M")
    );

    let port = open_port(ssh, &checkpoint.remote_work_dir)?;
    let (orchestrator, handles) = Orchestrator::load(&checkpoint, port)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to restore orchestrator: {e}"))?;

    drain(&orchestrator, &handles).await?;

    store.remove(&checkpoint.job_name).await?;
    print_summary(&handles);
    Ok(())
}
