//! Submit command implementation.
//!
//! Submits every command of a file to SLURM and waits for them to drain.

use std::path::Path;

use anyhow::Result;
use console::style;

use drover_sched::{IoManifest, Orchestrator};

use super::common::{drain, load_commands, load_config, open_port, open_store, print_summary};

/// Execute the submit command.
pub async fn execute(
    commands_file: &Path,
    batch: bool,
    config_file: Option<&Path>,
    checkpoint: Option<&Path>,
    ssh: Option<&str>,
) -> Result<()> {
    let commands = load_commands(commands_file)?;
    let config = load_config(config_file)?;
    let port = open_port(ssh, &config.remote_work_dir)?;

    println!(
        "{} Submitting {} commands as {} via {}",
        style("→").cyan().bold(),
        style(commands.len()).green(),
        style(&config.slurm.job_name).yellow(),
        style(port.name()).magenta()
    );

    let orchestrator = Orchestrator::new(config, port)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start orchestrator: {e}"))?;

    let handles = if batch {
        for command in &commands {
            orchestrator
                .put_batch_system(command, IoManifest::new())
                .await?;
        }
        orchestrator.submit_batch_system().await?
    } else {
        let mut handles = Vec::with_capacity(commands.len());
        for command in &commands {
            handles.push(orchestrator.submit(command, Vec::new()).await?);
        }
        handles
    };
    println!(
        "  Queued {} scheduler jobs (parallelism {})",
        handles.len(),
        orchestrator.config().parallelism
    );

    let store = match checkpoint {
        Some(path) => {
            let store = open_store(path)?;
            orchestrator.save_to(store.as_ref()).await?;
            orchestrator.unpause()?;
            println!(
                "  Checkpoint: {} (resume with {})",
                style(path.display()).dim(),
                style("drover resume").dim()
            );
            Some(store)
        }
        None => None,
    };

    drain(&orchestrator, &handles).await?;

    if let Some(store) = store {
        store.remove(&orchestrator.config().slurm.job_name).await?;
    }
    print_summary(&handles);
    Ok(())
}
