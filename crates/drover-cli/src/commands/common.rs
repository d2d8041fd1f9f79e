//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use drover_sched::{
    CheckpointStore, JobHandle, JobState, JsonCheckpointStore, LocalPort, Orchestrator,
    OrchestratorConfig, RemoteExecutionPort, SqliteCheckpointStore, SshPort, SshTarget,
};

/// Read one command per line, skipping blank lines and `#` comments.
pub fn parse_commands(source: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Load a commands file.
pub fn load_commands(path: &Path) -> Result<Vec<String>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read commands file: {}", path.display()))?;
    let commands = parse_commands(&source);
    if commands.is_empty() {
        anyhow::bail!("No commands found in {}", path.display());
    }
    Ok(commands)
}

/// Load orchestrator configuration: `.env`, then the YAML file, then
/// `DROVER_*` variables.
pub fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    OrchestratorConfig::load(path).map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))
}

/// Open the remote side: ssh when a destination is given, else this host.
pub fn open_port(ssh: Option<&str>, work_dir: &Path) -> Result<Arc<dyn RemoteExecutionPort>> {
    match ssh {
        Some(destination) => {
            let target = SshTarget::parse(destination)
                .map_err(|e| anyhow::anyhow!("Invalid ssh destination '{destination}': {e}"))?
                .with_remote_dir(work_dir);
            Ok(Arc::new(SshPort::new(target)))
        }
        None => Ok(Arc::new(LocalPort::new())),
    }
}

/// Return the default drover state directory (~/.drover/).
pub fn default_state_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let state_dir = home.join(".drover");
    if !state_dir.exists() {
        fs::create_dir_all(&state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;
    }
    Ok(state_dir)
}

/// Default checkpoint database under the state directory.
pub fn default_checkpoint_path() -> Result<PathBuf> {
    Ok(default_state_dir()?.join("checkpoints.db"))
}

/// Open a checkpoint store; `.db` and `.sqlite` files use SQLite, anything
/// else a JSON file.
pub fn open_store(path: &Path) -> Result<Box<dyn CheckpointStore>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext.to_lowercase().as_str() {
        "db" | "sqlite" | "sqlite3" => {
            let store = SqliteCheckpointStore::new(path).map_err(|e| {
                anyhow::anyhow!("Failed to open checkpoint store at {}: {}", path.display(), e)
            })?;
            Ok(Box::new(store))
        }
        _ => Ok(Box::new(JsonCheckpointStore::new(path))),
    }
}

/// Wait for every handle with a progress bar.
pub async fn wait_for_handles(handles: &[JobHandle]) -> Result<()> {
    let progress = ProgressBar::new(handles.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(Duration::from_millis(100));

    loop {
        let done = handles.iter().filter(|h| h.is_done()).count();
        let running = handles
            .iter()
            .filter(|h| h.state() == JobState::Running)
            .count();
        progress.set_position(done as u64);
        progress.set_message(format!("{running} running"));
        if done == handles.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    progress.finish_and_clear();
    Ok(())
}

/// Drain the orchestrator and stop it.
pub async fn drain(orchestrator: &Orchestrator, handles: &[JobHandle]) -> Result<()> {
    wait_for_handles(handles).await?;
    orchestrator
        .wait_until_done()
        .await
        .map_err(|e| anyhow::anyhow!("Orchestrator stopped early: {e}"))?;
    orchestrator.shutdown();
    orchestrator.await_termination().await;
    Ok(())
}

/// Print one line per handle and a total.
pub fn print_summary(handles: &[JobHandle]) {
    println!(
        "\n  {:<8}  {:<10}  {:<12}  {}",
        style("JOB").bold(),
        style("STATE").bold(),
        style("SLURM ID").bold(),
        style("EXIT").bold()
    );
    println!("  {}", "-".repeat(44));

    let mut failed = 0;
    for handle in handles {
        let status = handle.status();
        let state = match status.state {
            JobState::Done if status.exit_code == 0 => style(status.state.name()).green(),
            JobState::Done => {
                failed += 1;
                style(status.state.name()).red()
            }
            JobState::Cancelled => style(status.state.name()).yellow(),
            _ => style(status.state.name()).cyan(),
        };
        let exit = handle
            .exit_value()
            .map_or_else(|| "-".to_string(), |code| code.to_string());
        let job_id = status
            .remote_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "  {:<8}  {:<10}  {:<12}  {}",
            handle.number(),
            state,
            style(job_id).dim(),
            exit
        );
    }

    if failed == 0 {
        println!(
            "\n{} {} jobs finished",
            style("✓").green().bold(),
            handles.len()
        );
    } else {
        println!(
            "\n{} {} of {} jobs failed",
            style("✗").red().bold(),
            failed,
            handles.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands_skips_comments() {
        let source = "# sweep\npython fit.py --k 1\n\n  python fit.py --k 2  \n#done\n";
        assert_eq!(
            parse_commands(source),
            vec!["python fit.py --k 1", "python fit.py --k 2"]
        );
    }

    #[test]
    fn test_open_store_by_extension() {
        let dir = std::env::temp_dir().join(format!("drover-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(open_store(&dir.join("cp.json")).is_ok());
        assert!(open_store(&dir.join("cp.db")).is_ok());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
