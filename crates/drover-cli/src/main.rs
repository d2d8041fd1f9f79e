//! Drover Command-Line Interface
//!
//! Submits command lists to a SLURM cluster, locally or over ssh, and
//! resumes them from checkpoints.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{diagnose, resume, submit, version};

/// Drover - job orchestration for SLURM clusters
#[derive(Parser)]
#[command(name = "drover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every command of a file and wait for them to finish
    Submit {
        /// File with one shell command per line
        #[arg(short, long)]
        commands: PathBuf,

        /// Pack commands into as few scheduler jobs as the quota allows
        #[arg(short, long)]
        batch: bool,

        /// YAML configuration file
        #[arg(long, env = "DROVER_CONFIG")]
        config: Option<PathBuf>,

        /// Write a checkpoint here once everything is queued
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Reach the cluster over ssh (user@host)
        #[arg(long)]
        ssh: Option<String>,
    },

    /// Reload a checkpoint and drain it
    Resume {
        /// Checkpoint file (defaults to ~/.drover/checkpoints.db)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Job name to resume (latest checkpoint if omitted)
        #[arg(long)]
        job_name: Option<String>,

        /// Reach the cluster over ssh (user@host)
        #[arg(long)]
        ssh: Option<String>,
    },

    /// Check captured sbatch output for a job id
    ParseSbatch {
        /// File with the captured output (stdin if omitted)
        input: Option<PathBuf>,
    },

    /// Show how many commands one submission can carry
    MaxBatch {
        /// Tasks per command
        #[arg(long, default_value = "1")]
        task_count: u32,

        /// Tasks one node can run
        #[arg(long, default_value = "20")]
        max_tasks_per_node: u32,

        /// Nodes one job may request
        #[arg(long, default_value = "10")]
        max_node_count: u32,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Submit {
            commands,
            batch,
            config,
            checkpoint,
            ssh,
        } => {
            submit::execute(
                &commands,
                batch,
                config.as_deref(),
                checkpoint.as_deref(),
                ssh.as_deref(),
            )
            .await
        }

        Commands::Resume {
            checkpoint,
            job_name,
            ssh,
        } => resume::execute(checkpoint.as_deref(), job_name.as_deref(), ssh.as_deref()).await,

        Commands::ParseSbatch { input } => diagnose::parse_sbatch(input.as_deref()),

        Commands::MaxBatch {
            task_count,
            max_tasks_per_node,
            max_node_count,
        } => diagnose::max_batch(task_count, max_tasks_per_node, max_node_count),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_minimal() {
        let cli = Cli::try_parse_from(["drover", "submit", "-c", "jobs.txt"]).unwrap();
        match cli.command {
            Commands::Submit {
                commands,
                batch,
                checkpoint,
                ssh,
                ..
            } => {
                assert_eq!(commands, PathBuf::from("jobs.txt"));
                assert!(!batch);
                assert!(checkpoint.is_none());
                assert!(ssh.is_none());
            }
            _ => panic!("Expected Submit command"),
        }
    }

    #[test]
    fn test_parse_submit_packed_over_ssh() {
        let cli = Cli::try_parse_from([
            "drover",
            "-vv",
            "submit",
            "--commands",
            "jobs.txt",
            "--batch",
            "--checkpoint",
            "sweep.json",
            "--ssh",
            "alice@login.cluster",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Submit {
                batch,
                checkpoint,
                ssh,
                ..
            } => {
                assert!(batch);
                assert_eq!(checkpoint, Some(PathBuf::from("sweep.json")));
                assert_eq!(ssh.as_deref(), Some("alice@login.cluster"));
            }
            _ => panic!("Expected Submit command"),
        }
    }

    #[test]
    fn test_parse_max_batch_defaults() {
        let cli = Cli::try_parse_from(["drover", "max-batch", "--task-count", "4"]).unwrap();
        match cli.command {
            Commands::MaxBatch {
                task_count,
                max_tasks_per_node,
                max_node_count,
            } => {
                assert_eq!(task_count, 4);
                assert_eq!(max_tasks_per_node, 20);
                assert_eq!(max_node_count, 10);
            }
            _ => panic!("Expected MaxBatch command"),
        }
    }

    #[test]
    fn test_submit_requires_commands() {
        assert!(Cli::try_parse_from(["drover", "submit"]).is_err());
    }
}
