//! Protocol and quota diagnostics.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use drover_sched::slurm::parser::parse_sbatch_output;
use drover_sched::{SlurmConfig, max_batch_size, round_robin};

/// Parse captured `sbatch` output from a file, or stdin when `input` is None.
pub fn parse_sbatch(input: Option<&Path>) -> Result<()> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };
    let lines: Vec<String> = text.lines().map(str::to_string).collect();

    match parse_sbatch_output(&lines) {
        Some(id) => println!(
            "{} Submission accepted as job {}",
            style("✓").green().bold(),
            style(id).cyan()
        ),
        None => {
            println!(
                "{} No job id: the first line must read 'Submitted batch job <id>'",
                style("✗").red().bold()
            );
            if let Some(first) = lines.first() {
                println!("  First line: {}", style(first).dim());
            }
        }
    }
    Ok(())
}

/// Show how many commands fit one submission and how they spread over nodes.
pub fn max_batch(task_count: u32, max_tasks_per_node: u32, max_node_count: u32) -> Result<()> {
    SlurmConfig::named("diagnose")
        .with_task_count(task_count)
        .with_node_limits(max_tasks_per_node, max_node_count)
        .validate()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let size = max_batch_size(task_count, max_tasks_per_node, max_node_count);
    println!(
        "{} Up to {} commands per submission",
        style("→").cyan().bold(),
        style(size).green()
    );
    println!(
        "  {} tasks per command, {} tasks per node (one kept for the dispatcher), {} nodes",
        task_count, max_tasks_per_node, max_node_count
    );

    if size > 1 {
        for (node, slice) in round_robin(size, max_node_count as usize).iter().enumerate() {
            println!("  node {:<3} {} commands", node, slice.len());
        }
    }
    Ok(())
}
