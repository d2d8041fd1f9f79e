//! SLURM implementation of [`CommandBuilder`].

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::builder::CommandBuilder;
use crate::config::SlurmConfig;
use crate::port::CommandOutput;
use crate::shell;
use crate::slurm::{parser, templates};

/// Builds `srun`/`sbatch`/`squeue`/`scancel` invocations for one job name.
#[derive(Debug, Clone)]
pub struct SlurmCommandBuilder {
    config: SlurmConfig,
    job_name: String,
    max_batch_size: usize,
}

impl SlurmCommandBuilder {
    /// Create a builder for the given job shape.
    pub fn new(config: SlurmConfig) -> Self {
        let job_name = templates::sanitize_name(&config.job_name);
        let max_batch_size = config.max_batch_size();
        Self {
            config,
            job_name,
            max_batch_size,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SlurmConfig {
        &self.config
    }

    fn user_filter(&self) -> String {
        match self.config.queue_query_user {
            Some(ref user) => format!("--user={}", shell::quote(user)),
            None => "--user=\"$USER\"".to_string(),
        }
    }
}

impl CommandBuilder for SlurmCommandBuilder {
    fn name(&self) -> &str {
        "slurm"
    }

    fn job_name(&self) -> &str {
        &self.job_name
    }

    fn build_run_command(&self, command: &str, output: &Path) -> String {
        let mut parts = vec![
            "srun".to_string(),
            format!("--job-name={}", self.job_name),
            format!("--output={}", shell::quote(&output.display().to_string())),
        ];
        if let Some(ref partition) = self.config.partition {
            parts.push(format!("--partition={}", shell::quote(partition)));
        }
        parts.push(format!("--nodes={}", self.config.nodes_per_command()));
        parts.push(format!("--ntasks={}", self.config.task_count));
        // 0 disables the limit on how long other tasks may outlive the first.
        parts.push("--wait=0".to_string());
        parts.push("bash".to_string());
        parts.push("-c".to_string());
        parts.push(shell::quote(command));
        parts.join(" ")
    }

    fn build_submit_command(&self, command: &str, output: &Path) -> String {
        templates::pipe_to_sbatch(&templates::generate_job_script(
            &self.config,
            command,
            output,
        ))
    }

    fn build_dispatch_command(&self, commands: &[String], output: &Path) -> String {
        templates::pipe_to_sbatch(&templates::generate_dispatch_script(
            &self.config,
            commands,
            output,
        ))
    }

    fn parse_submitted_id(&self, lines: &[String]) -> Option<u64> {
        parser::parse_sbatch_output(lines)
    }

    fn build_list_running_command(&self) -> String {
        format!(
            "squeue --noheader --name={} {} --format=%i && echo {}",
            self.job_name,
            self.user_filter(),
            parser::END_SENTINEL
        )
    }

    fn parse_running_ids(&self, lines: &[String]) -> Option<FxHashSet<u64>> {
        parser::parse_squeue_ids(lines)
    }

    fn build_cancel_command(&self, remote_id: u64) -> String {
        format!("scancel --name={} {}", self.job_name, remote_id)
    }

    fn cancel_succeeded(&self, output: &CommandOutput) -> bool {
        output.is_success() && !parser::scancel_failed(output.lines.iter().chain(&output.stderr))
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SlurmCommandBuilder {
        SlurmCommandBuilder::new(
            SlurmConfig::named("sweep")
                .with_partition("short")
                .with_task_count(2)
                .with_node_limits(5, 3),
        )
    }

    #[test]
    fn test_run_command() {
        let cmd = builder().build_run_command("python fit.py --k 3", Path::new("sweep-1.out"));
        assert_eq!(
            cmd,
            "srun --job-name=sweep --output=sweep-1.out --partition=short --nodes=1 --ntasks=2 \
             --wait=0 bash -c 'python fit.py --k 3'"
        );
    }

    #[test]
    fn test_submit_command_pipes_script() {
        let cmd = builder().build_submit_command("echo hi", Path::new("sweep-2.out"));
        assert!(cmd.starts_with("printf '%s\\n' '#!/bin/bash' "));
        assert!(cmd.contains("'#SBATCH --job-name=sweep'"));
        assert!(cmd.contains("'#SBATCH --output=sweep-2.out'"));
        assert!(cmd.contains("'echo hi'"));
        assert!(cmd.ends_with(" | sbatch"));
    }

    #[test]
    fn test_list_running_command() {
        assert_eq!(
            builder().build_list_running_command(),
            "squeue --noheader --name=sweep --user=\"$USER\" --format=%i && echo END"
        );
        let named = SlurmCommandBuilder::new(SlurmConfig::named("s").with_queue_user("alice"));
        assert!(named.build_list_running_command().contains("--user=alice "));
    }

    #[test]
    fn test_cancel_is_scoped_by_name() {
        assert_eq!(builder().build_cancel_command(4821), "scancel --name=sweep 4821");
    }

    #[test]
    fn test_cancel_succeeded() {
        let b = builder();
        assert!(b.cancel_succeeded(&CommandOutput::new(0, "", "")));
        assert!(!b.cancel_succeeded(&CommandOutput::new(
            0,
            "",
            "scancel: error: Kill job error on job id 4821"
        )));
        assert!(!b.cancel_succeeded(&CommandOutput::new(1, "", "")));
    }

    #[test]
    fn test_parse_round_trip_through_builder() {
        let b = builder();
        let lines = vec!["Submitted batch job 4821".to_string()];
        assert_eq!(b.parse_submitted_id(&lines), Some(4821));
        let lines: Vec<String> = ["4821", "4822", "END"].iter().map(|s| s.to_string()).collect();
        assert_eq!(b.parse_running_ids(&lines).map(|ids| ids.len()), Some(2));
        assert_eq!(b.max_batch_size(), 6);
    }
}
