//! SLURM batch script templates.

use std::path::Path;

use crate::batch;
use crate::config::SlurmConfig;
use crate::shell;

/// Directive lines shared by every script of one orchestrator.
fn push_common_directives(script: &mut String, config: &SlurmConfig, output: &Path) {
    script.push_str("#!/bin/bash\n");
    script.push_str(&format!(
        "#SBATCH --job-name={}\n",
        sanitize_name(&config.job_name)
    ));
    script.push_str(&format!("#SBATCH --output={}\n", output.display()));
    if let Some(ref partition) = config.partition {
        script.push_str(&format!("#SBATCH --partition={}\n", partition));
    }
}

/// Generate a one-command batch script.
pub fn generate_job_script(config: &SlurmConfig, command: &str, output: &Path) -> String {
    let mut script = String::new();
    push_common_directives(&mut script, config, output);
    script.push_str(&format!(
        "#SBATCH --nodes={}\n",
        config.nodes_per_command()
    ));
    script.push_str(&format!("#SBATCH --ntasks={}\n", config.task_count));
    script.push('\n');
    script.push_str(command);
    script.push('\n');
    script
}

/// Generate a dispatcher script running many commands in one allocation.
///
/// The allocation spans `max_node_count` nodes and takes each node's full
/// task capacity. One dispatcher step per node overlaps the allocation; it
/// looks up its node rank, starts its round-robin share of the commands as
/// exact-sized job steps pinned to its node, and waits for all of them.
/// `max_batch_size` keeps one task per node free for the dispatcher.
pub fn generate_dispatch_script(config: &SlurmConfig, commands: &[String], output: &Path) -> String {
    let nodes = config.max_node_count.max(1) as usize;
    let mut script = String::new();
    push_common_directives(&mut script, config, output);
    script.push_str(&format!("#SBATCH --nodes={}\n", nodes));
    script.push_str(&format!(
        "#SBATCH --ntasks-per-node={}\n",
        config.max_tasks_per_node.max(1)
    ));

    script.push_str(&format!(
        "\n# {} commands over {} nodes\n",
        commands.len(),
        nodes
    ));
    script.push_str("dispatch() {\n");
    script.push_str("    case \"$SLURM_NODEID\" in\n");
    for (node, slice) in batch::round_robin(commands.len(), nodes)
        .into_iter()
        .enumerate()
    {
        if slice.is_empty() {
            continue;
        }
        script.push_str(&format!("        {})\n", node));
        for index in slice {
            script.push_str(&format!(
                "            srun --exact --nodes=1 --ntasks={} --nodelist=\"$SLURMD_NODENAME\" bash -c {} &\n",
                config.task_count,
                shell::quote(&commands[index])
            ));
        }
        script.push_str("            ;;\n");
    }
    script.push_str("    esac\n");
    script.push_str("    wait\n");
    script.push_str("}\n");
    script.push_str("export -f dispatch\n\n");
    script.push_str(&format!(
        "srun --nodes={} --ntasks-per-node=1 --overlap bash -c dispatch\n",
        nodes
    ));
    script
}

/// Shell pipeline feeding `script` to sbatch on its standard input.
pub fn pipe_to_sbatch(script: &str) -> String {
    let lines: Vec<String> = script.lines().map(shell::quote).collect();
    format!("printf '%s\\n' {} | sbatch", lines.join(" "))
}

/// Sanitize a job name for SLURM.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(64) // SLURM has a 64 character limit for job names
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SlurmConfig {
        SlurmConfig::named("sweep")
            .with_partition("short")
            .with_task_count(2)
            .with_node_limits(5, 3)
    }

    #[test]
    fn test_generate_job_script() {
        let script = generate_job_script(&test_config(), "python fit.py", Path::new("sweep-1.out"));
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("#SBATCH --job-name=sweep\n"));
        assert!(script.contains("#SBATCH --output=sweep-1.out\n"));
        assert!(script.contains("#SBATCH --partition=short\n"));
        assert!(script.contains("#SBATCH --ntasks=2\n"));
        assert!(script.ends_with("python fit.py\n"));
    }

    #[test]
    fn test_generate_dispatch_script() {
        let commands: Vec<String> = (0..4).map(|i| format!("echo {i}")).collect();
        let script = generate_dispatch_script(&test_config(), &commands, Path::new("b.out"));

        assert!(script.contains("#SBATCH --nodes=3\n"));
        assert!(script.contains("#SBATCH --ntasks-per-node=5\n"));
        assert!(script.contains("case \"$SLURM_NODEID\" in"));
        assert!(script.contains("export -f dispatch"));
        assert!(script.contains("srun --nodes=3 --ntasks-per-node=1 --overlap bash -c dispatch"));

        // Node 0 gets commands 0 and 3, node 1 gets 1, node 2 gets 2.
        let node0 = script.find("        0)").unwrap();
        let node1 = script.find("        1)").unwrap();
        let node2 = script.find("        2)").unwrap();
        let slice0 = &script[node0..node1];
        assert!(slice0.contains("bash -c 'echo 0' &"));
        assert!(slice0.contains("bash -c 'echo 3' &"));
        assert!(script[node1..node2].contains("bash -c 'echo 1' &"));
        assert_eq!(
            script
                .matches("srun --exact --nodes=1 --ntasks=2 --nodelist=\"$SLURMD_NODENAME\"")
                .count(),
            4
        );
        assert!(!script.contains("hostname"));
    }

    #[test]
    fn test_dispatch_skips_idle_nodes() {
        let config = SlurmConfig::named("few").with_node_limits(4, 4);
        let commands = vec!["a".to_string(), "b".to_string()];
        let script = generate_dispatch_script(&config, &commands, Path::new("x.out"));
        assert!(script.contains("        1)"));
        assert!(!script.contains("        2)"));
    }

    #[test]
    fn test_pipe_to_sbatch() {
        let piped = pipe_to_sbatch("#!/bin/bash\necho it's");
        assert_eq!(piped, "printf '%s\\n' '#!/bin/bash' 'echo it'\\''s' | sbatch");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my_job"), "my_job");
        assert_eq!(sanitize_name("my job"), "my_job");
        assert_eq!(sanitize_name("my/job:name"), "my_job_name");

        let long_name = "a".repeat(100);
        assert_eq!(sanitize_name(&long_name).len(), 64);
    }
}
