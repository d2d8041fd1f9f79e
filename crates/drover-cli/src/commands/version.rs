//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - job orchestration for SLURM clusters",
        style("Drover").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  drover-sched   Queue, monitor, packing and checkpoints");
    println!("  drover-cli     Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style("https://github.com/drover-hpc/drover").underlined()
    );
    println!("License:    {}", style("Apache-2.0").dim());
}
