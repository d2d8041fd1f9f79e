//! SLURM integration: command construction, output parsing and scripts.

mod builder;
pub mod parser;
mod templates;

pub use builder::SlurmCommandBuilder;
pub use templates::{generate_dispatch_script, generate_job_script, sanitize_name};
