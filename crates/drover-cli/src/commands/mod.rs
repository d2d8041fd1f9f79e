//! CLI command implementations.

pub mod common;
pub mod diagnose;
pub mod resume;
pub mod submit;
pub mod version;
