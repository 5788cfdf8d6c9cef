//! Log bundle parsing.
//!
//! The scan workflow writes one log file per secret store it queries
//! (`1_get-<env>-secrets.txt`) and prints a marker line for every key it
//! locates. This module turns the downloaded run archive into a
//! [`FindingSet`] keyed by those log environments.

mod parser;
mod types;

pub use parser::LogBundleParser;
pub use types::{FindingSet, LogEnvironment};
