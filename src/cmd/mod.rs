//! CLI command implementations.
//!
//! | Module  | Responsibility                                          |
//! |---------|---------------------------------------------------------|
//! | `sweep` | load configuration, prompt for inputs, run and report   |

pub mod sweep;

pub use sweep::cmd_sweep;
