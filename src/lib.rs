pub mod config;
pub mod errors;
pub mod github;
pub mod logging;
pub mod logs;
pub mod orchestrator;
pub mod provision;
pub mod sweep;
pub mod ui;
