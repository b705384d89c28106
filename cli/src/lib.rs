pub mod commands;
pub mod config_watcher;
pub mod context;
pub mod daemon;
pub mod logging;

pub use context::CliContext;
