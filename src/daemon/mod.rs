pub mod checker;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod notifier;
pub mod vcs;
pub mod watcher;
