use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("command failed: {command} ({status}) - {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },
    #[error("config error: could not load config file '{path}' - {source}")]
    Config { path: String, source: std::io::Error },
    #[error("scan interval must be at least one second")]
    InvalidInterval,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("task join error: {0}")]
    Join(#[from] JoinError),
}
