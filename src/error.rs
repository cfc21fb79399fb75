use std::path::PathBuf;

use crate::store::ThreadStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt status file {path}: {source} (fix or remove the file manually)")]
    CorruptState {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid status '{status}' (valid: {names})", status = .0, names = ThreadStatus::names().join(", "))]
    InvalidStatus(String),

    #[error("invalid thread id '{value}' for {platform} (expected {expected})")]
    InvalidThreadId {
        value: String,
        platform: &'static str,
        expected: &'static str,
    },

    #[error("usage error: {0}")]
    Usage(String),

    #[error("state error: {0}")]
    State(String),

    #[error("token error: {0}")]
    Token(String),

    #[error("source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, Error>;
