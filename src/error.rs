//! Host error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] reptrack::ConfigError),

    #[error("state file decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("state file encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid value: {0:?}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, Error>;
