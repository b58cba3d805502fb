use thiserror::Error;

#[derive(Error, Debug)]
pub enum GoCdError {
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid time format \"{0}\", expected HH:MM or HH:MM:SS")]
    InvalidTimeFormat(String),

    #[error("{0}")]
    AssertionViolation(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown command \"{0}\", run without arguments to list commands")]
    UnknownCommand(String),

    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, GoCdError>;
