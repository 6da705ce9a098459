//! Error types for the assertion runner

use thiserror::Error;

/// Fatal runner errors. Per-scenario failures are not errors; they are
/// recorded in [`crate::outcome::Outcome`] and the suite keeps going.
#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Scenario spec parse error: {0}")]
    SpecParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
