//! Runner configuration
//!
//! One explicit immutable struct passed into [`crate::SuiteRunner`] at
//! construction. Loadable from a YAML file, overridable by the harness CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};
use crate::server::ServerConfig;

/// Runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Base URL of the application under test.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Overall per-scenario budget, request through parsed body.
    #[serde(default = "default_timeout_ms")]
    pub default_command_timeout_ms: u64,

    /// Budget for establishing the connection and sending the request.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Budget for receiving the full response.
    #[serde(default = "default_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Accepted for parity with the original runner config; a request-only
    /// suite records nothing.
    #[serde(default)]
    pub video: bool,

    /// Write the failing scenario's response as a JSON snapshot under
    /// `output_dir/snapshots`.
    #[serde(default = "default_true")]
    pub snapshot_on_failure: bool,

    /// Directory of YAML scenario suites.
    #[serde(default = "default_specs_dir")]
    pub specs_dir: PathBuf,

    /// Directory for the result report and snapshots.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Optional deadline for the whole run; scenarios still queued when it
    /// elapses are skipped, completed outcomes are kept.
    #[serde(default)]
    pub suite_timeout_ms: Option<u64>,

    /// Spawn and manage the application under test. When `None` the runner
    /// expects something to already be listening at `base_url`.
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from("tests/e2e/specs")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("test-results")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_command_timeout_ms: default_timeout_ms(),
            request_timeout_ms: default_timeout_ms(),
            response_timeout_ms: default_timeout_ms(),
            video: false,
            snapshot_on_failure: true,
            specs_dir: default_specs_dir(),
            output_dir: default_output_dir(),
            suite_timeout_ms: None,
            server: None,
        }
    }
}

impl RunnerConfig {
    /// Parse a config from YAML.
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a YAML file.
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject configs no scenario could run under. Called before any
    /// request is issued; a bad config aborts the whole run.
    pub fn validate(&self) -> E2eResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(E2eError::InvalidConfig("base_url is empty".to_string()));
        }
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| E2eError::InvalidConfig(format!("base_url: {e}")))?;

        for (name, value) in [
            ("default_command_timeout_ms", self.default_command_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("response_timeout_ms", self.response_timeout_ms),
        ] {
            if value == 0 {
                return Err(E2eError::InvalidConfig(format!("{name} must be > 0")));
            }
        }

        if self.suite_timeout_ms == Some(0) {
            return Err(E2eError::InvalidConfig(
                "suite_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}
