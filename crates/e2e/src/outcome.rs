//! Scenario and suite results

use serde::{Deserialize, Serialize};

/// Why a scenario failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Could not connect or the connection dropped mid-request
    ConnectionError,
    /// No complete response within the configured budget
    Timeout,
    /// Non-2xx status (or mismatch with the scenario's expected status)
    UnexpectedStatus,
    /// Response body was not valid JSON
    MalformedBody,
    /// A declared assertion did not hold
    AssertionFailure,
}

/// Diagnostic for a failed scenario. At most one per scenario: evaluation
/// stops at the first assertion that does not hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFailure {
    pub kind: FailureKind,
    /// Description of the failed assertion, when the failure is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl ScenarioFailure {
    pub fn assertion(description: String, expected: String, actual: String) -> Self {
        let message = format!("{description}: expected {expected}, got {actual}");
        Self {
            kind: FailureKind::AssertionFailure,
            assertion: Some(description),
            expected,
            actual,
            message,
        }
    }

    pub fn request(kind: FailureKind, expected: String, actual: String) -> Self {
        let message = format!("expected {expected}, got {actual}");
        Self {
            kind,
            assertion: None,
            expected,
            actual,
            message,
        }
    }
}

/// Result of running a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub scenario: String,
    pub passed: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ScenarioFailure>,
}

impl Outcome {
    pub fn passed(scenario: &str, duration_ms: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            passed: true,
            duration_ms,
            failure: None,
        }
    }

    pub fn failed(scenario: &str, duration_ms: u64, failure: ScenarioFailure) -> Self {
        Self {
            scenario: scenario.to_string(),
            passed: false,
            duration_ms,
            failure: Some(failure),
        }
    }
}

/// Result of running every queued scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Scenarios still queued when the suite deadline elapsed
    pub skipped: usize,
    pub duration_ms: u64,
    pub outcomes: Vec<Outcome>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}
