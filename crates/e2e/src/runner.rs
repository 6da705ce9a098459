//! Main runner that executes scenario suites sequentially

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::assert;
use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};
use crate::http::{self, Response};
use crate::outcome::{FailureKind, Outcome, ScenarioFailure, SuiteResult};
use crate::scenario::{Scenario, SuiteSpec};
use crate::server::ServerHandle;

/// Runs scenarios one at a time against a single base URL. No shared state
/// between scenarios; a failure is recorded and the queue moves on.
pub struct SuiteRunner {
    config: RunnerConfig,
    client: reqwest::Client,
    server: Option<ServerHandle>,
}

impl SuiteRunner {
    /// Build a runner. Rejects configs no scenario could run under.
    pub fn new(config: RunnerConfig) -> E2eResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.request_timeout_ms))
            .timeout(Duration::from_millis(config.response_timeout_ms))
            .build()?;

        Ok(Self {
            config,
            client,
            server: None,
        })
    }

    /// Spawn the managed application under test, if one is configured, and
    /// point the runner at it.
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }
        let Some(server_config) = self.config.server.clone() else {
            return Ok(()); // External server expected at base_url
        };

        let server = ServerHandle::spawn(server_config).await?;
        self.config.base_url = server.base_url().to_string();
        self.server = Some(server);
        Ok(())
    }

    /// Stop the managed server.
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Run every suite in the specs directory.
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        let suites = SuiteSpec::load_all(&self.config.specs_dir)?;
        self.run_suites(&suites).await
    }

    /// Run suites carrying a tag.
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<SuiteResult> {
        let suites = SuiteSpec::load_all(&self.config.specs_dir)?;
        let filtered: Vec<SuiteSpec> = SuiteSpec::filter_by_tag(&suites, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_suites(&filtered).await
    }

    /// Run a single scenario by name, searching every suite.
    pub async fn run_scenario_named(&mut self, name: &str) -> E2eResult<Outcome> {
        let suites = SuiteSpec::load_all(&self.config.specs_dir)?;
        let scenario = suites
            .into_iter()
            .flat_map(|s| s.scenarios)
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Scenario not found: {name}")))?;

        self.start_server().await?;
        Ok(self.run_scenario(&scenario).await)
    }

    /// Run a list of suites sequentially. A suite deadline, when configured,
    /// skips whatever is still queued; completed outcomes are preserved.
    pub async fn run_suites(&mut self, suites: &[SuiteSpec]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        let deadline = self
            .config
            .suite_timeout_ms
            .map(|ms| start + Duration::from_millis(ms));

        self.start_server().await?;

        let total: usize = suites.iter().map(|s| s.scenarios.len()).sum();
        info!("Running {} scenario(s) across {} suite(s)...", total, suites.len());

        let mut outcomes = Vec::new();
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        'suites: for suite in suites {
            debug!("Suite: {}", suite.name);
            for scenario in &suite.scenarios {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        skipped = total - outcomes.len();
                        warn!(
                            "Suite deadline reached, skipping {} remaining scenario(s)",
                            skipped
                        );
                        break 'suites;
                    }
                }

                let outcome = self.run_scenario(scenario).await;
                if outcome.passed {
                    passed += 1;
                    info!("✓ {} ({} ms)", outcome.scenario, outcome.duration_ms);
                } else {
                    failed += 1;
                    let message = outcome
                        .failure
                        .as_ref()
                        .map(|f| f.message.as_str())
                        .unwrap_or("unknown failure");
                    error!("✗ {} - {}", outcome.scenario, message);
                }
                outcomes.push(outcome);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(SuiteResult {
            total,
            passed,
            failed,
            skipped,
            duration_ms,
            outcomes,
        })
    }

    /// Run one scenario: request, status gate, then assertions in
    /// declaration order, stopping at the first that fails.
    pub async fn run_scenario(&self, scenario: &Scenario) -> Outcome {
        let start = Instant::now();
        debug!("Running scenario: {} {} {}", scenario.name, scenario.method, scenario.path);

        let budget = Duration::from_millis(self.config.default_command_timeout_ms);
        let response =
            match http::execute(&self.client, &self.config.base_url, scenario, budget).await {
                Ok(response) => response,
                Err(failure) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    self.snapshot(scenario, &failure, None);
                    return Outcome::failed(&scenario.name, duration_ms, failure);
                }
            };

        let failure = status_gate(scenario, &response).or_else(|| {
            scenario
                .assertions
                .iter()
                .find_map(|a| assert::evaluate(a, &response).err())
        });

        let duration_ms = start.elapsed().as_millis() as u64;
        match failure {
            None => Outcome::passed(&scenario.name, duration_ms),
            Some(failure) => {
                self.snapshot(scenario, &failure, Some(&response));
                Outcome::failed(&scenario.name, duration_ms, failure)
            }
        }
    }

    /// Write the failing scenario's response to `output_dir/snapshots`.
    fn snapshot(&self, scenario: &Scenario, failure: &ScenarioFailure, response: Option<&Response>) {
        if !self.config.snapshot_on_failure {
            return;
        }

        let snapshot = serde_json::json!({
            "scenario": scenario.name,
            "request": {
                "method": scenario.method.to_string(),
                "path": scenario.path,
            },
            "failure": failure,
            "response": response.map(|r| serde_json::json!({
                "status": r.status,
                "headers": r.headers,
                "body": r.body,
                "body_bytes": r.body_bytes,
                "duration_ms": r.duration_ms,
            })),
        });

        let dir = self.config.output_dir.join("snapshots");
        let path = dir.join(format!("{}.json", sanitize(&scenario.name)));
        let write = std::fs::create_dir_all(&dir).and_then(|_| {
            std::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap_or_default())
        });
        match write {
            Ok(()) => debug!("Snapshot written to {}", path.display()),
            Err(e) => warn!("Failed to write snapshot {}: {}", path.display(), e),
        }
    }

    /// Write the suite result report as JSON.
    pub fn write_results(&self, result: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Base URL the runner is currently pointed at.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

impl Drop for SuiteRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Status check that runs before any declared assertion: an explicit
/// `expected_status` takes precedence over the default 2xx gate.
fn status_gate(scenario: &Scenario, response: &Response) -> Option<ScenarioFailure> {
    match scenario.expected_status {
        Some(expected) if response.status != expected => Some(ScenarioFailure::request(
            FailureKind::UnexpectedStatus,
            format!("status {expected}"),
            format!("status {}", response.status),
        )),
        Some(_) => None,
        None if scenario.fail_on_status_code && !(200..300).contains(&response.status) => {
            Some(ScenarioFailure::request(
                FailureKind::UnexpectedStatus,
                "a 2xx status".to_string(),
                format!("status {}", response.status),
            ))
        }
        None => None,
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Method;
    use std::collections::HashMap;

    fn scenario(expected_status: Option<u16>, fail_on_status_code: bool) -> Scenario {
        Scenario {
            name: "gate".to_string(),
            description: String::new(),
            method: Method::Get,
            path: "/".to_string(),
            body: None,
            expected_status,
            fail_on_status_code,
            assertions: vec![],
        }
    }

    fn response(status: u16) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: serde_json::Value::Null,
            duration_ms: 1,
            body_bytes: 0,
        }
    }

    #[test]
    fn test_status_gate_defaults_to_2xx() {
        assert!(status_gate(&scenario(None, true), &response(204)).is_none());
        let failure = status_gate(&scenario(None, true), &response(404)).unwrap();
        assert_eq!(failure.kind, FailureKind::UnexpectedStatus);
    }

    #[test]
    fn test_status_gate_disabled() {
        assert!(status_gate(&scenario(None, false), &response(500)).is_none());
    }

    #[test]
    fn test_status_gate_exact_expectation_wins() {
        // An explicit non-2xx expectation passes the gate
        assert!(status_gate(&scenario(Some(404), true), &response(404)).is_none());
        let failure = status_gate(&scenario(Some(404), true), &response(200)).unwrap();
        assert_eq!(failure.expected, "status 404");
    }

    #[test]
    fn test_sanitize_snapshot_names() {
        assert_eq!(sanitize("health/is healthy"), "health-is-healthy");
        assert_eq!(sanitize("api_info-fields"), "api_info-fields");
    }
}
