//! Wirecheck E2E Test Framework
//!
//! This crate provides a Rust-controlled HTTP assertion framework that:
//! - Optionally spawns the application under test as a subprocess
//! - Parses declarative YAML scenario suites
//! - Issues one HTTP request per scenario and evaluates assertions in order
//! - Writes a JSON result report and failure snapshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 HTTP Assertion Runner (Rust)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_scenario(scenario) -> Outcome                    │
//! │    ├── run_suites(suites) -> SuiteResult                    │
//! │    └── write_results(result) -> test-results.json           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteSpec (YAML)                                           │
//! │    ├── name, description, tags                              │
//! │    └── scenarios: [Scenario]                                │
//! │          ├── method, path, body?, expected_status?          │
//! │          └── assertions: [Assertion]                        │
//! │                ├── status_equals { status }                 │
//! │                ├── header_contains { name, value }          │
//! │                ├── body_has_property { path, equals? }      │
//! │                └── duration_less_than { ms }                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assert;
pub mod config;
pub mod error;
pub mod http;
pub mod outcome;
pub mod runner;
pub mod scenario;
pub mod server;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use outcome::{FailureKind, Outcome, SuiteResult};
pub use runner::SuiteRunner;
pub use scenario::{Assertion, Scenario, SuiteSpec};
