//! Declarative YAML scenario suites

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// A suite of scenarios parsed from one YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    /// Unique name for this suite
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering suites
    #[serde(default)]
    pub tags: Vec<String>,

    /// Scenarios to run in order
    pub scenarios: Vec<Scenario>,
}

/// One named HTTP request plus its assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Request method
    #[serde(default)]
    pub method: Method,

    /// Path relative to the runner's base URL
    pub path: String,

    /// Optional JSON request body
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// Exact expected status. When set it replaces the 2xx check.
    #[serde(default)]
    pub expected_status: Option<u16>,

    /// Fail on non-2xx status when no `expected_status` is given.
    #[serde(default = "default_fail_on_status")]
    pub fail_on_status_code: bool,

    /// Assertions evaluated in declaration order against the response
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

fn default_fail_on_status() -> bool {
    true
}

/// HTTP request method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        };
        write!(f, "{label}")
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// A single declarative check against a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Assertion {
    /// Response status equals the given code
    StatusEquals { status: u16 },

    /// Header `name` is present and its value contains `value`
    HeaderContains { name: String, value: String },

    /// JSON body has a property at `path` (dot/bracket notation), optionally
    /// equal to `equals`
    BodyHasProperty {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        equals: Option<serde_json::Value>,
    },

    /// Response arrived in under `ms` milliseconds
    DurationLessThan { ms: u64 },
}

impl Assertion {
    /// Short description used in diagnostics and reports.
    pub fn describe(&self) -> String {
        match self {
            Assertion::StatusEquals { status } => format!("status == {status}"),
            Assertion::HeaderContains { name, value } => {
                format!("header `{name}` contains `{value}`")
            }
            Assertion::BodyHasProperty { path, equals: None } => {
                format!("body has property `{path}`")
            }
            Assertion::BodyHasProperty {
                path,
                equals: Some(expected),
            } => format!("body property `{path}` == {expected}"),
            Assertion::DurationLessThan { ms } => format!("duration < {ms} ms"),
        }
    }
}

impl SuiteSpec {
    /// Parse a suite from a YAML string.
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a suite from a YAML file.
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all suites from a directory, sorted by file name so runs are
    /// deterministic.
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        paths.sort();

        let mut suites = Vec::new();
        for path in paths {
            let suite = Self::from_file(&path).map_err(|e| {
                E2eError::SpecParse(format!("{}: {e}", path.display()))
            })?;
            suites.push(suite);
        }

        Ok(suites)
    }

    /// Filter suites by tag.
    pub fn filter_by_tag<'a>(suites: &'a [Self], tag: &str) -> Vec<&'a Self> {
        suites
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}
