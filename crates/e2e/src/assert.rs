//! Assertion evaluation
//!
//! Small dispatch over the declarative assertion kinds. Every failure
//! carries an expected-vs-actual pair for the report.

use serde_json::Value;

use crate::http::Response;
use crate::outcome::ScenarioFailure;
use crate::scenario::Assertion;

/// Evaluate one assertion against a response.
pub fn evaluate(assertion: &Assertion, response: &Response) -> Result<(), ScenarioFailure> {
    match assertion {
        Assertion::StatusEquals { status } => {
            if response.status == *status {
                Ok(())
            } else {
                Err(fail(assertion, status.to_string(), response.status.to_string()))
            }
        }
        Assertion::HeaderContains { name, value } => match response.header(name) {
            Some(actual) if actual.contains(value.as_str()) => Ok(()),
            Some(actual) => Err(fail(
                assertion,
                format!("a value containing `{value}`"),
                format!("`{actual}`"),
            )),
            None => Err(fail(
                assertion,
                format!("header `{name}` to be present"),
                "header absent".to_string(),
            )),
        },
        Assertion::BodyHasProperty { path, equals } => {
            match (lookup(&response.body, path), equals) {
                (Some(_), None) => Ok(()),
                (Some(actual), Some(expected)) if actual == expected => Ok(()),
                (Some(actual), Some(expected)) => {
                    Err(fail(assertion, expected.to_string(), actual.to_string()))
                }
                (None, expected) => Err(fail(
                    assertion,
                    match expected {
                        Some(v) => format!("property `{path}` == {v}"),
                        None => format!("property `{path}` to be present"),
                    },
                    "property absent".to_string(),
                )),
            }
        }
        Assertion::DurationLessThan { ms } => {
            if response.duration_ms < *ms {
                Ok(())
            } else {
                Err(fail(
                    assertion,
                    format!("< {ms} ms"),
                    format!("{} ms", response.duration_ms),
                ))
            }
        }
    }
}

fn fail(assertion: &Assertion, expected: String, actual: String) -> ScenarioFailure {
    ScenarioFailure::assertion(assertion.describe(), expected, actual)
}

/// Resolve a dot/bracket path (`user.roles[0].name`) inside a JSON value.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        let (key, indices) = split_indices(segment)?;
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for index in indices {
            current = current.get(index)?;
        }
    }
    Some(current)
}

/// Split `roles[0][1]` into `("roles", [0, 1])`.
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    match segment.find('[') {
        None => Some((segment, Vec::new())),
        Some(pos) => {
            let key = &segment[..pos];
            let mut indices = Vec::new();
            let mut rest = &segment[pos..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let end = stripped.find(']')?;
                indices.push(stripped[..end].parse().ok()?);
                rest = &stripped[end + 1..];
            }
            if rest.is_empty() {
                Some((key, indices))
            } else {
                None
            }
        }
    }
}
