//! Request execution - one HTTP call per scenario

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::outcome::{FailureKind, ScenarioFailure};
use crate::scenario::Scenario;

/// Everything a scenario's assertions can see about the response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Header names lowercased; repeated headers joined with ", "
    pub headers: HashMap<String, String>,
    /// Parsed JSON body; `Null` when the body was empty
    pub body: serde_json::Value,
    pub duration_ms: u64,
    pub body_bytes: usize,
}

impl Response {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Issue the scenario's request and capture the response. `command_budget`
/// bounds the whole exchange; the client's own connect/read timeouts apply
/// underneath it.
pub async fn execute(
    client: &reqwest::Client,
    base_url: &str,
    scenario: &Scenario,
    command_budget: Duration,
) -> Result<Response, ScenarioFailure> {
    match tokio::time::timeout(command_budget, send(client, base_url, scenario)).await {
        Ok(result) => result,
        Err(_) => Err(ScenarioFailure::request(
            FailureKind::Timeout,
            format!("response within {} ms", command_budget.as_millis()),
            "no response".to_string(),
        )),
    }
}

async fn send(
    client: &reqwest::Client,
    base_url: &str,
    scenario: &Scenario,
) -> Result<Response, ScenarioFailure> {
    let url = join_url(base_url, &scenario.path)?;

    let mut req_builder = client.request(scenario.method.into(), url);
    if let Some(body) = &scenario.body {
        req_builder = req_builder.json(body);
    }

    let started = Instant::now();
    let response = req_builder.send().await.map_err(classify)?;
    let status = response.status().as_u16();
    let headers = collect_headers(response.headers());
    let bytes = response.bytes().await.map_err(classify)?;
    let duration_ms = started.elapsed().as_millis() as u64;

    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|e| {
            ScenarioFailure::request(
                FailureKind::MalformedBody,
                "a JSON response body".to_string(),
                format!("unparseable body ({e})"),
            )
        })?
    };

    Ok(Response {
        status,
        headers,
        body,
        duration_ms,
        body_bytes: bytes.len(),
    })
}

fn join_url(base_url: &str, path: &str) -> Result<reqwest::Url, ScenarioFailure> {
    let base = reqwest::Url::parse(base_url).map_err(|e| {
        ScenarioFailure::request(
            FailureKind::ConnectionError,
            "a valid base URL".to_string(),
            format!("`{base_url}` ({e})"),
        )
    })?;
    base.join(path).map_err(|e| {
        ScenarioFailure::request(
            FailureKind::ConnectionError,
            "a valid request path".to_string(),
            format!("`{path}` ({e})"),
        )
    })
}

fn classify(error: reqwest::Error) -> ScenarioFailure {
    if error.is_timeout() {
        ScenarioFailure::request(
            FailureKind::Timeout,
            "a response before the client timeout".to_string(),
            format!("{error}"),
        )
    } else {
        ScenarioFailure::request(
            FailureKind::ConnectionError,
            "a reachable server".to_string(),
            format!("{error}"),
        )
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<binary>");
        map.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

    #[test]
    fn test_collect_headers_lowercases_names() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let map = collect_headers(&headers);
        assert_eq!(map.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn test_collect_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let map = collect_headers(&headers);
        assert_eq!(map.get("set-cookie").unwrap(), "a=1, b=2");
    }

    #[test]
    fn test_join_url_rejects_garbage_base() {
        let err = join_url("not a url", "/health").unwrap_err();
        assert_eq!(err.kind, FailureKind::ConnectionError);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = Response {
            status: 200,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: serde_json::Value::Null,
            duration_ms: 1,
            body_bytes: 0,
        };
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }
}
