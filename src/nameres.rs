// src/nameres.rs
use serde_json::{Map, Value, json};
use std::fmt;

use crate::client::{LookupClient, endpoint_url};
use crate::result::{ResultKind, TestResult};

const LOOKUP: &str = "lookup";

/// Converts the legacy `/lookup` response, an object mapping each CURIE to its
/// synonyms, into the current list-of-results format.
///
/// Results keep the key order of the response. Each synonym list is sorted by
/// ascending length, keeping the response order between synonyms of equal
/// length.
pub fn convert_legacy_format(response: &Map<String, Value>) -> Vec<Value> {
    response
        .iter()
        .map(|(curie, synonyms)| {
            let mut synonyms: Vec<&str> = synonyms
                .as_array()
                .map(|values| values.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            // Length in UTF-16 code units, as NameRes clients measure it.
            synonyms.sort_by_key(|s| s.encode_utf16().count());
            json!({ "curie": curie, "synonyms": synonyms })
        })
        .collect()
}

/// Accepts either response format from `/lookup` and returns the results in
/// the current format.
pub fn interpret_lookup(response: Value) -> Result<Vec<Value>, TestResult> {
    match response {
        Value::Array(results) => Ok(results),
        Value::Object(legacy) => Ok(convert_legacy_format(&legacy)),
        other => Err(TestResult::failure(
            "NameRes /lookup returned an unexpected response",
            ResultKind::Json,
            other,
        )),
    }
}

/// The CURIE of each lookup result, in rank order.
pub fn result_curies(results: &[Value]) -> Vec<&str> {
    results
        .iter()
        .filter_map(|result| result.get("curie").and_then(Value::as_str))
        .collect()
}

/// Runs `POST {endpoint}/lookup?string=...&limit=...&autocomplete=false`.
pub async fn lookup<C: LookupClient>(
    client: &C,
    endpoint: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<Value>, TestResult> {
    let mut url = endpoint_url(endpoint, LOOKUP)
        .map_err(|e| TestResult::failure(e, ResultKind::Text, Value::Null))?;
    url.query_pairs_mut()
        .append_pair("string", query)
        .append_pair("limit", &limit.to_string())
        .append_pair("autocomplete", "false");

    let reply = client.post(url).await.map_err(|e| {
        TestResult::failure(
            format!("Could not submit request to NameRes /lookup: {}", e),
            ResultKind::Text,
            Value::Null,
        )
    })?;

    if !reply.is_success() {
        return Err(TestResult::failure(
            "Could not submit request to NameRes /lookup",
            ResultKind::Text,
            Value::String(format!("{} {}", reply.status, reply.status_text)),
        ));
    }

    let response: Value = serde_json::from_str(&reply.body).map_err(|e| {
        TestResult::failure(
            format!("NameRes /lookup returned a non-JSON result: {}", e),
            ResultKind::Text,
            Value::String(reply.body.clone()),
        )
    })?;

    interpret_lookup(response)
}

/// The CURIE a lookup should find, as written and as NodeNorm normalizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedCurie {
    pub curie: String,
    pub normalized: String,
    pub label: Option<String>,
}

impl ExpectedCurie {
    /// An expectation that is already the preferred identifier.
    pub fn exact(curie: impl Into<String>) -> Self {
        let curie = curie.into();
        Self {
            normalized: curie.clone(),
            curie,
            label: None,
        }
    }
}

impl fmt::Display for ExpectedCurie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.curie == self.normalized {
            write!(f, "{}", self.curie)
        } else {
            write!(
                f,
                "{} (normalized to {} \"{}\")",
                self.curie,
                self.normalized,
                self.label.as_deref().unwrap_or("")
            )
        }
    }
}

/// Checks the outcome of looking up `query`.
///
/// With an expectation the check passes only if its normalized CURIE is
/// ranked within the first `top_n` results; without one it passes if anything
/// was found.
pub fn evaluate_lookup(
    query: &str,
    results: Vec<Value>,
    expected: Option<&ExpectedCurie>,
    top_n: usize,
) -> TestResult {
    let curies = result_curies(&results);

    let Some(expected) = expected else {
        return match curies.first() {
            Some(top) => {
                let message = format!(
                    "NameRes /lookup returned {} results for \"{}\" (top hit {})",
                    results.len(),
                    query,
                    top
                );
                TestResult::success(message, ResultKind::NameRes, Value::Array(results))
            }
            None => TestResult::failure(
                format!("NameRes /lookup returned no results for \"{}\"", query),
                ResultKind::NameRes,
                Value::Array(results),
            ),
        };
    };

    match curies.iter().position(|curie| *curie == expected.normalized) {
        Some(index) if index < top_n => TestResult::success(
            format!(
                "Expected {} found at position {} when looking up \"{}\"",
                expected,
                index + 1,
                query
            ),
            ResultKind::NameRes,
            Value::Array(results),
        ),
        Some(index) => TestResult::failure(
            format!(
                "Expected {} found at position {} when looking up \"{}\", outside the top {}",
                expected,
                index + 1,
                query,
                top_n
            ),
            ResultKind::NameRes,
            Value::Array(results),
        ),
        None => TestResult::failure(
            format!(
                "Expected {} not found among {} results when looking up \"{}\"",
                expected,
                results.len(),
                query
            ),
            ResultKind::NameRes,
            Value::Array(results),
        ),
    }
}
