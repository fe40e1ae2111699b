// src/check.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::client::LookupClient;
use crate::config::AppConfig;
use crate::curie::url_for_curie;
use crate::nameres::{self, ExpectedCurie};
use crate::nodenorm::{self, Conflations, ResolvedNode};
use crate::result::{ResultKind, TestResult};

/// The service a check has to be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    NodeNorm,
    NameRes,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::NodeNorm => write!(f, "NodeNorm"),
            Service::NameRes => write!(f, "NameRes"),
        }
    }
}

/// Base URLs of the NodeNorm and NameRes instances under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub nodenorm: String,
    pub nameres: String,
}

impl Endpoints {
    pub fn new(nodenorm: impl Into<String>, nameres: impl Into<String>) -> Self {
        Self {
            nodenorm: nodenorm.into(),
            nameres: nameres.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.nodenorm_url.clone(), config.nameres_url.clone())
    }
}

/// Lookup expectations are normalized with chemicals and drugs merged, the
/// way NameRes indexes them.
const EXPECTATION_CONFLATIONS: Conflations = Conflations {
    gene_protein: false,
    drug_chemical: true,
};

/// What a `Test` asserts, together with everything it needs to do so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// NodeNorm knows `id`.
    CheckId { id: String, conflations: Conflations },
    /// NodeNorm normalizes `query_id` to `preferred_id`.
    PreferredId {
        query_id: String,
        preferred_id: String,
        conflations: Conflations,
    },
    /// NodeNorm gives the cluster of `query_id` the label `preferred_label`.
    PreferredLabel {
        query_id: String,
        preferred_label: String,
        conflations: Conflations,
    },
    /// `id` and `other_id` end up in the same NodeNorm cluster.
    ClusterTogether {
        id: String,
        other_id: String,
        conflations: Conflations,
    },
    /// The cluster of `id` has `class` among its Biolink types, or lacks it if
    /// `class` starts with `!`.
    BiolinkClass {
        id: String,
        class: String,
        conflations: Conflations,
    },
    /// NodeNorm returns a record for `id`.
    Resolves { id: String, conflations: Conflations },
    /// NodeNorm returns null for `id`.
    DoesNotResolve { id: String, conflations: Conflations },
    /// Every one of `ids` resolves to an identical record.
    ResolveTogether { ids: Vec<String>, conflations: Conflations },
    /// NameRes finds something for `query`, and `expected_id` (once
    /// normalized) within the first `top_n` results if given.
    Lookup {
        query: String,
        expected_id: Option<String>,
        top_n: usize,
    },
    /// Always fails with `message`; stands in for a test that could not be
    /// built.
    Unfulfilled { service: Service, message: String },
}

impl Check {
    pub fn service(&self) -> Service {
        match self {
            Check::Lookup { .. } => Service::NameRes,
            Check::Unfulfilled { service, .. } => *service,
            _ => Service::NodeNorm,
        }
    }
}

/// A single check derived from a spreadsheet row or an issue, ready to be run
/// against an endpoint any number of times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub description: String,
    /// CURIEs mentioned by this test, mapped to pages describing them.
    pub related_urls: BTreeMap<String, String>,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub check: Check,
}

impl Test {
    pub fn new(description: impl Into<String>, check: Check) -> Self {
        Self {
            description: description.into(),
            related_urls: BTreeMap::new(),
            source: None,
            source_url: None,
            check,
        }
    }

    /// Links each CURIE to the page `url_for_curie` picks for it.
    pub fn with_related_curies<'a>(mut self, curies: impl IntoIterator<Item = &'a str>) -> Self {
        for curie in curies {
            self.related_urls.insert(curie.to_string(), url_for_curie(curie));
        }
        self
    }

    pub fn with_source(mut self, source: Option<&str>, source_url: Option<&str>) -> Self {
        self.source = source.map(str::to_string);
        self.source_url = source_url.map(str::to_string);
        self
    }

    pub fn service(&self) -> Service {
        self.check.service()
    }

    /// Runs the check against the services at `endpoints`.
    ///
    /// Every problem, from an unreachable endpoint to a mismatched identifier,
    /// comes back as a failed `TestResult`.
    pub async fn run<C: LookupClient>(&self, client: &C, endpoints: &Endpoints) -> TestResult {
        let nodenorm_url = endpoints.nodenorm.as_str();
        match &self.check {
            Check::CheckId { id, conflations } => {
                match nodenorm::get_normalized_node(client, nodenorm_url, id, *conflations).await {
                    Ok(found) => found.result,
                    Err(failure) => failure,
                }
            }
            Check::PreferredId {
                query_id,
                preferred_id,
                conflations,
            } => {
                let found = match nodenorm::get_normalized_node(client, nodenorm_url, query_id, *conflations).await {
                    Ok(found) => found,
                    Err(failure) => return failure,
                };
                let actual = found.node.preferred_id().unwrap_or("(none)");
                if actual == preferred_id && found.node.is_equivalent_to(query_id) {
                    TestResult::success(
                        format!("Query ID {} has preferred ID {}", query_id, preferred_id),
                        ResultKind::NodeNorm,
                        found.record,
                    )
                } else {
                    TestResult::failure(
                        format!("Query ID {} has preferred ID {}, not {}", query_id, actual, preferred_id),
                        ResultKind::NodeNorm,
                        found.record,
                    )
                }
            }
            Check::PreferredLabel {
                query_id,
                preferred_label,
                conflations,
            } => {
                let found = match nodenorm::get_normalized_node(client, nodenorm_url, query_id, *conflations).await {
                    Ok(found) => found,
                    Err(failure) => return failure,
                };
                let actual = found.node.preferred_label().unwrap_or("");
                if actual == preferred_label {
                    TestResult::success(
                        format!("Query ID {} has preferred label \"{}\"", query_id, preferred_label),
                        ResultKind::NodeNorm,
                        found.record,
                    )
                } else {
                    TestResult::failure(
                        format!(
                            "Query ID {} has preferred label \"{}\", not \"{}\"",
                            query_id, actual, preferred_label
                        ),
                        ResultKind::NodeNorm,
                        found.record,
                    )
                }
            }
            Check::ClusterTogether {
                id,
                other_id,
                conflations,
            } => {
                let found = match nodenorm::get_normalized_node(client, nodenorm_url, id, *conflations).await {
                    Ok(found) => found,
                    Err(failure) => return failure,
                };
                let preferred = found.node.preferred_id().unwrap_or("(none)");
                if found.node.is_equivalent_to(id) && found.node.is_equivalent_to(other_id) {
                    TestResult::success(
                        format!("ID {} and ID {} are both equivalent to {}.", id, other_id, preferred),
                        ResultKind::NodeNorm,
                        found.record,
                    )
                } else {
                    TestResult::failure(
                        format!("ID {} is equivalent to {} but ID {} is not.", id, preferred, other_id),
                        ResultKind::NodeNorm,
                        found.record,
                    )
                }
            }
            Check::BiolinkClass {
                id,
                class,
                conflations,
            } => {
                let found = match nodenorm::get_normalized_node(client, nodenorm_url, id, *conflations).await {
                    Ok(found) => found,
                    Err(failure) => return failure,
                };
                biolink_class_result(id, class, found)
            }
            Check::Resolves { id, conflations } => {
                match nodenorm::resolve_curie(client, nodenorm_url, id, *conflations).await {
                    Ok(Some(resolved)) => TestResult::success(
                        format!("Resolved {} to {}", id, resolved.node.summary()),
                        ResultKind::NodeNorm,
                        resolved.record,
                    ),
                    Ok(None) => TestResult::failure(
                        format!("Could not resolve {} with NodeNorm", id),
                        ResultKind::NodeNorm,
                        Value::Null,
                    ),
                    Err(failure) => failure,
                }
            }
            Check::DoesNotResolve { id, conflations } => {
                match nodenorm::resolve_curie(client, nodenorm_url, id, *conflations).await {
                    Ok(None) => TestResult::success(
                        format!("Could not resolve {} with NodeNorm, as expected", id),
                        ResultKind::NodeNorm,
                        Value::Null,
                    ),
                    Ok(Some(resolved)) => TestResult::failure(
                        format!(
                            "Resolved {} to {}, but expected it not to resolve",
                            id,
                            resolved.node.summary()
                        ),
                        ResultKind::NodeNorm,
                        resolved.record,
                    ),
                    Err(failure) => failure,
                }
            }
            Check::ResolveTogether { ids, conflations } => {
                let mut resolved = Vec::with_capacity(ids.len());
                for id in ids {
                    match nodenorm::resolve_curie(client, nodenorm_url, id, *conflations).await {
                        Ok(node) => resolved.push((id.as_str(), node)),
                        Err(failure) => return failure,
                    }
                }
                resolve_together_result(ids, &resolved)
            }
            Check::Lookup {
                query,
                expected_id,
                top_n,
            } => {
                let expected = match expected_id {
                    Some(curie) => match normalize_expectation(client, nodenorm_url, curie).await {
                        Ok(expected) => Some(expected),
                        Err(failure) => return failure,
                    },
                    None => None,
                };
                match nameres::lookup(client, &endpoints.nameres, query, top_n.saturating_mul(2)).await {
                    Ok(results) => nameres::evaluate_lookup(query, results, expected.as_ref(), *top_n),
                    Err(failure) => failure,
                }
            }
            Check::Unfulfilled { message, .. } => TestResult::failed(message.clone()),
        }
    }
}

/// Normalizes the CURIE a lookup is expected to find, so that a sheet may name
/// any identifier in the cluster.
async fn normalize_expectation<C: LookupClient>(
    client: &C,
    nodenorm_url: &str,
    curie: &str,
) -> Result<ExpectedCurie, TestResult> {
    let unable = |payload: Value| {
        TestResult::failure(format!("Unable to normalize CURIE {}", curie), ResultKind::Text, payload)
    };
    let resolved = match nodenorm::resolve_curie(client, nodenorm_url, curie, EXPECTATION_CONFLATIONS).await {
        Ok(Some(resolved)) => resolved,
        Ok(None) => return Err(unable(Value::Null)),
        Err(failure) => return Err(unable(Value::String(failure.message))),
    };
    let Some(normalized) = resolved.node.preferred_id() else {
        return Err(unable(resolved.record));
    };
    Ok(ExpectedCurie {
        curie: curie.to_string(),
        normalized: normalized.to_string(),
        label: resolved.node.preferred_label().map(str::to_string),
    })
}

fn resolve_together_result(ids: &[String], resolved: &[(&str, Option<ResolvedNode>)]) -> TestResult {
    let Some(reference) = resolved.iter().find_map(|(_, node)| node.as_ref()) else {
        return TestResult::failure(
            format!("None of the CURIEs {} could be resolved", ids.join(", ")),
            ResultKind::NodeNorm,
            Value::Null,
        );
    };

    for (id, node) in resolved {
        match node {
            None => {
                return TestResult::failure(
                    format!(
                        "CURIE {} could not be resolved, and so is not equal to {}",
                        id,
                        reference.node.summary()
                    ),
                    ResultKind::NodeNorm,
                    reference.record.clone(),
                );
            }
            Some(node) if node.record != reference.record => {
                return TestResult::failure(
                    format!(
                        "Resolved {} to {}, but expected {}",
                        id,
                        node.node.summary(),
                        reference.node.summary()
                    ),
                    ResultKind::NodeNorm,
                    node.record.clone(),
                );
            }
            Some(_) => {}
        }
    }

    TestResult::success(
        format!("{} all resolved to {}", ids.join(", "), reference.node.summary()),
        ResultKind::NodeNorm,
        reference.record.clone(),
    )
}

fn biolink_class_result(id: &str, class: &str, found: nodenorm::FoundNode) -> TestResult {
    if let Some(excluded) = class.strip_prefix('!') {
        if found.node.has_type(excluded) {
            TestResult::failure(
                format!("ID {} should not have Biolink class {} but does", id, excluded),
                ResultKind::NodeNorm,
                found.record,
            )
        } else {
            TestResult::success(
                format!("ID {} does not have Biolink class {} as expected", id, excluded),
                ResultKind::NodeNorm,
                found.record,
            )
        }
    } else if found.node.has_type(class) {
        TestResult::success(
            format!("ID {} has Biolink class {}", id, class),
            ResultKind::NodeNorm,
            found.record,
        )
    } else {
        TestResult::failure(
            format!("ID {} does not have Biolink class {}", id, class),
            ResultKind::NodeNorm,
            found.record,
        )
    }
}
