// src/nodenorm.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{LookupClient, endpoint_url};
use crate::result::{ResultKind, TestResult};

const GET_NORMALIZED_NODES: &str = "get_normalized_nodes";

/// Optional merges NodeNorm can apply when normalizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conflations {
    /// Sent as `conflate=true`.
    pub gene_protein: bool,
    /// Sent as `drug_chemical_conflate=true`.
    pub drug_chemical: bool,
}

impl Conflations {
    /// Reads the values of a `Conflations` cell. Unrecognised names are logged
    /// and ignored.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut conflations = Self::default();
        for name in names {
            match name.as_ref() {
                "gene_protein" => conflations.gene_protein = true,
                "drug_chemical" => conflations.drug_chemical = true,
                other => log::warn!("Ignoring unknown conflation '{}'", other),
            }
        }
        conflations
    }

    fn query_params(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = Vec::new();
        if self.gene_protein {
            params.push(("conflate", "true"));
        }
        if self.drug_chemical {
            params.push(("drug_chemical_conflate", "true"));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Identifier {
    pub identifier: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// The cluster record NodeNorm returns for one CURIE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NormalizedNode {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default, rename = "type")]
    pub types: Vec<String>,
    #[serde(default)]
    pub equivalent_identifiers: Vec<Identifier>,
}

impl NormalizedNode {
    pub fn preferred_id(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.identifier.as_str())
    }

    pub fn preferred_label(&self) -> Option<&str> {
        self.id.as_ref().and_then(|id| id.label.as_deref())
    }

    pub fn is_equivalent_to(&self, curie: &str) -> bool {
        self.equivalent_identifiers.iter().any(|e| e.identifier == curie)
    }

    pub fn has_type(&self, biolink_class: &str) -> bool {
        self.types.iter().any(|t| t == biolink_class)
    }

    /// `CHEBI:15377 (biolink:SmallMolecule, "Water")`
    pub fn summary(&self) -> String {
        format!(
            "{} ({}, \"{}\")",
            self.preferred_id().unwrap_or("(none)"),
            self.types.first().map(String::as_str).unwrap_or("(no type)"),
            self.preferred_label().unwrap_or("")
        )
    }
}

/// Whatever NodeNorm returned for a CURIE, listed in its cluster or not.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub node: NormalizedNode,
    pub record: Value,
}

/// A CURIE that NodeNorm knows about, along with the raw record for reports.
#[derive(Debug, Clone)]
pub struct FoundNode {
    pub node: NormalizedNode,
    pub record: Value,
    /// The success result a plain existence check reports.
    pub result: TestResult,
}

/// Looks `curie` up with `GET {endpoint}/get_normalized_nodes?curie=...`.
///
/// Returns the failure result to report if the call fails or NodeNorm does
/// not list `curie` among the equivalent identifiers of its cluster.
pub async fn get_normalized_node<C: LookupClient>(
    client: &C,
    endpoint: &str,
    curie: &str,
    conflations: Conflations,
) -> Result<FoundNode, TestResult> {
    let results = fetch_normalized_nodes(client, endpoint, curie, conflations).await?;
    interpret_normalized_nodes(curie, &results)
}

/// Looks `curie` up like `get_normalized_node`, but treats a null record as an
/// answer rather than a failure and does not require `curie` to be listed in
/// its own cluster.
pub async fn resolve_curie<C: LookupClient>(
    client: &C,
    endpoint: &str,
    curie: &str,
    conflations: Conflations,
) -> Result<Option<ResolvedNode>, TestResult> {
    let results = fetch_normalized_nodes(client, endpoint, curie, conflations).await?;
    let Some(record) = record_for(curie, &results)? else {
        return Ok(None);
    };
    let node = read_record(curie, record)?;
    Ok(Some(ResolvedNode {
        node,
        record: record.clone(),
    }))
}

/// Sends the `get_normalized_nodes` request for `curie` and parses the body.
pub async fn fetch_normalized_nodes<C: LookupClient>(
    client: &C,
    endpoint: &str,
    curie: &str,
    conflations: Conflations,
) -> Result<Value, TestResult> {
    let mut url = endpoint_url(endpoint, GET_NORMALIZED_NODES)
        .map_err(|e| TestResult::failure(e, ResultKind::Text, Value::Null))?;
    url.query_pairs_mut()
        .append_pair("curie", curie)
        .extend_pairs(conflations.query_params());

    let reply = client.get(url).await.map_err(|e| {
        TestResult::failure(
            format!("Could not get_normalized_nodes: {}", e),
            ResultKind::Text,
            Value::Null,
        )
    })?;

    if !reply.is_success() {
        return Err(TestResult::failure(
            "Could not get_normalized_nodes",
            ResultKind::Text,
            Value::String(format!("{} {}", reply.status, reply.status_text)),
        ));
    }

    serde_json::from_str(&reply.body).map_err(|e| {
        TestResult::failure(
            format!("NodeNorm /get_normalized_nodes returned a non-JSON result: {}", e),
            ResultKind::Text,
            Value::String(reply.body.clone()),
        )
    })
}

/// The record for `curie` in a `get_normalized_nodes` response, `None` if it
/// is null or missing.
pub fn record_for<'a>(curie: &str, results: &'a Value) -> Result<Option<&'a Value>, TestResult> {
    let Some(by_curie) = results.as_object() else {
        return Err(TestResult::failure(
            "get_normalized_nodes returned invalid response",
            ResultKind::Text,
            results.clone(),
        ));
    };
    Ok(by_curie.get(curie).filter(|record| !record.is_null()))
}

fn read_record(curie: &str, record: &Value) -> Result<NormalizedNode, TestResult> {
    serde_json::from_value(record.clone()).map_err(|e| {
        TestResult::failure(
            format!("get_normalized_nodes returned an unreadable record for {}: {}", curie, e),
            ResultKind::Json,
            record.clone(),
        )
    })
}

/// Picks the record for `curie` out of a `get_normalized_nodes` response.
pub fn interpret_normalized_nodes(curie: &str, results: &Value) -> Result<FoundNode, TestResult> {
    let Some(record) = record_for(curie, results)? else {
        return Err(TestResult::failure(
            format!("get_normalized_nodes returned no response for {}", curie),
            ResultKind::Json,
            results.clone(),
        ));
    };

    let node = read_record(curie, record)?;

    if !node.is_equivalent_to(curie) {
        return Err(TestResult::failure(
            format!("ID {} could not be found", curie),
            ResultKind::NodeNorm,
            record.clone(),
        ));
    }

    let preferred_label_text = match node.preferred_id() {
        Some(preferred) if preferred == curie => {
            format!(" (\"{}\")", node.preferred_label().unwrap_or(""))
        }
        Some(preferred) => format!(" ({} \"{}\")", preferred, node.preferred_label().unwrap_or("")),
        None => String::new(),
    };

    let result = TestResult::success(
        format!("Found ID {}{}", curie, preferred_label_text),
        ResultKind::NodeNorm,
        record.clone(),
    );

    Ok(FoundNode {
        node,
        record: record.clone(),
        result,
    })
}
