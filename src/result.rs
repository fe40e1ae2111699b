// src/result.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What the payload of a `TestResult` holds, so a report can render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResultKind {
    /// Plain text, usually an HTTP status line or a parse error.
    #[serde(rename = "text")]
    Text,
    /// A raw JSON body that did not have the expected shape.
    #[serde(rename = "json")]
    Json,
    /// A NodeNorm cluster record.
    NodeNorm,
    /// A list of NameRes lookup results.
    NameRes,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::Text => write!(f, "text"),
            ResultKind::Json => write!(f, "json"),
            ResultKind::NodeNorm => write!(f, "NodeNorm"),
            ResultKind::NameRes => write!(f, "NameRes"),
            ResultKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// The outcome of running one `Test` against an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub ok: bool,
    pub message: String,
    pub kind: ResultKind,
    pub payload: Value,
}

impl TestResult {
    pub fn success(message: impl Into<String>, kind: ResultKind, payload: Value) -> Self {
        Self {
            ok: true,
            message: message.into(),
            kind,
            payload,
        }
    }

    pub fn failure(message: impl Into<String>, kind: ResultKind, payload: Value) -> Self {
        Self {
            ok: false,
            message: message.into(),
            kind,
            payload,
        }
    }

    /// A success with no payload.
    pub fn passed(message: impl Into<String>) -> Self {
        Self::success(message, ResultKind::default(), Value::Null)
    }

    /// A failure with no payload.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::failure(message, ResultKind::default(), Value::Null)
    }
}
