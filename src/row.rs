// src/row.rs
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const QUERY_ID: &str = "Query ID";
pub const QUERY_LABEL: &str = "Query Label";
pub const PREFERRED_ID: &str = "Preferred ID";
pub const PREFERRED_LABEL: &str = "Preferred Label";
pub const ADDITIONAL_IDS: &str = "Additional IDs";
pub const ADDITIONAL_LABELS: &str = "Additional Labels";
pub const BIOLINK_CLASSES: &str = "Biolink Classes";
pub const CONFLATIONS: &str = "Conflations";
pub const CATEGORY: &str = "Category";
pub const SOURCE: &str = "Source";
pub const SOURCE_URL: &str = "Source URL";
pub const PASSES_IN_NODENORM: &str = "Passes in NodeNorm";
pub const PASSES_IN_NAMERES: &str = "Passes in NameRes";
pub const FLAGS: &str = "Flags";

/// Flag marking a row whose `Query ID` should not normalize.
pub const NEGATIVE_FLAG: &str = "negative";

static PIPE_SPLITTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*").expect("pipe splitter regex is valid"));

/// Splits a multi-value cell on `|`, trimming whitespace and dropping empty
/// pieces.
pub fn split_multi(value: &str) -> Vec<String> {
    PIPE_SPLITTER
        .split(value.trim())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// One row of a test-case spreadsheet.
///
/// Columns are matched case-insensitively and an empty cell counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Spreadsheet line number, with the header on line 1.
    pub line: usize,
    pub cells: BTreeMap<String, String>,
}

impl Row {
    pub fn new(line: usize, cells: BTreeMap<String, String>) -> Self {
        Self { line, cells }
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(line: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            line,
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        )
    }

    /// The trimmed, non-empty value of `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(column))
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    /// The pipe-separated values of `column`, empty if the column is absent.
    pub fn get_multi(&self, column: &str) -> Vec<String> {
        self.get(column).map(split_multi).unwrap_or_default()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|value| value.trim().is_empty())
    }

    /// Whether the pipe-separated `Flags` cell lists `flag`.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.get_multi(FLAGS).iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    pub fn category(&self) -> &str {
        self.get(CATEGORY).unwrap_or("")
    }

    /// Whether the sheet has a column with this name, empty or not.
    pub fn has_column(&self, column: &str) -> bool {
        self.cells.keys().any(|name| name.trim().eq_ignore_ascii_case(column))
    }

    /// Whether the sheet says this row should currently pass on NodeNorm.
    pub fn expect_pass_in_nodenorm(&self) -> bool {
        self.expect_pass(PASSES_IN_NODENORM)
    }

    /// Whether the sheet says this row should currently pass on NameRes.
    pub fn expect_pass_in_nameres(&self) -> bool {
        self.expect_pass(PASSES_IN_NAMERES)
    }

    // Sheets without the column expect everything to pass; with it, only `y` does.
    fn expect_pass(&self, column: &str) -> bool {
        !self.has_column(column) || self.get(column).is_some_and(|v| v.eq_ignore_ascii_case("y"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_multi_trims_and_drops_empty_pieces() {
        assert_eq!(
            split_multi(" MESH:D014867 |CHEBI:15377|| UMLS:C0043047 "),
            vec!["MESH:D014867", "CHEBI:15377", "UMLS:C0043047"]
        );
        assert!(split_multi("   ").is_empty());
        assert_eq!(split_multi("biolink:Gene"), vec!["biolink:Gene"]);
    }

    #[test]
    fn test_get_is_case_insensitive_and_skips_empty_cells() {
        let row = Row::from_pairs(
            2,
            [("Biolink classes", " biolink:Gene "), ("Preferred ID", "   ")],
        );
        assert_eq!(row.get(BIOLINK_CLASSES), Some("biolink:Gene"));
        assert_eq!(row.get(PREFERRED_ID), None);
        assert_eq!(row.get(QUERY_ID), None);
    }

    #[test]
    fn test_get_prefers_filled_cell_over_empty_duplicate() {
        let row = Row::from_pairs(
            2,
            [("Biolink Classes", ""), ("Biolink classes", "biolink:SmallMolecule")],
        );
        assert_eq!(row.get(BIOLINK_CLASSES), Some("biolink:SmallMolecule"));
    }

    #[test]
    fn test_expected_pass_flags() {
        let row = Row::from_pairs(3, [("Passes in NodeNorm", "y"), ("Passes in NameRes", "n")]);
        assert!(row.expect_pass_in_nodenorm());
        assert!(!row.expect_pass_in_nameres());
        assert!(!Row::from_pairs(3, [("Passes in NodeNorm", "")]).expect_pass_in_nodenorm());
        assert!(Row::default().expect_pass_in_nodenorm());
    }

    #[test]
    fn test_flags() {
        let row = Row::from_pairs(2, [("Flags", "slow | Negative")]);
        assert!(row.has_flag(NEGATIVE_FLAG));
        assert!(row.has_flag("slow"));
        assert!(!Row::default().has_flag(NEGATIVE_FLAG));
    }

    #[test]
    fn test_is_blank() {
        assert!(Row::from_pairs(4, [("Query ID", ""), ("Notes", "  ")]).is_blank());
        assert!(!Row::from_pairs(4, [("Notes", "x")]).is_blank());
    }
}
