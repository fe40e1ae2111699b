// src/convert.rs
use crate::check::{Check, Test};
use crate::nodenorm::Conflations;
use crate::row::{
    ADDITIONAL_IDS, ADDITIONAL_LABELS, BIOLINK_CLASSES, CONFLATIONS, NEGATIVE_FLAG, PREFERRED_ID,
    PREFERRED_LABEL, QUERY_ID, QUERY_LABEL, Row, SOURCE, SOURCE_URL,
};

/// How many NameRes results a lookup test looks through by default.
pub const DEFAULT_TOP_N: usize = 5;

/// Knobs for turning rows into tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    pub top_n: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

/// Converts a single row into zero or more tests, using default options.
pub fn row_to_tests(row: &Row) -> Vec<Test> {
    convert_row(row, &ConversionOptions::default())
}

/// Converts a single row into its NodeNorm tests followed by its NameRes
/// tests.
pub fn convert_row(row: &Row, options: &ConversionOptions) -> Vec<Test> {
    let mut tests = nodenorm_tests(row);
    tests.extend(nameres_tests(row, options));
    tests
}

/// The NodeNorm tests a row asks for, all keyed off its `Query ID`.
///
/// A row flagged `negative` only checks that its `Query ID` does not
/// normalize.
pub fn nodenorm_tests(row: &Row) -> Vec<Test> {
    let Some(query_id) = row.get(QUERY_ID) else {
        return Vec::new();
    };

    let factory = TestFactory::new(row, Conflations::from_names(&row.get_multi(CONFLATIONS)));
    if row.has_flag(NEGATIVE_FLAG) {
        return vec![factory.does_not_resolve(query_id)];
    }

    let additional_ids = row.get_multi(ADDITIONAL_IDS);

    let mut tests = vec![factory.check_id(query_id)];
    if let Some(preferred_id) = row.get(PREFERRED_ID) {
        tests.push(factory.check_id(preferred_id));
        tests.push(factory.preferred_id(query_id, preferred_id));
    }
    if let Some(preferred_label) = row.get(PREFERRED_LABEL) {
        tests.push(factory.preferred_label(query_id, preferred_label));
    }
    if let Some(preferred_id) = row.get(PREFERRED_ID) {
        for additional_id in &additional_ids {
            tests.push(factory.preferred_id(additional_id, preferred_id));
            tests.push(factory.cluster_together(additional_id, query_id));
        }
    } else {
        for additional_id in &additional_ids {
            tests.push(factory.cluster_together(additional_id, query_id));
        }
    }

    for biolink_class in row.get_multi(BIOLINK_CLASSES) {
        tests.push(factory.biolink_class(query_id, &biolink_class));
    }

    tests
}

/// One NameRes lookup test per label in the row.
pub fn nameres_tests(row: &Row, options: &ConversionOptions) -> Vec<Test> {
    let factory = TestFactory::new(row, Conflations::default());
    let expected_id = row.get(PREFERRED_ID);

    let mut labels: Vec<String> = [QUERY_LABEL, PREFERRED_LABEL]
        .into_iter()
        .filter_map(|column| row.get(column).map(str::to_string))
        .collect();
    labels.extend(row.get_multi(ADDITIONAL_LABELS));

    labels
        .iter()
        .map(|label| factory.lookup(label, expected_id, options.top_n))
        .collect()
}

/// Builds tests that share the source and conflation settings of one row.
struct TestFactory<'a> {
    source: Option<&'a str>,
    source_url: Option<&'a str>,
    conflations: Conflations,
}

impl<'a> TestFactory<'a> {
    fn new(row: &'a Row, conflations: Conflations) -> Self {
        Self {
            source: row.get(SOURCE),
            source_url: row.get(SOURCE_URL),
            conflations,
        }
    }

    fn build(&self, description: String, check: Check, curies: &[&str]) -> Test {
        Test::new(description, check)
            .with_related_curies(curies.iter().copied())
            .with_source(self.source, self.source_url)
    }

    fn check_id(&self, id: &str) -> Test {
        self.build(
            format!("Check for ID {}", id),
            Check::CheckId {
                id: id.to_string(),
                conflations: self.conflations,
            },
            &[id],
        )
    }

    fn preferred_id(&self, query_id: &str, preferred_id: &str) -> Test {
        self.build(
            format!("Check ID {} has preferred ID {}", query_id, preferred_id),
            Check::PreferredId {
                query_id: query_id.to_string(),
                preferred_id: preferred_id.to_string(),
                conflations: self.conflations,
            },
            &[query_id, preferred_id],
        )
    }

    fn preferred_label(&self, query_id: &str, preferred_label: &str) -> Test {
        self.build(
            format!("Check ID {} has preferred label \"{}\"", query_id, preferred_label),
            Check::PreferredLabel {
                query_id: query_id.to_string(),
                preferred_label: preferred_label.to_string(),
                conflations: self.conflations,
            },
            &[query_id],
        )
    }

    fn does_not_resolve(&self, id: &str) -> Test {
        self.build(
            format!("Check that ID {} does not normalize", id),
            Check::DoesNotResolve {
                id: id.to_string(),
                conflations: self.conflations,
            },
            &[id],
        )
    }

    fn cluster_together(&self, id: &str, other_id: &str) -> Test {
        self.build(
            format!("Check ID {} and ID {} cluster together", id, other_id),
            Check::ClusterTogether {
                id: id.to_string(),
                other_id: other_id.to_string(),
                conflations: self.conflations,
            },
            &[id, other_id],
        )
    }

    fn biolink_class(&self, id: &str, class: &str) -> Test {
        self.build(
            format!("Check that ID {} has Biolink class {}", id, class),
            Check::BiolinkClass {
                id: id.to_string(),
                class: class.to_string(),
                conflations: self.conflations,
            },
            &[id],
        )
    }

    fn lookup(&self, label: &str, expected_id: Option<&str>, top_n: usize) -> Test {
        let curies: Vec<&str> = expected_id.into_iter().collect();
        self.build(
            format!("Lookup \"{}\"", label),
            Check::Lookup {
                query: label.to_string(),
                expected_id: expected_id.map(str::to_string),
                top_n,
            },
            &curies,
        )
    }
}
