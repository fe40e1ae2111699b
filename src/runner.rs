// src/runner.rs
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::babel_tests::issue_tests;
use crate::check::{Service, Test};
use crate::client::LookupClient;
use crate::convert::{ConversionOptions, convert_row};
use crate::github::GithubIssue;
use crate::result::TestResult;
use crate::row::Row;

pub use crate::check::Endpoints;

/// How a result compares with what the sheet predicted for its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
    /// Failed on a row the sheet says does not pass yet.
    ExpectedFailure,
    /// Passed on a row the sheet says does not pass yet.
    UnexpectedPass,
}

impl Verdict {
    pub fn from_result(result: &TestResult, expect_pass: bool) -> Self {
        match (result.ok, expect_pass) {
            (true, true) => Verdict::Pass,
            (false, true) => Verdict::Fail,
            (false, false) => Verdict::ExpectedFailure,
            (true, false) => Verdict::UnexpectedPass,
        }
    }

    /// Whether this verdict should make the run fail.
    pub fn is_problem(&self) -> bool {
        matches!(self, Verdict::Fail | Verdict::UnexpectedPass)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::ExpectedFailure => write!(f, "XFAIL"),
            Verdict::UnexpectedPass => write!(f, "XPASS"),
        }
    }
}

/// A test waiting to run, along with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTest {
    /// Sheet line, or issue number for tests read from an issue.
    pub line: usize,
    /// `row 12` or `org/repo#12`.
    pub origin: String,
    /// Sheet category, or `org/repo` for tests read from an issue.
    pub category: String,
    pub expect_pass: bool,
    pub test: Test,
}

/// Which services a run should exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceFilter {
    #[default]
    Both,
    Only(Service),
}

impl ServiceFilter {
    fn allows(&self, service: Service) -> bool {
        match self {
            ServiceFilter::Both => true,
            ServiceFilter::Only(only) => *only == service,
        }
    }
}

/// Which rows a run should take tests from.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    pub include_categories: Vec<String>,
    pub exclude_categories: Vec<String>,
    pub services: ServiceFilter,
}

impl RowFilter {
    fn allows_row(&self, row: &Row) -> bool {
        self.allows_category(row.category())
    }

    fn allows_category(&self, category: &str) -> bool {
        let included = self.include_categories.is_empty()
            || self.include_categories.iter().any(|c| c.eq_ignore_ascii_case(category));
        let excluded = self.exclude_categories.iter().any(|c| c.eq_ignore_ascii_case(category));
        included && !excluded
    }
}

/// Converts every row that passes `filter` into tests.
pub fn plan_tests(rows: &[Row], filter: &RowFilter, options: &ConversionOptions) -> Vec<PlannedTest> {
    let services = filter.services;
    rows.iter()
        .filter(|row| filter.allows_row(row))
        .flat_map(move |row| {
            convert_row(row, options)
                .into_iter()
                .filter(move |test| services.allows(test.service()))
                .map(move |test| PlannedTest {
                    line: row.line,
                    origin: format!("row {}", row.line),
                    category: row.category().to_string(),
                    expect_pass: match test.service() {
                        Service::NodeNorm => row.expect_pass_in_nodenorm(),
                        Service::NameRes => row.expect_pass_in_nameres(),
                    },
                    test,
                })
        })
        .collect()
}

/// Converts the BabelTests in every issue whose repository passes `filter`.
///
/// Tests on closed issues are expected to pass. Tests on open issues are
/// expected to fail, so a pass flags an issue that may be ready to close.
pub fn plan_issue_tests(issues: &[GithubIssue], filter: &RowFilter, options: &ConversionOptions) -> Vec<PlannedTest> {
    let mut planned = Vec::new();
    for issue in issues {
        let repository = issue.repository();
        if !filter.allows_category(&repository) {
            continue;
        }
        for test in issue_tests(issue, options.top_n) {
            if !filter.services.allows(test.service()) {
                continue;
            }
            planned.push(PlannedTest {
                line: issue.number as usize,
                origin: issue.reference(),
                category: repository.clone(),
                expect_pass: !issue.is_open(),
                test,
            });
        }
    }
    planned
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub line: usize,
    pub origin: String,
    pub category: String,
    pub service: Service,
    pub description: String,
    pub source: Option<String>,
    pub source_url: Option<String>,
    pub verdict: Verdict,
    pub result: TestResult,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub expected_failures: usize,
    pub unexpected_passes: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[TestOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.verdict {
                Verdict::Pass => summary.passed += 1,
                Verdict::Fail => summary.failed += 1,
                Verdict::ExpectedFailure => summary.expected_failures += 1,
                Verdict::UnexpectedPass => summary.unexpected_passes += 1,
            }
        }
        summary
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.unexpected_passes == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: String,
    pub endpoints: Endpoints,
    pub summary: RunSummary,
    pub total_latency_ms: u64,
    pub outcomes: Vec<TestOutcome>,
}

/// Runs a single planned test against the services at `endpoints`.
pub async fn run_test<C: LookupClient>(client: &C, endpoints: &Endpoints, planned: &PlannedTest) -> TestOutcome {
    let service = planned.test.service();
    let start = Instant::now();
    let result = planned.test.run(client, endpoints).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let verdict = Verdict::from_result(&result, planned.expect_pass);

    if verdict.is_problem() {
        log::warn!("[{}] {}: {}: {}", verdict, planned.origin, planned.test.description, result.message);
    } else {
        log::debug!("[{}] {}: {}: {}", verdict, planned.origin, planned.test.description, result.message);
    }

    TestOutcome {
        line: planned.line,
        origin: planned.origin.clone(),
        category: planned.category.clone(),
        service,
        description: planned.test.description.clone(),
        source: planned.test.source.clone(),
        source_url: planned.test.source_url.clone(),
        verdict,
        result,
        latency_ms,
    }
}

/// Runs all planned tests with at most `concurrency` in flight, keeping the
/// outcomes in plan order.
pub async fn run_batch<C: LookupClient>(
    client: &C,
    endpoints: Endpoints,
    planned: &[PlannedTest],
    concurrency: usize,
) -> RunReport {
    let run_id = Uuid::new_v4();
    let started_at = chrono::Utc::now().to_rfc3339();
    let batch_start = Instant::now();
    log::info!("Run {} starting {} tests against {:?}", run_id, planned.len(), endpoints);

    let outcomes: Vec<TestOutcome> = stream::iter(planned)
        .map(|test| run_test(client, &endpoints, test))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let total_latency_ms = batch_start.elapsed().as_millis() as u64;
    let summary = RunSummary::from_outcomes(&outcomes);
    log::info!("Run {} finished in {}ms: {:?}", run_id, total_latency_ms, summary);

    RunReport {
        run_id,
        started_at,
        endpoints,
        summary,
        total_latency_ms,
        outcomes,
    }
}
