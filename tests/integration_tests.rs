// tests/integration_tests.rs
use babel_validation::client::{HttpReply, LookupClient};
use babel_validation::convert::ConversionOptions;
use babel_validation::errors::Result;
use babel_validation::github::GithubIssue;
use babel_validation::runner::{self, Endpoints, RowFilter, Verdict};
use babel_validation::{Check, ResultKind, Row, Service, row_to_tests, sources};
use reqwest::Url;
use serde_json::{Value, json};

/// Answers NodeNorm and NameRes requests from fixed JSON documents.
struct FakeServices {
    nodenorm: Value,
    nameres: Value,
}

impl FakeServices {
    fn reply(body: &Value) -> Result<HttpReply> {
        Ok(HttpReply {
            status: 200,
            status_text: "OK".to_string(),
            body: body.to_string(),
        })
    }
}

impl LookupClient for FakeServices {
    async fn get(&self, url: Url) -> Result<HttpReply> {
        assert!(url.path().ends_with("/get_normalized_nodes"), "unexpected GET {}", url);
        let curie = url
            .query_pairs()
            .find(|(key, _)| key == "curie")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let record = self.nodenorm.get(&curie).cloned().unwrap_or(Value::Null);
        Self::reply(&json!({ curie: record }))
    }

    async fn post(&self, url: Url) -> Result<HttpReply> {
        assert!(url.path().ends_with("/lookup"), "unexpected POST {}", url);
        Self::reply(&self.nameres)
    }
}

fn water_cluster() -> Value {
    json!({
        "id": {"identifier": "CHEBI:15377", "label": "Water"},
        "equivalent_identifiers": [
            {"identifier": "CHEBI:15377"},
            {"identifier": "MESH:D014867"},
            {"identifier": "UMLS:C0043047"}
        ],
        "type": ["biolink:SmallMolecule", "biolink:ChemicalEntity"]
    })
}

fn services() -> FakeServices {
    FakeServices {
        nodenorm: json!({
            "CHEBI:15377": water_cluster(),
            "MESH:D014867": water_cluster(),
            "UMLS:C0043047": water_cluster(),
        }),
        nameres: json!({
            "CHEBI:15377": ["water", "H2O", "dihydrogen oxide"],
            "MESH:D014867": ["Water"]
        }),
    }
}

fn endpoints() -> Endpoints {
    Endpoints {
        nodenorm: "https://nodenorm.example.org".to_string(),
        nameres: "https://name-lookup.example.org/".to_string(),
    }
}

const SHEET: &str = "\
Category,Query ID,Preferred ID,Additional IDs,Biolink Classes,Query Label,Passes in NodeNorm,Passes in NameRes,Source
Chemicals,MESH:D014867,CHEBI:15377,UMLS:C0043047,biolink:SmallMolecule | !biolink:Gene,water,y,y,issue 12
Chemicals,MESH:D014867,CHEBI:99999,,,,,,issue 13
";

#[test]
fn test_row_with_query_and_preferred_ids() {
    let row = Row::from_pairs(2, [("Query ID", "X:1"), ("Preferred ID", "Y:2")]);
    let checks: Vec<Check> = row_to_tests(&row).into_iter().map(|t| t.check).collect();

    assert!(checks.iter().any(|c| matches!(c, Check::CheckId { id, .. } if id == "X:1")));
    assert!(checks.iter().any(|c| matches!(c, Check::CheckId { id, .. } if id == "Y:2")));
    assert!(checks.iter().any(|c| matches!(
        c,
        Check::PreferredId { query_id, preferred_id, .. } if query_id == "X:1" && preferred_id == "Y:2"
    )));
}

#[tokio::test]
async fn test_full_run_against_fake_services() {
    let rows = sources::read_csv(SHEET.as_bytes()).unwrap();
    let planned = runner::plan_tests(&rows, &RowFilter::default(), &ConversionOptions::default());
    let report = runner::run_batch(&services(), endpoints(), &planned, 4).await;

    assert_eq!(report.outcomes.len(), planned.len());
    for (outcome, plan) in report.outcomes.iter().zip(&planned) {
        assert_eq!(outcome.description, plan.test.description);
    }

    let first_row: Vec<_> = report.outcomes.iter().filter(|o| o.line == 2).collect();
    assert!(
        first_row.iter().all(|o| o.verdict == Verdict::Pass),
        "{:#?}",
        first_row
    );
    let lookup = first_row.iter().find(|o| o.service == Service::NameRes).unwrap();
    assert_eq!(lookup.result.kind, ResultKind::NameRes);
    assert_eq!(lookup.result.payload[0]["synonyms"], json!(["H2O", "water", "dihydrogen oxide"]));

    // Row 3 points at the wrong preferred id and the sheet says it does not pass yet.
    let second_row: Vec<_> = report.outcomes.iter().filter(|o| o.line == 3).collect();
    assert!(second_row.iter().any(|o| o.verdict == Verdict::ExpectedFailure));
    assert!(second_row.iter().any(|o| o.verdict == Verdict::UnexpectedPass));

    assert_eq!(report.summary.total, report.outcomes.len());
    assert!(!report.summary.is_clean());
}

#[tokio::test]
async fn test_unknown_curie_fails_check() {
    let row = Row::from_pairs(2, [("Query ID", "FAKE:0")]);
    let tests = row_to_tests(&row);
    assert_eq!(tests.len(), 1);

    let result = tests[0].run(&services(), &endpoints()).await;
    assert!(!result.ok);
    assert_eq!(result.kind, ResultKind::Json);
}

#[tokio::test]
async fn test_running_twice_is_independent() {
    let row = Row::from_pairs(2, [("Query ID", "MESH:D014867")]);
    let test = row_to_tests(&row).remove(0);
    let client = services();

    let first = test.run(&client, &endpoints()).await;
    let second = test.run(&client, &endpoints()).await;
    assert_eq!(first, second);
    assert_eq!(first.message, "Found ID MESH:D014867 (CHEBI:15377 \"Water\")");
}

#[tokio::test]
async fn test_negative_row_passes_when_nothing_normalizes() {
    let row = Row::from_pairs(2, [("Query ID", "FAKE:1"), ("Flags", "negative")]);
    let tests = row_to_tests(&row);
    assert_eq!(tests.len(), 1);

    let result = tests[0].run(&services(), &endpoints()).await;
    assert!(result.ok, "{}", result.message);
}

#[tokio::test]
async fn test_issue_tests_run_against_fake_services() {
    let issue = GithubIssue {
        number: 42,
        title: "Water identifiers".to_string(),
        state: "closed".to_string(),
        html_url: "https://github.com/NCATSTranslator/Babel/issues/42".to_string(),
        body: Some(
            "Water should be one clique.\n\n\
             {{BabelTest|ResolvesWith|MESH:D014867|CHEBI:15377}}\n\
             {{BabelTest|DoesNotResolve|FAKE:1}}\n"
                .to_string(),
        ),
    };
    let planned = runner::plan_issue_tests(&[issue], &RowFilter::default(), &ConversionOptions::default());
    assert_eq!(planned.len(), 2);
    assert!(planned.iter().all(|p| p.origin == "NCATSTranslator/Babel#42"));

    let report = runner::run_batch(&services(), endpoints(), &planned, 2).await;
    assert!(
        report.outcomes.iter().all(|o| o.verdict == Verdict::Pass),
        "{:#?}",
        report.outcomes
    );
    assert!(report.summary.is_clean());
}
