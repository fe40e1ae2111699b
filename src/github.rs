// src/github.rs
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};

pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Repositories whose issues carry BabelTests.
pub const DEFAULT_REPOSITORIES: [&str; 4] = [
    "NCATSTranslator/Babel",
    "NCATSTranslator/NodeNormalization",
    "NCATSTranslator/NameResolution",
    "TranslatorSRI/babel-validation",
];

const PER_PAGE: usize = 100;

/// The fields of a GitHub issue that BabelTests need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubIssue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl GithubIssue {
    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }

    /// `org/repo`, read from the issue's web URL.
    pub fn repository(&self) -> String {
        let parts: Vec<&str> = self.html_url.split('/').collect();
        match (parts.get(3), parts.get(4)) {
            (Some(org), Some(repo)) => format!("{}/{}", org, repo),
            _ => String::new(),
        }
    }

    /// `org/repo#number`
    pub fn reference(&self) -> String {
        format!("{}#{}", self.repository(), self.number)
    }
}

/// One page of `GET /repos/{repo}/issues`, all states, most recently updated first.
pub fn issues_url(api_url: &str, repo: &str, page: usize) -> String {
    format!(
        "{}/repos/{}/issues?state=all&sort=updated&per_page={}&page={}",
        api_url.trim_end_matches('/'),
        repo,
        PER_PAGE,
        page
    )
}

/// Fetches every issue in `repo`, following pages until a short one.
///
/// Unauthenticated requests work but are heavily rate limited.
pub async fn fetch_issues(client: &Client, api_url: &str, repo: &str, token: Option<&str>) -> Result<Vec<GithubIssue>> {
    let mut issues = Vec::new();
    for page in 1.. {
        let url = issues_url(api_url, repo, page);
        log::debug!("Fetching {}", url);

        let mut request = client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::Download {
                url,
                status: status.as_u16(),
            });
        }

        let batch: Vec<GithubIssue> = response.json().await?;
        let done = batch.len() < PER_PAGE;
        issues.extend(batch);
        if done {
            break;
        }
    }
    log::info!("Found {} issues in GitHub repository {}", issues.len(), repo);
    Ok(issues)
}

/// Fetches the issues of each repository in turn.
pub async fn fetch_all_issues(
    client: &Client,
    api_url: &str,
    repos: &[String],
    token: Option<&str>,
) -> Result<Vec<GithubIssue>> {
    if token.is_none() {
        log::warn!("No GITHUB_TOKEN set; GitHub may rate-limit issue downloads");
    }
    let mut issues = Vec::new();
    for repo in repos {
        log::info!("Looking up issues in GitHub repository {}", repo);
        issues.extend(fetch_issues(client, api_url, repo, token).await?);
    }
    Ok(issues)
}
