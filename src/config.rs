// src/config.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::convert::DEFAULT_TOP_N;
use crate::errors::{Result, ValidationError};
use crate::github::{DEFAULT_REPOSITORIES, GITHUB_API_URL};
use crate::sources::DEFAULT_GOOGLE_SHEET_ID;

pub const DEFAULT_NODENORM_URL: &str = "https://nodenorm.transltr.io";
pub const DEFAULT_NAMERES_URL: &str = "https://name-lookup.transltr.io";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A named pair of service instances, e.g. `dev` or `prod`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetConfig {
    #[serde(default)]
    pub nodenorm_url: Option<String>,
    #[serde(default)]
    pub nameres_url: Option<String>,
}

/// The contents of `config.toml`. Every field is optional.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub nodenorm_url: Option<String>,
    #[serde(default)]
    pub nameres_url: Option<String>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub google_sheet_id: Option<String>,
    #[serde(default)]
    pub github_repositories: Option<Vec<String>>,
    #[serde(default)]
    pub github_api_url: Option<String>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

impl FileConfig {
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Resolved settings for a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub nodenorm_url: String,
    pub nameres_url: String,
    pub top_n: usize,
    pub timeout: Duration,
    pub concurrency: usize,
    pub google_sheet_id: String,
    /// `org/repo` names to read BabelTests from.
    pub github_repositories: Vec<String>,
    pub github_api_url: String,
    /// Only ever read from the environment.
    pub github_token: Option<String>,
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nodenorm_url: DEFAULT_NODENORM_URL.to_string(),
            nameres_url: DEFAULT_NAMERES_URL.to_string(),
            top_n: DEFAULT_TOP_N,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            google_sheet_id: DEFAULT_GOOGLE_SHEET_ID.to_string(),
            github_repositories: DEFAULT_REPOSITORIES.iter().map(|r| r.to_string()).collect(),
            github_api_url: GITHUB_API_URL.to_string(),
            github_token: None,
            targets: BTreeMap::new(),
        }
    }
}

/// `<config dir>/babel-validation/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("babel-validation").join("config.toml"))
}

impl AppConfig {
    /// Loads defaults, then the config file, then environment variables.
    ///
    /// An explicitly named config file must exist; the default one is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let file_config = match config_path {
            Some(path) => Some(Self::read_file(path)?),
            None => match default_config_path() {
                Some(path) if path.is_file() => Some(Self::read_file(&path)?),
                _ => None,
            },
        };
        if let Some(file_config) = file_config {
            config.apply_file(file_config);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<FileConfig> {
        log::debug!("Reading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        FileConfig::parse(&contents)
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.nodenorm_url {
            self.nodenorm_url = url;
        }
        if let Some(url) = file.nameres_url {
            self.nameres_url = url;
        }
        if let Some(top_n) = file.top_n {
            self.top_n = top_n;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(concurrency) = file.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(sheet_id) = file.google_sheet_id {
            self.google_sheet_id = sheet_id;
        }
        if let Some(repositories) = file.github_repositories {
            self.github_repositories = repositories;
        }
        if let Some(url) = file.github_api_url {
            self.github_api_url = url;
        }
        self.targets.extend(file.targets);
    }

    /// Overrides settings from environment variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("NODENORM_URL") {
            self.nodenorm_url = url;
        }
        if let Some(url) = lookup("NAMERES_URL") {
            self.nameres_url = url;
        }
        if let Some(value) = lookup("NAMERES_TOP_N") {
            self.top_n = parse_number("NAMERES_TOP_N", &value)?;
        }
        if let Some(value) = lookup("REQUEST_TIMEOUT_SECS") {
            self.timeout = Duration::from_secs(parse_number("REQUEST_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("VALIDATION_CONCURRENCY") {
            self.concurrency = parse_number("VALIDATION_CONCURRENCY", &value)?;
        }
        if let Some(sheet_id) = lookup("GOOGLE_SHEET_ID") {
            self.google_sheet_id = sheet_id;
        }
        if let Some(repositories) = lookup("GITHUB_REPOSITORIES") {
            self.github_repositories = repositories
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
        self.github_token = lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty());
        Ok(())
    }

    /// Points the run at a target named in the config file.
    pub fn select_target(&mut self, name: &str) -> Result<()> {
        let target = self.targets.get(name).cloned().ok_or_else(|| {
            ValidationError::Config(format!(
                "Unknown target '{}'. Known targets: {}",
                name,
                self.targets.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;
        if let Some(url) = target.nodenorm_url {
            self.nodenorm_url = url;
        }
        if let Some(url) = target.nameres_url {
            self.nameres_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("NodeNorm", &self.nodenorm_url), ("NameRes", &self.nameres_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::Config(format!(
                    "{} URL must start with http:// or https://, got '{}'",
                    name, url
                )));
            }
        }
        if self.top_n == 0 {
            return Err(ValidationError::Config("top_n must be greater than 0".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ValidationError::Config("concurrency must be greater than 0".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ValidationError::Config("timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::Config(format!("{} must be a positive number, got '{}'", key, value)))
}
