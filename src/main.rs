use babel_validation::banner;
use babel_validation::check::Service;
use babel_validation::client::HttpLookupClient;
use babel_validation::config::AppConfig;
use babel_validation::convert::ConversionOptions;
use babel_validation::errors::Result;
use babel_validation::github;
use babel_validation::runner::{self, Endpoints, PlannedTest, RowFilter, RunReport, ServiceFilter, Verdict};
use babel_validation::sources;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnlyService {
    Nodenorm,
    Nameres,
}

#[derive(Parser, Debug)]
#[command(name = "babel-validation", version)]
#[command(about = "Check NodeNorm and NameRes instances against a sheet of expected results")]
#[command(
    after_help = "Environment:\n  NODENORM_URL, NAMERES_URL, NAMERES_TOP_N, REQUEST_TIMEOUT_SECS,\n  VALIDATION_CONCURRENCY, GOOGLE_SHEET_ID, GITHUB_REPOSITORIES, GITHUB_TOKEN, RUST_LOG"
)]
struct Cli {
    /// TOML config file (defaults to <config dir>/babel-validation/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Named target from the config file
    #[arg(long)]
    target: Option<String>,
    /// NodeNorm base URL
    #[arg(long)]
    nodenorm: Option<String>,
    /// NameRes base URL
    #[arg(long)]
    nameres: Option<String>,
    /// Local sheet of test cases (.csv or .json)
    #[arg(long, conflicts_with = "google_sheet")]
    sheet: Option<PathBuf>,
    /// Google Sheet id to download test cases from
    #[arg(long)]
    google_sheet: Option<String>,
    /// Read BabelTests from GitHub issues instead of a sheet
    #[arg(long, default_value_t = false, conflicts_with_all = ["sheet", "google_sheet"])]
    github_issues: bool,
    /// GitHub repository (org/repo) to read issues from (repeatable)
    #[arg(long = "repo", requires = "github_issues")]
    repos: Vec<String>,
    /// Only run rows in this category (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,
    /// Skip rows in this category (repeatable)
    #[arg(long = "exclude-category")]
    exclude_categories: Vec<String>,
    /// Only run tests for one service
    #[arg(long, value_enum)]
    only: Option<OnlyService>,
    /// Pass a NameRes lookup if the expected CURIE is within the top N results
    #[arg(long)]
    top: Option<usize>,
    /// Maximum number of tests in flight
    #[arg(long)]
    concurrency: Option<usize>,
    /// Write the full JSON report to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print the categories in the sheet and exit
    #[arg(long, default_value_t = false)]
    list_categories: bool,
    /// Only print failures and unexpected passes
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    banner::print_banner();

    let dotenv = dotenvy::dotenv();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the run finished without failures or unexpected passes.
async fn run(cli: Cli) -> Result<bool> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(target) = &cli.target {
        config.select_target(target)?;
    }
    if let Some(url) = cli.nodenorm {
        config.nodenorm_url = url;
    }
    if let Some(url) = cli.nameres {
        config.nameres_url = url;
    }
    if let Some(top_n) = cli.top {
        config.top_n = top_n;
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config.validate()?;

    let client = HttpLookupClient::with_timeout(config.timeout)?;

    let filter = RowFilter {
        include_categories: cli.categories,
        exclude_categories: cli.exclude_categories,
        services: match cli.only {
            None => ServiceFilter::Both,
            Some(OnlyService::Nodenorm) => ServiceFilter::Only(Service::NodeNorm),
            Some(OnlyService::Nameres) => ServiceFilter::Only(Service::NameRes),
        },
    };
    let options = ConversionOptions { top_n: config.top_n };

    let planned = if cli.github_issues {
        let repos = if cli.repos.is_empty() { config.github_repositories.clone() } else { cli.repos };
        let issues = github::fetch_all_issues(
            client.inner(),
            &config.github_api_url,
            &repos,
            config.github_token.as_deref(),
        )
        .await?;
        if cli.list_categories {
            for repo in &repos {
                let count = issues.iter().filter(|i| i.repository() == *repo).count();
                println!("{:>6}  {}", count, repo);
            }
            return Ok(true);
        }
        let planned = runner::plan_issue_tests(&issues, &filter, &options);
        println!("📋 {} tests from {} issues in {} repositories", planned.len(), issues.len(), repos.len());
        planned
    } else {
        let Some(planned) = plan_sheet(&cli.sheet, &cli.google_sheet, &client, &config, &filter, &options, cli.list_categories).await? else {
            return Ok(true);
        };
        planned
    };

    println!("🔗 NodeNorm: {}", config.nodenorm_url);
    println!("🔗 NameRes:  {}\n", config.nameres_url);

    let report = runner::run_batch(&client, Endpoints::from_config(&config), &planned, config.concurrency).await;
    print_report(&report, cli.quiet);

    if let Some(path) = &cli.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("💾 Report written to {}", path.display());
    }

    Ok(report.summary.is_clean())
}

/// Loads the sheet and plans its tests, or prints its categories and returns
/// `None` when only those were asked for.
async fn plan_sheet(
    sheet: &Option<PathBuf>,
    google_sheet: &Option<String>,
    client: &HttpLookupClient,
    config: &AppConfig,
    filter: &RowFilter,
    options: &ConversionOptions,
    list_categories: bool,
) -> Result<Option<Vec<PlannedTest>>> {
    let rows = match (sheet, google_sheet) {
        (Some(path), _) => sources::load_sheet(path)?,
        (None, Some(sheet_id)) => sources::download_google_sheet(client.inner(), sheet_id).await?,
        (None, None) => sources::download_google_sheet(client.inner(), &config.google_sheet_id).await?,
    };

    if list_categories {
        for (category, count) in sources::categories(&rows) {
            let name = if category.is_empty() { "(none)" } else { category.as_str() };
            println!("{:>6}  {}", count, name);
        }
        return Ok(None);
    }

    let planned = runner::plan_tests(&rows, filter, options);
    println!("📋 {} tests from {} rows", planned.len(), rows.len());
    Ok(Some(planned))
}

fn print_report(report: &RunReport, quiet: bool) {
    for outcome in &report.outcomes {
        if quiet && !outcome.verdict.is_problem() {
            continue;
        }
        let icon = match outcome.verdict {
            Verdict::Pass => "✅",
            Verdict::Fail => "❌",
            Verdict::ExpectedFailure => "➖",
            Verdict::UnexpectedPass => "⚠️ ",
        };
        println!(
            "{} [{}] {} {}: {}\n      {}",
            icon, outcome.verdict, outcome.origin, outcome.service, outcome.description, outcome.result.message
        );
        if outcome.verdict.is_problem() {
            if let Some(source) = &outcome.source {
                println!("      source: {} {}", source, outcome.source_url.as_deref().unwrap_or(""));
            }
        }
    }

    let separator = "=".repeat(60);
    let summary = &report.summary;
    println!("\n{}", separator);
    println!(
        "📊 {} tests in {}ms: {} passed, {} failed, {} expected failures, {} unexpected passes",
        summary.total,
        report.total_latency_ms,
        summary.passed,
        summary.failed,
        summary.expected_failures,
        summary.unexpected_passes
    );
    println!("{}", separator);
}
