#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ranking crawler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rankr_cli_utils::IndicatifProgress;
use rankr_crawl::{
    CrawlRequest, ExportOptions, RetryPolicy, crawl_all, crawl_and_export, summarize,
};
use rankr_ranking_models::{RankingRun, RankingType};
use rankr_scraper::{Fetcher, HttpFetcher};
use rankr_source::config::SourceConfig;
use rankr_source::export::ExportFormat;
use rankr_source::registry::{all_configs, enabled_configs, find_config};

#[derive(Parser)]
#[command(name = "rankr_crawl", about = "University ranking crawler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured ranking sources
    Sources,
    /// Crawl one ranking edition from a specific source
    Crawl {
        /// Source identifier (e.g., "qs")
        source: String,
        /// Edition year
        #[arg(long)]
        year: u16,
        /// Page URL to start from (overrides the source's page template)
        #[arg(long)]
        url: Option<String>,
        /// Ranking type (`university_ranking` or `subject_ranking`)
        #[arg(long, default_value = "university_ranking")]
        ranking_type: RankingType,
        /// Broad field of a subject ranking (defaults to "All")
        #[arg(long)]
        field: Option<String>,
        /// Subject of a subject ranking (defaults to "All")
        #[arg(long)]
        subject: Option<String>,
        /// Directory to write results to (overrides `RANKR_DOWNLOAD_DIR`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Output format (json or csv)
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// How many times to retry the whole crawl after a network failure
        #[arg(long, default_value = "3")]
        retries: u32,
        /// Per-request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },
    /// Crawl one edition from every enabled source
    CrawlAll {
        /// Edition year
        #[arg(long)]
        year: u16,
        /// Comma-separated list of source IDs to crawl (overrides `RANKR_SOURCES` env var)
        #[arg(long)]
        sources: Option<String>,
        /// Directory to write results to (overrides `RANKR_DOWNLOAD_DIR`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Output format (json or csv)
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// How many times to retry each crawl after a network failure
        #[arg(long, default_value = "3")]
        retries: u32,
    },
}

/// Run metadata for a single crawl. Field and subject keep the run's
/// `"All"` default unless given.
fn run_metadata(
    config: &SourceConfig,
    year: u16,
    ranking_type: RankingType,
    field: Option<&str>,
    subject: Option<&str>,
) -> RankingRun {
    let mut run = config.run_for(year).with_ranking_type(ranking_type);
    if let Some(field) = field {
        run = run.with_field(field);
    }
    if let Some(subject) = subject {
        run = run.with_subject(subject);
    }
    run
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = rankr_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return Ok(rankr_crawl::interactive::run(&multi).await?);
    };

    match command {
        Commands::Sources => {
            let configs = all_configs()?;
            println!("{:<12} {:<10} NAME", "ID", "SYSTEM");
            println!("{}", "-".repeat(60));
            for config in &configs {
                println!(
                    "{:<12} {:<10} {}",
                    config.id,
                    config.ranking_system.label(),
                    config.name
                );
            }
        }
        Commands::Crawl {
            source,
            year,
            url,
            ranking_type,
            field,
            subject,
            output_dir,
            format,
            retries,
            timeout,
        } => {
            let config = find_config(&source)?;
            let run = run_metadata(
                &config,
                year,
                ranking_type,
                field.as_deref(),
                subject.as_deref(),
            );
            let request = CrawlRequest::new(config, year, url)?.with_run(run);

            let fetcher: Arc<dyn Fetcher> =
                Arc::new(HttpFetcher::new(Duration::from_secs(timeout))?);
            let export = ExportOptions { output_dir, format };
            let progress = IndicatifProgress::rows_bar(&multi, &source);

            let path = crawl_and_export(
                &request,
                fetcher,
                RetryPolicy::new(retries),
                &export,
                progress,
            )
            .await?;
            println!("{}", path.display());
        }
        Commands::CrawlAll {
            year,
            sources,
            output_dir,
            format,
            retries,
        } => {
            let configs = enabled_configs(sources)?;
            log::info!(
                "Crawling {} source(s): {}",
                configs.len(),
                configs
                    .iter()
                    .map(|c| c.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            let mut requests = Vec::with_capacity(configs.len());
            for config in configs {
                match CrawlRequest::new(config, year, None) {
                    Ok(request) => requests.push(request),
                    Err(e) => log::warn!("Skipping: {e}"),
                }
            }

            let fetcher = rankr_crawl::http_fetcher()?;
            let export = ExportOptions { output_dir, format };
            let results = crawl_all(
                &requests,
                &fetcher,
                RetryPolicy::new(retries),
                &export,
                Some(&multi),
            )
            .await;
            summarize(results)?;
        }
    }

    Ok(())
}
