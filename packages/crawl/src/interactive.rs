#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the ranking crawler.
//!
//! Lets the user pick sources, an edition year and an output format with
//! `dialoguer` prompts instead of CLI flags.

use dialoguer::{Input, MultiSelect, Select};
use rankr_cli_utils::MultiProgress;
use rankr_source::export::ExportFormat;
use rankr_source::registry::all_configs;

use crate::{CliError, CrawlRequest, ExportOptions, RetryPolicy, crawl_all, summarize};

const DEFAULT_RETRIES: u32 = 3;

/// Top-level actions available in the interactive menu.
enum CrawlAction {
    CrawlSources,
    ListSources,
}

impl CrawlAction {
    const ALL: &[Self] = &[Self::CrawlSources, Self::ListSources];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::CrawlSources => "Crawl sources",
            Self::ListSources => "List sources",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure a
/// crawl.
///
/// # Errors
///
/// Returns [`CliError`] if a prompt fails, the source definitions cannot be
/// loaded, or any selected source fails to crawl.
pub async fn run(multi: &MultiProgress) -> Result<(), CliError> {
    let labels: Vec<&str> = CrawlAction::ALL.iter().map(CrawlAction::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match CrawlAction::ALL[idx] {
        CrawlAction::CrawlSources => crawl_sources(multi).await,
        CrawlAction::ListSources => list_sources(),
    }
}

/// Prompts for sources, year, page URLs and format, then crawls the
/// selection concurrently.
async fn crawl_sources(multi: &MultiProgress) -> Result<(), CliError> {
    let configs = all_configs()?;

    let labels: Vec<String> = configs
        .iter()
        .map(|c| format!("{} ({})", c.id, c.name))
        .collect();

    let selected = MultiSelect::new()
        .with_prompt("Select sources to crawl (space=toggle, a=all, enter=confirm)")
        .items(&labels)
        .interact()?;

    if selected.is_empty() {
        println!("No sources selected.");
        return Ok(());
    }

    let year: u16 = Input::new()
        .with_prompt("Edition year")
        .default(2024)
        .interact_text()?;

    let mut requests = Vec::with_capacity(selected.len());
    for &i in &selected {
        let config = &configs[i];
        let page_url = if config.page_url.is_some() {
            None
        } else {
            let url: String = Input::new()
                .with_prompt(format!("Page URL for {}", config.id))
                .interact_text()?;
            Some(url.trim().to_owned())
        };
        requests.push(CrawlRequest::new(config.clone(), year, page_url)?);
    }

    let formats = [ExportFormat::Json, ExportFormat::Csv];
    let format_labels: Vec<String> = formats.iter().map(ToString::to_string).collect();
    let format_idx = Select::new()
        .with_prompt("Output format")
        .items(&format_labels)
        .default(0)
        .interact()?;

    let export = ExportOptions {
        output_dir: None,
        format: formats[format_idx],
    };
    let fetcher = crate::http_fetcher()?;

    let results = crawl_all(
        &requests,
        &fetcher,
        RetryPolicy::new(DEFAULT_RETRIES),
        &export,
        Some(multi),
    )
    .await;
    summarize(results)
}

/// Prints a table of all configured sources.
fn list_sources() -> Result<(), CliError> {
    let configs = all_configs()?;
    println!("{:<12} NAME", "ID");
    println!("{}", "-".repeat(50));
    for config in &configs {
        println!("{:<12} {}", config.id, config.name);
    }
    Ok(())
}
