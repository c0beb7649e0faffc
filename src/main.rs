// src/main.rs
mod collector;
mod extractors;
mod storage;
mod utils;
mod webdriver;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use collector::{NewsCollector, SearchCriteria};
use storage::{StorageManager, XlsxSink};
use utils::AppError;
use webdriver::client::WebDriverClient;

/// Command Line Interface for the AP News collection engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Phrase to search the news site for
    #[arg(short, long)]
    search_phrase: Option<String>,

    /// Comma-separated category labels to filter the results by
    #[arg(short, long, default_value = "")]
    categories: String,

    /// How many months back an article may date from (0 means this month)
    #[arg(short, long, default_value_t = 0)]
    months: u32,

    /// Sort order label to pick from the results dropdown
    #[arg(long, default_value = "Newest")]
    sort_by: String,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long, default_value_t = 170)]
    timeout_secs: u64,

    /// Output directory for the workbook and pictures
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Base URL of a running WebDriver server
    #[arg(long, default_value = "http://localhost:4444")]
    webdriver_url: String,

    /// Launch this geckodriver binary instead of expecting a running server
    #[arg(long)]
    driver: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// JSON work item file providing search_phrase/categories/months
    #[arg(long)]
    work_item: Option<PathBuf>,
}

/// Input payload, mirroring the hosted work item contract.
#[derive(Debug, Default, Deserialize)]
struct WorkItem {
    #[serde(default)]
    search_phrase: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    months: u32,
}

impl WorkItem {
    fn resolve(args: &Args) -> Result<WorkItem, AppError> {
        if let Some(path) = &args.work_item {
            let raw = std::fs::read_to_string(path)?;
            return serde_json::from_str(&raw)
                .map_err(|e| AppError::Config(format!("invalid work item file: {e}")));
        }
        Ok(WorkItem {
            search_phrase: args.search_phrase.clone().unwrap_or_default(),
            categories: args.categories.clone(),
            months: args.months,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI arguments and resolve the work item
    let args = Args::parse();
    tracing::info!("Starting collection for args: {:?}", args);

    let work_item = WorkItem::resolve(&args)?;
    if work_item.search_phrase.trim().is_empty() {
        // Missing input ends the task without surfacing an error to the host
        tracing::warn!("No search phrase provided; nothing to collect.");
        return Ok(());
    }

    // 3. Initialize storage and the workbook sink
    let storage = StorageManager::new(&args.output_dir)?;
    let sink = XlsxSink::create(storage.workbook_path())?;

    // 4. Bring up the browser session
    let driver = match &args.driver {
        Some(cmd) => Some(
            WebDriverClient::launch_driver(cmd, &args.webdriver_url, &storage.driver_log_path())
                .await?,
        ),
        None => None,
    };
    let browser = WebDriverClient::connect(&args.webdriver_url, !args.headed, driver).await?;

    // 5. Run the collection engine
    let criteria = SearchCriteria::new(
        work_item.search_phrase,
        &work_item.categories,
        work_item.months,
        Some(args.sort_by).filter(|s| !s.is_empty()),
        Duration::from_secs(args.timeout_secs),
    );
    let mut engine = NewsCollector::new(browser, sink, storage, criteria);
    engine.run().await?;

    tracing::info!("Collection finished.");
    Ok(())
}
