// src/collector/mod.rs
//! News collection engine for the Associated Press website.
//!
//! The engine queries the site with a search phrase, applies the requested
//! sort order and category filters, then walks the paginated results
//! collecting articles until the recency cutoff, wall-clock deadline, fault
//! budget, or last page ends the run.

pub mod actions;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use crate::extractors::news;
use crate::storage::{NewsSink, StorageManager};
use crate::utils::calendar;
use crate::utils::error::{AppError, BrowserError};
use crate::webdriver::{Browser, Locator};
use actions::{secure_click, secure_input_text, secure_select_by_label};

pub const SITE_URL: &str = "https://apnews.com/";

/// Consecutive non-qualifying items tolerated before the scan aborts.
const FAULTS_TOLERANCE: u32 = 5;
const IMPLICIT_WAIT: Duration = Duration::from_secs(5);
const ELEMENT_WAIT: Duration = Duration::from_secs(5);

const SEARCH_BUTTON: &str = "button.SearchOverlay-search-button";
const SEARCH_INPUT: &str = r#"input.SearchOverlay-search-input[name="q"]"#;
const SEARCH_SUBMIT: &str = "button.SearchOverlay-search-submit";
const SORT_SELECT: &str = r#"select.Select-input[name="s"]"#;
const FILTER_HEADING: &str = "div.SearchFilter-heading";
const FILTER_LABELS: &str = "div.SearchFilterInput div.CheckboxInput label.CheckboxInput-label";
const RESULT_ITEMS: &str = "div.SearchResultsModule-results div.PageList-items-item";
const PAGE_COUNTS: &str = "div.Pagination-pageCounts";
const NEXT_PAGE: &str = "div.Pagination-nextPage";

/// Immutable per-session search parameters.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub search_phrase: String,
    /// Lower-cased category labels still to be matched; empty means no filter.
    pub categories: HashSet<String>,
    pub sort_by: Option<String>,
    /// Maximum allowed month distance after normalization.
    pub cutoff_months: u32,
    pub started_at: NaiveDateTime,
    pub deadline: Instant,
}

impl SearchCriteria {
    pub fn new(
        search_phrase: String,
        categories: &str,
        months: u32,
        sort_by: Option<String>,
        timeout: Duration,
    ) -> Self {
        let categories = categories
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        // "0 months" and "1 month" both mean the current month
        let cutoff_months = months.saturating_sub(1);
        Self {
            search_phrase,
            categories,
            sort_by,
            cutoff_months,
            started_at: Local::now().naive_local(),
            deadline: Instant::now() + timeout,
        }
    }
}

/// Shared countdown of tolerated misses: extraction failures and stale
/// articles both charge it, any persisted item refills it.
#[derive(Debug)]
struct FaultBudget {
    remaining: u32,
}

impl FaultBudget {
    fn new() -> Self {
        Self {
            remaining: FAULTS_TOLERANCE,
        }
    }

    fn charge(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn reset(&mut self) {
        self.remaining = FAULTS_TOLERANCE;
    }

    fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Parses the "current of total" pagination indicator.
fn parse_page_counts(text: &str) -> Result<(u64, u64), AppError> {
    let malformed = || AppError::Collect(format!("malformed page indicator: {text:?}"));
    let (current, total) = text.trim().split_once(" of ").ok_or_else(malformed)?;
    let parse = |s: &str| s.trim().replace(',', "").parse::<u64>().map_err(|_| malformed());
    Ok((parse(current)?, parse(total)?))
}

pub struct NewsCollector<B, S> {
    browser: B,
    sink: S,
    storage: StorageManager,
    criteria: SearchCriteria,
}

impl<B: Browser, S: NewsSink> NewsCollector<B, S> {
    pub fn new(browser: B, sink: S, storage: StorageManager, criteria: SearchCriteria) -> Self {
        Self {
            browser,
            sink,
            storage,
            criteria,
        }
    }

    /// Runs the whole session: navigate, search, filter, collect, save.
    pub async fn run(&mut self) -> Result<(), AppError> {
        self.open_site().await?;
        self.search().await?;
        self.filter().await?;
        self.collect_pages().await?;
        self.sink.save()?;
        self.browser.close().await?;
        Ok(())
    }

    async fn open_site(&self) -> Result<(), BrowserError> {
        self.browser.goto(SITE_URL).await?;
        self.browser.set_implicit_wait(IMPLICIT_WAIT).await
    }

    /// Seeks news using the search phrase.
    async fn search(&self) -> Result<(), BrowserError> {
        secure_click(&self.browser, Locator::Css(SEARCH_BUTTON)).await?;
        secure_input_text(&self.browser, SEARCH_INPUT, &self.criteria.search_phrase).await?;
        secure_click(&self.browser, Locator::Css(SEARCH_SUBMIT)).await
    }

    /// Sorts the results and applies the category checkboxes.
    ///
    /// The panel may re-render after every click, so each match restarts the
    /// scan; labels never found on the page are silently ignored.
    async fn filter(&self) -> Result<(), AppError> {
        if let Some(sort_by) = &self.criteria.sort_by {
            secure_select_by_label(&self.browser, SORT_SELECT, sort_by).await?;
        }

        let mut pending = self.criteria.categories.clone();
        let mut found = !pending.is_empty();
        while found {
            found = false;
            secure_click(&self.browser, Locator::Css(FILTER_HEADING)).await?;

            for label in self.browser.find_all(FILTER_LABELS).await? {
                let text = self.browser.text(&label).await?.to_lowercase();
                if pending.remove(&text) {
                    secure_click(&self.browser, Locator::Handle(&label)).await?;
                    found = !pending.is_empty();
                    break;
                }
            }
        }
        Ok(())
    }

    /// Walks the result pages within the requested months.
    async fn collect_pages(&mut self) -> Result<(), AppError> {
        let mut budget = FaultBudget::new();

        while !budget.exhausted() {
            for element in self.browser.find_all(RESULT_ITEMS).await? {
                if Instant::now() >= self.criteria.deadline {
                    tracing::info!("wall-clock deadline reached, stopping collection");
                    return Ok(());
                }
                if budget.exhausted() {
                    tracing::info!("fault budget exhausted, stopping collection");
                    return Ok(());
                }

                self.browser.wait_until_present(&element, ELEMENT_WAIT).await?;
                let item = news::extract(
                    &self.browser,
                    &self.storage,
                    &element,
                    &self.criteria.search_phrase,
                )
                .await?;

                let Some(date) = item.date else {
                    budget.charge();
                    tracing::info!(remaining = budget.remaining, "skipped item without a date");
                    continue;
                };

                if calendar::months_between(date, self.criteria.started_at)
                    > self.criteria.cutoff_months
                {
                    budget.charge();
                    tracing::info!(
                        remaining = budget.remaining,
                        date = %calendar::format_date(&date),
                        "skipped item older than cutoff"
                    );
                    continue;
                }

                self.sink.append(&item)?;
                budget.reset();
            }

            let counts = self.browser.find(PAGE_COUNTS).await?;
            let indicator = self.browser.text(&counts).await?;
            let (current, total) = parse_page_counts(&indicator)?;
            if current < total {
                secure_click(&self.browser, Locator::Css(NEXT_PAGE)).await?;
            } else {
                tracing::info!(pages = total, "no more result pages");
                return Ok(());
            }
        }
        Ok(())
    }
}
