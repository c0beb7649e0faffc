// src/extractors/news.rs

// --- Imports ---
use std::future::Future;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::storage::StorageManager;
use crate::utils::calendar;
use crate::utils::error::{AppError, BrowserError};
use crate::webdriver::{Browser, ElementHandle};

// --- Constants ---
/// Retry budget for every per-field read.
const ATTEMPTS: u32 = 5;

const TITLE_CONTAINER: &str = ".PagePromo-title";
const DESCRIPTION_CONTAINER: &str = ".PagePromo-description";
const PROMO_TEXT: &str = ".PagePromoContentIcons-text";
const TIMESTAMP_TAG: &str = "bsp-timestamp";
const TIMESTAMP_ATTR: &str = "data-timestamp";
const IMAGE_TAG: &str = "img";

// --- Regex Patterns (Lazy Static) ---
// Possible formats: $11.1 | $111,111.11 | 11 dollars | 11 USD
static MONEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\$(\d|[1-9]\d*)\.\d($|\D)",
        r"|\$(\d|[1-9]\d{0,2}(,\d{3})*)\.\d\d($|\D)",
        r"|(^|\D)(\d|[1-9]\d*) dollars",
        r"|(^|\D)(\d|[1-9]\d*) USD",
    ))
    .expect("Failed to compile MONEY_RE")
});

// --- Data Structures ---
/// One scraped article, as it will be persisted.
#[derive(Debug, Clone, Default)]
pub struct NewsItem {
    pub title: String,
    /// `None` after persistent extraction failure; such items are never
    /// persisted and charge the caller's fault budget.
    pub date: Option<NaiveDateTime>,
    pub description: String,
    /// Content-addressed filename, empty when the article has no image.
    pub picture: String,
    pub count: usize,
    pub money: bool,
}

// --- Retry-then-default combinator ---

enum Disposition {
    /// Transient lookup failure; re-query the DOM from scratch.
    Retry,
    /// The field's source definitively does not exist; keep the default.
    Empty,
    /// Unexpected failure; propagate.
    Fatal,
}

fn transient_retries(err: &BrowserError) -> Disposition {
    if err.is_transient() {
        Disposition::Retry
    } else {
        Disposition::Fatal
    }
}

/// Picture only: a missing `img` element means the article genuinely has no
/// image, while a stale handle is still worth another attempt.
fn absence_is_empty(err: &BrowserError) -> Disposition {
    match err {
        BrowserError::NoSuchElement(_) => Disposition::Empty,
        BrowserError::Stale(_) => Disposition::Retry,
        _ => Disposition::Fatal,
    }
}

/// Runs `read` up to [`ATTEMPTS`] times, classifying each failure. Exhaustion
/// is a soft-fail: the caller keeps the field's default value.
async fn retry_to_default<T, F, Fut>(
    field: &str,
    classify: fn(&BrowserError) -> Disposition,
    mut read: F,
) -> Result<Option<T>, BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BrowserError>>,
{
    let mut attempts = ATTEMPTS;
    while attempts > 0 {
        match read().await {
            Ok(value) => return Ok(Some(value)),
            Err(err) => match classify(&err) {
                Disposition::Retry => {
                    attempts -= 1;
                    tracing::info!(field, error = %err, remaining = attempts, "retrying field read");
                }
                Disposition::Empty => {
                    tracing::info!(field, error = %err, "field source missing");
                    return Ok(None);
                }
                Disposition::Fatal => return Err(err),
            },
        }
    }
    Ok(None)
}

// --- Field readers ---

async fn read_promo_text<B: Browser>(
    browser: &B,
    element: &ElementHandle,
    container: &str,
) -> Result<String, BrowserError> {
    let wrap = browser.find_in(element, container).await?;
    let text_element = browser.find_in(&wrap, PROMO_TEXT).await?;
    browser.text(&text_element).await
}

async fn read_date<B: Browser>(
    browser: &B,
    element: &ElementHandle,
) -> Result<NaiveDateTime, BrowserError> {
    let marker = browser.find_in(element, TIMESTAMP_TAG).await?;
    let raw = browser
        .attribute(&marker, TIMESTAMP_ATTR)
        .await?
        .ok_or_else(|| BrowserError::Decode(format!("missing {TIMESTAMP_ATTR} attribute")))?;
    let millis = raw
        .parse::<i64>()
        .map_err(|_| BrowserError::Decode(format!("bad {TIMESTAMP_ATTR} value {raw:?}")))?;
    calendar::from_epoch_millis(millis)
        .ok_or_else(|| BrowserError::Decode(format!("epoch millis out of range: {millis}")))
}

async fn capture_image<B: Browser>(
    browser: &B,
    element: &ElementHandle,
) -> Result<Vec<u8>, BrowserError> {
    let image = browser.find_in(element, IMAGE_TAG).await?;
    browser.screenshot(&image).await
}

// --- Derived fields ---

fn phrase_count(phrase: &str, title: &str, description: &str) -> usize {
    title.matches(phrase).count() + description.matches(phrase).count()
}

fn detect_money(title: &str, description: &str) -> bool {
    MONEY_RE.is_match(title) || MONEY_RE.is_match(description)
}

// --- Extractor ---

/// Builds one [`NewsItem`] from a search-result element.
///
/// Every field degrades to its default on persistent lookup failure; only
/// unexpected browser or storage errors surface as `Err`.
pub async fn extract<B: Browser>(
    browser: &B,
    storage: &StorageManager,
    element: &ElementHandle,
    search_phrase: &str,
) -> Result<NewsItem, AppError> {
    let title = retry_to_default("title", transient_retries, || {
        read_promo_text(browser, element, TITLE_CONTAINER)
    })
    .await?
    .unwrap_or_default();

    let date = retry_to_default("date", transient_retries, || read_date(browser, element)).await?;

    let description = retry_to_default("description", transient_retries, || {
        read_promo_text(browser, element, DESCRIPTION_CONTAINER)
    })
    .await?
    .unwrap_or_default();

    let picture = match retry_to_default("picture", absence_is_empty, || {
        capture_image(browser, element)
    })
    .await?
    {
        Some(bytes) => storage.save_picture(&bytes)?,
        None => String::new(),
    };

    let count = phrase_count(search_phrase, &title, &description);
    let money = detect_money(&title, &description);

    Ok(NewsItem {
        title,
        date,
        description,
        picture,
        count,
        money,
    })
}
