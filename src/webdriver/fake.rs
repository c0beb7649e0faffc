// src/webdriver/fake.rs
//! Scripted in-memory [`Browser`] for deterministic engine tests.
//!
//! Models just enough of the news site to drive the collector: paginated
//! result items with title/description/timestamp/image children, the filter
//! panel labels, the pagination indicator, and overlay interception. Element
//! handles are structured ids like `item-<page>-<index>-title-text`, so
//! lookups stay trivially inspectable in test failures.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::utils::error::BrowserError;
use crate::webdriver::{Browser, ElementHandle, Locator};

const RESULT_ITEMS: &str = "div.SearchResultsModule-results div.PageList-items-item";
const FILTER_LABELS: &str = "div.SearchFilterInput div.CheckboxInput label.CheckboxInput-label";
const PAGE_COUNTS: &str = "div.Pagination-pageCounts";
const NEXT_PAGE: &str = "div.Pagination-nextPage";
const ONE_TRUST_ACCEPT_BTN: &str = "button#onetrust-accept-btn-handler";
const FANCYBOX_CLOSE_ANCHOR: &str = "a.fancybox-item.fancybox-close";

#[derive(Debug, Clone, Default)]
pub struct FakeArticle {
    pub title: String,
    pub description: String,
    /// `None` renders an article without a `bsp-timestamp` element.
    pub timestamp_ms: Option<i64>,
    /// `None` renders an article without an `img` element.
    pub image: Option<Vec<u8>>,
    /// Number of title reads that fail stale before one succeeds.
    pub stale_title_reads: u32,
}

impl FakeArticle {
    pub fn new(title: &str, description: &str, timestamp_ms: Option<i64>) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            timestamp_ms,
            image: Some(vec![0x89, b'P', b'N', b'G']),
            stale_title_reads: 0,
        }
    }

    pub fn stale_titles(mut self, reads: u32) -> Self {
        self.stale_title_reads = reads;
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = None;
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pages: Vec<Vec<FakeArticle>>,
    current_page: usize,
    filter_labels: Vec<String>,
    intercept_remaining: u32,
    navigations: Vec<String>,
    clicked_selectors: Vec<String>,
    clicked_labels: Vec<String>,
    dismissed: Vec<String>,
    typed: Vec<(String, String)>,
    selected: Vec<(String, String)>,
    next_page_clicks: u32,
    closed: bool,
}

/// Cloning shares the underlying state, so a test can keep a probe handle
/// while the collector owns the browser.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    pub fn new(pages: Vec<Vec<FakeArticle>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                pages,
                ..FakeState::default()
            })),
        }
    }

    pub fn with_filter_labels(self, labels: &[&str]) -> Self {
        self.lock().filter_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Makes the next `n` non-overlay clicks fail intercepted; the consent
    /// button reports visible while any interception is pending.
    pub fn with_intercepted_clicks(self, n: u32) -> Self {
        self.lock().intercept_remaining = n;
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn clicked_selectors(&self) -> Vec<String> {
        self.lock().clicked_selectors.clone()
    }

    pub fn clicked_labels(&self) -> Vec<String> {
        self.lock().clicked_labels.clone()
    }

    pub fn dismissed(&self) -> Vec<String> {
        self.lock().dismissed.clone()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    pub fn selected(&self) -> Vec<(String, String)> {
        self.lock().selected.clone()
    }

    pub fn next_page_clicks(&self) -> u32 {
        self.lock().next_page_clicks
    }

    pub fn closed(&self) -> bool {
        self.lock().closed
    }

    fn article_field(
        &self,
        id: &str,
    ) -> Result<(usize, usize, Vec<&'static str>), BrowserError> {
        let parts: Vec<&str> = id.split('-').collect();
        if parts.first() != Some(&"item") || parts.len() < 3 {
            return Err(BrowserError::NoSuchElement(format!("unknown handle {id}")));
        }
        let page = parts[1]
            .parse::<usize>()
            .map_err(|_| BrowserError::NoSuchElement(format!("unknown handle {id}")))?;
        let index = parts[2]
            .parse::<usize>()
            .map_err(|_| BrowserError::NoSuchElement(format!("unknown handle {id}")))?;
        let suffix = match &parts[3..] {
            [] => vec![],
            ["title"] => vec!["title"],
            ["title", "text"] => vec!["title", "text"],
            ["desc"] => vec!["desc"],
            ["desc", "text"] => vec!["desc", "text"],
            ["ts"] => vec!["ts"],
            ["img"] => vec!["img"],
            _ => return Err(BrowserError::NoSuchElement(format!("unknown handle {id}"))),
        };
        Ok((page, index, suffix))
    }
}

impl Browser for FakeBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.lock().navigations.push(url.to_string());
        Ok(())
    }

    async fn set_implicit_wait(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn is_visible(&self, css: &str) -> Result<bool, BrowserError> {
        if css == ONE_TRUST_ACCEPT_BTN {
            return Ok(self.lock().intercept_remaining > 0);
        }
        Ok(false)
    }

    async fn click(&self, target: Locator<'_>) -> Result<(), BrowserError> {
        let mut state = self.lock();
        match target {
            Locator::Css(css) => {
                if css == ONE_TRUST_ACCEPT_BTN || css == FANCYBOX_CLOSE_ANCHOR {
                    state.dismissed.push(css.to_string());
                    return Ok(());
                }
                if state.intercept_remaining > 0 {
                    state.intercept_remaining -= 1;
                    return Err(BrowserError::ClickIntercepted(format!(
                        "overlay covers {css}"
                    )));
                }
                state.clicked_selectors.push(css.to_string());
                if css == NEXT_PAGE && state.current_page + 1 < state.pages.len() {
                    state.current_page += 1;
                    state.next_page_clicks += 1;
                }
                Ok(())
            }
            Locator::Handle(handle) => {
                if state.intercept_remaining > 0 {
                    state.intercept_remaining -= 1;
                    return Err(BrowserError::ClickIntercepted(format!(
                        "overlay covers {}",
                        handle.0
                    )));
                }
                if let Some(rest) = handle.0.strip_prefix("label-") {
                    if let Ok(index) = rest.parse::<usize>() {
                        if let Some(label) = state.filter_labels.get(index) {
                            let label = label.clone();
                            state.clicked_labels.push(label);
                            return Ok(());
                        }
                    }
                    return Err(BrowserError::Stale(format!("label {rest} gone")));
                }
                state.clicked_selectors.push(handle.0.clone());
                Ok(())
            }
        }
    }

    async fn input_text(&self, css: &str, text: &str) -> Result<(), BrowserError> {
        self.lock().typed.push((css.to_string(), text.to_string()));
        Ok(())
    }

    async fn select_by_label(&self, css: &str, label: &str) -> Result<(), BrowserError> {
        self.lock()
            .selected
            .push((css.to_string(), label.to_string()));
        Ok(())
    }

    async fn find(&self, css: &str) -> Result<ElementHandle, BrowserError> {
        if css == PAGE_COUNTS {
            return Ok(ElementHandle("pagination".to_string()));
        }
        Err(BrowserError::NoSuchElement(css.to_string()))
    }

    async fn find_all(&self, css: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        let state = self.lock();
        match css {
            RESULT_ITEMS => {
                let page = state.current_page;
                let items = state.pages.get(page).map(Vec::len).unwrap_or(0);
                Ok((0..items)
                    .map(|i| ElementHandle(format!("item-{page}-{i}")))
                    .collect())
            }
            FILTER_LABELS => Ok((0..state.filter_labels.len())
                .map(|i| ElementHandle(format!("label-{i}")))
                .collect()),
            _ => Ok(vec![]),
        }
    }

    async fn find_in(
        &self,
        scope: &ElementHandle,
        css: &str,
    ) -> Result<ElementHandle, BrowserError> {
        let (page, index, suffix) = self.article_field(&scope.0)?;
        let state = self.lock();
        let article = state
            .pages
            .get(page)
            .and_then(|p| p.get(index))
            .ok_or_else(|| BrowserError::Stale(scope.0.clone()))?;

        let child = match (suffix.as_slice(), css) {
            ([], ".PagePromo-title") => "title",
            ([], ".PagePromo-description") => "desc",
            ([], "bsp-timestamp") => {
                if article.timestamp_ms.is_none() {
                    return Err(BrowserError::NoSuchElement(format!(
                        "no bsp-timestamp in {}",
                        scope.0
                    )));
                }
                "ts"
            }
            ([], "img") => {
                if article.image.is_none() {
                    return Err(BrowserError::NoSuchElement(format!(
                        "no img in {}",
                        scope.0
                    )));
                }
                "img"
            }
            (["title"], ".PagePromoContentIcons-text") => "title-text",
            (["desc"], ".PagePromoContentIcons-text") => "desc-text",
            _ => {
                return Err(BrowserError::NoSuchElement(format!(
                    "{css} within {}",
                    scope.0
                )))
            }
        };
        Ok(ElementHandle(format!("item-{page}-{index}-{child}")))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        if element.0 == "pagination" {
            let state = self.lock();
            return Ok(format!(
                "{} of {}",
                state.current_page + 1,
                state.pages.len()
            ));
        }
        if let Some(rest) = element.0.strip_prefix("label-") {
            let state = self.lock();
            return rest
                .parse::<usize>()
                .ok()
                .and_then(|i| state.filter_labels.get(i).cloned())
                .ok_or_else(|| BrowserError::Stale(element.0.clone()));
        }

        let (page, index, suffix) = self.article_field(&element.0)?;
        let mut state = self.lock();
        let article = state
            .pages
            .get_mut(page)
            .and_then(|p| p.get_mut(index))
            .ok_or_else(|| BrowserError::Stale(element.0.clone()))?;
        match suffix.as_slice() {
            ["title", "text"] => {
                if article.stale_title_reads > 0 {
                    article.stale_title_reads -= 1;
                    return Err(BrowserError::Stale(element.0.clone()));
                }
                Ok(article.title.clone())
            }
            ["desc", "text"] => Ok(article.description.clone()),
            _ => Err(BrowserError::NoSuchElement(element.0.clone())),
        }
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let (page, index, suffix) = self.article_field(&element.0)?;
        let state = self.lock();
        let article = state
            .pages
            .get(page)
            .and_then(|p| p.get(index))
            .ok_or_else(|| BrowserError::Stale(element.0.clone()))?;
        if suffix.as_slice() == ["ts"] && name == "data-timestamp" {
            return Ok(article.timestamp_ms.map(|ms| ms.to_string()));
        }
        Ok(None)
    }

    async fn screenshot(&self, element: &ElementHandle) -> Result<Vec<u8>, BrowserError> {
        let (page, index, suffix) = self.article_field(&element.0)?;
        let state = self.lock();
        let article = state
            .pages
            .get(page)
            .and_then(|p| p.get(index))
            .ok_or_else(|| BrowserError::Stale(element.0.clone()))?;
        if suffix.as_slice() == ["img"] {
            if let Some(bytes) = &article.image {
                return Ok(bytes.clone());
            }
        }
        Err(BrowserError::NoSuchElement(element.0.clone()))
    }

    async fn wait_until_present(
        &self,
        _element: &ElementHandle,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.lock().closed = true;
        Ok(())
    }
}
