// src/webdriver/mod.rs
//! Browser capability surface consumed by the collection engine.
//!
//! The engine never talks to a concrete automation backend directly; it sees
//! only the [`Browser`] trait. Production runs use [`client::WebDriverClient`]
//! (W3C WebDriver over HTTP), tests use a scripted in-memory fake.

pub mod client;
pub mod models;

#[cfg(test)]
pub mod fake;

use std::time::Duration;

use crate::utils::error::BrowserError;

/// Opaque reference to a live DOM element held by the backend.
///
/// Handles can go stale when the page re-renders; every consumer treats
/// [`BrowserError::Stale`] as a retryable condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// What to act on: a CSS selector resolved fresh per attempt, or an element
/// handle obtained from an earlier enumeration.
#[derive(Debug, Clone, Copy)]
pub enum Locator<'a> {
    Css(&'a str),
    Handle(&'a ElementHandle),
}

impl std::fmt::Display for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "css:{css}"),
            Locator::Handle(handle) => write!(f, "element:{}", handle.0),
        }
    }
}

/// One blocking browser session. All calls run sequentially on the single
/// underlying page; there is no tab or window management.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Navigates the session to `url`.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Configures the backend's implicit wait applied to element lookups.
    async fn set_implicit_wait(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// Whether an element matching `css` exists and is displayed.
    /// Absence is reported as `false`, not as an error.
    async fn is_visible(&self, css: &str) -> Result<bool, BrowserError>;

    async fn click(&self, target: Locator<'_>) -> Result<(), BrowserError>;

    async fn input_text(&self, css: &str, text: &str) -> Result<(), BrowserError>;

    /// Picks the option whose visible label equals `label` from the `select`
    /// element matching `css`.
    async fn select_by_label(&self, css: &str, label: &str) -> Result<(), BrowserError>;

    /// First element matching `css`, page-scoped.
    async fn find(&self, css: &str) -> Result<ElementHandle, BrowserError>;

    /// All elements matching `css` in document order. An empty match is not
    /// an error.
    async fn find_all(&self, css: &str) -> Result<Vec<ElementHandle>, BrowserError>;

    /// First element matching `css` inside `scope`.
    async fn find_in(
        &self,
        scope: &ElementHandle,
        css: &str,
    ) -> Result<ElementHandle, BrowserError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Screenshot of just this element, as PNG bytes.
    async fn screenshot(&self, element: &ElementHandle) -> Result<Vec<u8>, BrowserError>;

    /// Polls until `element` is reachable again or `timeout` elapses; the
    /// last transient error is returned on expiry.
    async fn wait_until_present(
        &self,
        element: &ElementHandle,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Ends the session. The handle must not be used afterwards.
    async fn close(&self) -> Result<(), BrowserError>;
}
