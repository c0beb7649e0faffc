// src/collector/actions.rs
//! Bounded-retry wrappers around the blocking browser interactions.
//!
//! Exhausting the retry budget gives up silently: callers get `Ok(())` with
//! no way to tell whether the action landed. That mirrors the site's
//! best-effort interaction model; the collection loop's fault budget is what
//! ultimately bounds the damage.

use std::future::Future;

use crate::utils::error::BrowserError;
use crate::webdriver::{Browser, Locator};

const ATTEMPTS: u32 = 5;

pub(crate) const ONE_TRUST_ACCEPT_BTN: &str = "button#onetrust-accept-btn-handler";
pub(crate) const FANCYBOX_CLOSE_ANCHOR: &str = "a.fancybox-item.fancybox-close";

/// Dismisses overlay UI known to block clicks on the site.
async fn check_modals<B: Browser>(browser: &B) -> Result<(), BrowserError> {
    if browser.is_visible(ONE_TRUST_ACCEPT_BTN).await? {
        browser.click(Locator::Css(ONE_TRUST_ACCEPT_BTN)).await?;
        tracing::info!("OneTrust modal accepted.");
    }
    if browser.is_visible(FANCYBOX_CLOSE_ANCHOR).await? {
        browser.click(Locator::Css(FANCYBOX_CLOSE_ANCHOR)).await?;
        tracing::info!("Fancybox modal closed.");
    }
    Ok(())
}

async fn resilient<B, F, Fut>(browser: &B, what: &str, mut act: F) -> Result<(), BrowserError>
where
    B: Browser,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), BrowserError>>,
{
    let mut attempts = ATTEMPTS;
    while attempts > 0 {
        match act().await {
            Ok(()) => return Ok(()),
            Err(BrowserError::ClickIntercepted(msg)) => {
                check_modals(browser).await?;
                attempts -= 1;
                tracing::warn!(action = what, error = %msg, remaining = attempts, "click intercepted");
            }
            Err(err) if err.is_transient() => {
                attempts -= 1;
                tracing::warn!(action = what, error = %err, remaining = attempts, "transient failure");
            }
            Err(err) => return Err(err),
        }
    }
    tracing::warn!(action = what, attempts = ATTEMPTS, "giving up; action may not have occurred");
    Ok(())
}

pub async fn secure_click<B: Browser>(
    browser: &B,
    target: Locator<'_>,
) -> Result<(), BrowserError> {
    resilient(browser, "click", || browser.click(target)).await
}

pub async fn secure_input_text<B: Browser>(
    browser: &B,
    css: &str,
    text: &str,
) -> Result<(), BrowserError> {
    resilient(browser, "input_text", || browser.input_text(css, text)).await
}

pub async fn secure_select_by_label<B: Browser>(
    browser: &B,
    css: &str,
    label: &str,
) -> Result<(), BrowserError> {
    resilient(browser, "select_by_label", || browser.select_by_label(css, label)).await
}
