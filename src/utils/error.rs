// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Stale element reference: {0}")]
    Stale(String),

    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("WebDriver protocol error {error}: {message}")]
    Protocol { error: String, message: String },

    #[error("Failed to decode WebDriver payload: {0}")]
    Decode(String),
}

impl BrowserError {
    /// Lookup failures that a bounded retry can recover from: the element is
    /// not in the DOM yet, or the handle went stale after a re-render.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrowserError::NoSuchElement(_) | BrowserError::Stale(_))
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Browser interaction failed: {0}")]
    Browser(#[from] BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Collection failed: {0}")]
    Collect(String),
}
