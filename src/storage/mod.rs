// src/storage/mod.rs
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use sha1::{Digest, Sha1};

use crate::extractors::news::NewsItem;
use crate::utils::calendar;
use crate::utils::error::StorageError;

pub const WORKBOOK_FILENAME: &str = "apnews.xlsx";
pub const DRIVER_LOG_FILENAME: &str = "geckodriver.log";
pub const SHEET_NAME: &str = "Fresh News";

const COLUMNS: [&str; 6] = ["Title", "Date", "Description", "Picture", "Count", "Money"];

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager rooted at `base_dir`, creating the
    /// directory if needed.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self { base_dir: base_path })
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.base_dir.join(WORKBOOK_FILENAME)
    }

    pub fn driver_log_path(&self) -> PathBuf {
        self.base_dir.join(DRIVER_LOG_FILENAME)
    }

    /// Writes screenshot bytes under a content-addressed name. Identical
    /// images across articles collapse into one file.
    pub fn save_picture(&self, bytes: &[u8]) -> Result<String, StorageError> {
        let digest = Sha1::digest(bytes);
        let mut filename = String::with_capacity(44);
        for byte in digest {
            let _ = write!(filename, "{byte:02x}");
        }
        filename.push_str(".png");

        fs::write(self.base_dir.join(&filename), bytes)?;
        tracing::debug!(file = %filename, bytes = bytes.len(), "saved picture");

        Ok(filename)
    }
}

/// Row-oriented output for collected news. One implementation writes the
/// workbook; tests substitute a recording double.
pub trait NewsSink {
    fn append(&mut self, item: &NewsItem) -> Result<(), StorageError>;
    fn save(&mut self) -> Result<(), StorageError>;
}

/// Workbook sink. The header row is written at creation, data rows are
/// appended in collection order, and nothing touches disk until `save`.
pub struct XlsxSink {
    workbook: Workbook,
    path: PathBuf,
    next_row: u32,
}

impl XlsxSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;
        for (col, header) in COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *header)?;
        }
        Ok(Self {
            workbook,
            path: path.as_ref().to_path_buf(),
            next_row: 1,
        })
    }
}

impl NewsSink for XlsxSink {
    fn append(&mut self, item: &NewsItem) -> Result<(), StorageError> {
        let sheet = self.workbook.worksheet_from_index(0)?;
        let row = self.next_row;

        sheet.write_string(row, 0, &item.title)?;
        let date = item.date.as_ref().map(calendar::format_date).unwrap_or_default();
        sheet.write_string(row, 1, &date)?;
        sheet.write_string(row, 2, &item.description)?;
        sheet.write_string(row, 3, &item.picture)?;
        sheet.write_number(row, 4, item.count as f64)?;
        sheet.write_boolean(row, 5, item.money)?;

        self.next_row += 1;
        Ok(())
    }

    fn save(&mut self) -> Result<(), StorageError> {
        self.workbook.save(&self.path)?;
        tracing::info!(path = %self.path.display(), rows = self.next_row - 1, "workbook saved");
        Ok(())
    }
}
