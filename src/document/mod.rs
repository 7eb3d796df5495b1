// src/document/mod.rs

// --- Imports ---
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::StatementType;
use crate::utils::error::DocumentError;

/// Read access to a document's pages as plain text.
///
/// The provider upstream (PDF text layer, OCR, test fixture) is out of
/// scope; everything in this crate consumes pages through this trait.
/// Page access is fallible per page so a bad page degrades locally.
pub trait PageProvider {
    fn page_count(&self) -> usize;

    /// Plain text of the page at `index` (0-based).
    fn page_text(&self, index: usize) -> Result<&str, DocumentError>;
}

/// In-memory document: one string per page, in page order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentText {
    /// Display name of the source document (e.g. the original filename).
    pub source: String,
    pub pages: Vec<String>,
}

impl DocumentText {
    pub fn new(source: impl Into<String>, pages: Vec<String>) -> Self {
        Self { source: source.into(), pages }
    }

    /// Stem used for output artifact filenames.
    pub fn name(&self) -> &str {
        let stem = self.source.rsplit('/').next().unwrap_or(&self.source);
        stem.strip_suffix(".pdf").unwrap_or(stem)
    }
}

impl PageProvider for DocumentText {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<&str, DocumentError> {
        self.pages
            .get(index)
            .map(|p| p.as_str())
            .ok_or(DocumentError::PageOutOfRange { page: index, total: self.pages.len() })
    }
}

/// One pre-extracted raw table: header rows on top of data rows, cells
/// still untouched strings. Table extraction itself happens upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub header_rows: Vec<Vec<String>>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// A single data row: the leftmost label cell plus the remaining cells
/// in column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    #[serde(default)]
    pub cells: Vec<String>,
}

/// Top-level input file for the pipeline binary: the document pages and,
/// optionally, raw tables already extracted for some statement types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionInput {
    pub document: DocumentText,
    #[serde(default)]
    pub tables: BTreeMap<StatementType, RawTable>,
}

impl ExtractionInput {
    /// Loads an extraction input from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let input: ExtractionInput = serde_json::from_str(&raw)
            .map_err(|e| DocumentError::Parse(e.to_string()))?;

        if input.document.pages.is_empty() {
            return Err(DocumentError::Empty);
        }

        tracing::debug!(
            "Loaded document '{}' ({} pages, {} raw tables)",
            input.document.source,
            input.document.pages.len(),
            input.tables.len()
        );
        Ok(input)
    }
}
