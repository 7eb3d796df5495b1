// src/lib.rs

//! Locates the primary financial statements inside bank annual-report
//! text and normalizes their extracted tables into a canonical report.
//!
//! Location fuses three independent detectors (table-of-contents
//! parsing, heading scan, layout analysis) into ranked page candidates.
//! Extraction interprets table columns, parses reported figures and
//! maps row labels onto a canonical field schema.

pub mod config;
pub mod document;
pub mod extractors;
pub mod locator;
pub mod mapper;
pub mod schema;
pub mod storage;
pub mod utils;
pub mod validation;

// Re-export the surface a typical caller touches.
pub use config::ExtractorConfig;
pub use document::{DocumentText, ExtractionInput, PageProvider};
pub use locator::{LocationMap, PageCandidate, PageLocator, PageRange};
pub use schema::{CanonicalBuilder, CanonicalReport, StatementType};
pub use utils::AppError;
