// src/locator/mod.rs

// --- Imports ---
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::document::PageProvider;
use crate::schema::StatementType;
use crate::utils::error::LocateError;

pub mod heading_scanner;
pub mod layout_analyzer;
pub mod page_locator;
pub mod toc_detector;

pub use heading_scanner::HeadingScanner;
pub use layout_analyzer::LayoutAnalyzer;
pub use page_locator::PageLocator;
pub use toc_detector::TocDetector;

/// Ranked candidates per statement type, as produced by `PageLocator::locate`.
pub type LocationMap = BTreeMap<StatementType, Vec<PageCandidate>>;

// --- Page Ranges ---

/// Inclusive, non-empty run of 0-based page indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "PageRange start must not exceed end");
        Self { start, end }
    }

    pub fn single(page: usize) -> Self {
        Self { start: page, end: page }
    }

    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, page: usize) -> bool {
        page >= self.start && page <= self.end
    }

    /// Number of pages strictly between the two ranges; 0 when they
    /// overlap or touch.
    pub fn gap(&self, other: &PageRange) -> usize {
        if self.end < other.start {
            other.start - self.end - 1
        } else if other.end < self.start {
            self.start - other.end - 1
        } else {
            0
        }
    }

    /// Smallest range covering both.
    pub fn union_span(&self, other: &PageRange) -> PageRange {
        PageRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Clips the range to a document of `page_count` pages; `None` when
    /// nothing of it lies inside the document.
    pub fn clamp_to(&self, page_count: usize) -> Option<PageRange> {
        if page_count == 0 || self.start >= page_count {
            return None;
        }
        Some(PageRange::new(self.start, self.end.min(page_count - 1)))
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

// --- Evidence ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    TocEntry,
    TocOffset,
    Heading,
    Layout,
}

/// One human-auditable observation backing a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: EvidenceKind,
    pub detail: String,
    pub weight: f64,
}

impl EvidenceItem {
    pub fn new(kind: EvidenceKind, detail: impl Into<String>, weight: f64) -> Self {
        Self { kind, detail: detail.into(), weight: weight.clamp(0.0, 1.0) }
    }
}

// --- Detector Identity ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorSource {
    Toc,
    HeadingScan,
    LayoutAnalysis,
}

impl DetectorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorSource::Toc => "toc",
            DetectorSource::HeadingScan => "heading_scan",
            DetectorSource::LayoutAnalysis => "layout_analysis",
        }
    }
}

impl fmt::Display for DetectorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Candidates ---

/// A scored page-range guess for one statement type, with the evidence
/// that produced it. Constructed once; fusion builds new candidates
/// rather than mutating members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCandidate {
    pub statement_type: StatementType,
    pub pages: PageRange,
    pub confidence: f64,
    pub evidence: Vec<EvidenceItem>,
    pub sources: BTreeSet<DetectorSource>,
}

impl PageCandidate {
    /// Single-source candidate as emitted by a detector.
    pub fn new(
        statement_type: StatementType,
        pages: PageRange,
        confidence: f64,
        evidence: Vec<EvidenceItem>,
        source: DetectorSource,
    ) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source);
        Self {
            statement_type,
            pages,
            confidence: confidence.clamp(0.0, 1.0),
            evidence,
            sources,
        }
    }
}

// --- Cooperative Early Stop ---

/// Shared stop signal: once every statement type holds a candidate at or
/// above the threshold, page loops in later detector passes bail out.
/// Atomic so detectors may also run in parallel.
#[derive(Debug)]
pub struct ScanControl {
    threshold: f64,
    satisfied: [AtomicBool; 3],
}

impl ScanControl {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            satisfied: [AtomicBool::new(false), AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    fn slot(statement: StatementType) -> usize {
        match statement {
            StatementType::IncomeStatement => 0,
            StatementType::FinancialPosition => 1,
            StatementType::CashFlow => 2,
        }
    }

    /// Records a candidate confidence for a statement type.
    pub fn record(&self, statement: StatementType, confidence: f64) {
        if confidence >= self.threshold {
            self.satisfied[Self::slot(statement)].store(true, Ordering::Relaxed);
        }
    }

    pub fn is_satisfied(&self, statement: StatementType) -> bool {
        self.satisfied[Self::slot(statement)].load(Ordering::Relaxed)
    }

    /// True once every statement type is satisfied; detectors consult
    /// this inside their page loops.
    pub fn all_satisfied(&self) -> bool {
        self.satisfied.iter().all(|flag| flag.load(Ordering::Relaxed))
    }
}

// --- Uniform Detection Capability ---

/// Closed set of detection strategies. Each variant answers the same
/// question: where might `statement` live in `document`?
#[derive(Debug, Clone)]
pub enum Detector {
    Toc(TocDetector),
    Heading(HeadingScanner),
    Layout(LayoutAnalyzer),
}

impl Detector {
    pub fn source(&self) -> DetectorSource {
        match self {
            Detector::Toc(_) => DetectorSource::Toc,
            Detector::Heading(_) => DetectorSource::HeadingScan,
            Detector::Layout(_) => DetectorSource::LayoutAnalysis,
        }
    }

    pub fn detect<P: PageProvider + ?Sized>(
        &self,
        document: &P,
        statement: StatementType,
        control: &ScanControl,
    ) -> Result<Vec<PageCandidate>, LocateError> {
        match self {
            Detector::Toc(d) => d.detect(document, statement, control),
            Detector::Heading(d) => d.detect(document, statement, control),
            Detector::Layout(d) => d.detect(document, statement, control),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_gap_and_union() {
        let a = PageRange::single(5);
        let b = PageRange::single(6);
        let c = PageRange::single(8);

        assert_eq!(a.gap(&b), 0, "Adjacent pages have no gap");
        assert_eq!(a.gap(&c), 2);
        assert_eq!(c.gap(&a), 2, "Gap is symmetric");
        assert_eq!(a.union_span(&c), PageRange::new(5, 8));
        assert_eq!(PageRange::new(3, 7).gap(&PageRange::new(5, 9)), 0, "Overlap means zero gap");
    }

    #[test]
    fn test_page_range_clamp_to_document() {
        assert_eq!(PageRange::new(10, 14).clamp_to(12), Some(PageRange::new(10, 11)));
        assert_eq!(PageRange::new(10, 14).clamp_to(10), None, "Range past the end clips away");
        assert_eq!(PageRange::new(0, 0).clamp_to(0), None);
    }

    #[test]
    fn test_evidence_weight_is_clamped() {
        let item = EvidenceItem::new(EvidenceKind::Heading, "heading on page 3", 1.7);
        assert_eq!(item.weight, 1.0);
        let item = EvidenceItem::new(EvidenceKind::Layout, "weak signal", -0.2);
        assert_eq!(item.weight, 0.0);
    }

    #[test]
    fn test_candidate_confidence_is_clamped() {
        let candidate = PageCandidate::new(
            StatementType::CashFlow,
            PageRange::single(3),
            1.4,
            Vec::new(),
            DetectorSource::Toc,
        );
        assert_eq!(candidate.confidence, 1.0);
        assert!(candidate.sources.contains(&DetectorSource::Toc));
    }

    #[test]
    fn test_scan_control_requires_all_types() {
        let control = ScanControl::new(0.9);
        control.record(StatementType::IncomeStatement, 0.95);
        control.record(StatementType::FinancialPosition, 0.92);
        assert!(!control.all_satisfied(), "Cash flow not satisfied yet");
        control.record(StatementType::CashFlow, 0.85);
        assert!(!control.all_satisfied(), "Below-threshold confidence must not satisfy");
        control.record(StatementType::CashFlow, 0.9);
        assert!(control.all_satisfied());
        assert!(control.is_satisfied(StatementType::IncomeStatement));
    }
}
