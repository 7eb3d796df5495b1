// src/locator/toc_detector.rs

// --- Imports ---
use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ExtractorConfig;
use crate::document::PageProvider;
use crate::locator::{
    DetectorSource, EvidenceItem, EvidenceKind, PageCandidate, PageRange, ScanControl,
};
use crate::schema::{self, StatementType, YEAR_RE};
use crate::utils::error::LocateError;

// --- Constants ---
const BASE_CONFIDENCE: f64 = 0.6;
const PER_LINE_BONUS: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;
const OFFSET_CONFLICT_PENALTY: f64 = 0.1;
// Printed page number vs. physical index deltas worth probing, most
// common first. Front matter usually pushes statements forward of their
// printed number, so forward deltas come before backward ones.
const PROBE_DELTAS: &[i64] = &[0, 1, 2, 3, 4, -1, -2, 5];
// A statement plus its continuation page.
const CANDIDATE_SPAN: usize = 2;
// Character window at the top of a page in which a "contents" marker counts.
const CONTENTS_MARKER_WINDOW: usize = 500;
// Minimum comma-grouped numbers for a page to verify as statement data.
const MIN_DATA_NUMBERS: usize = 4;

// --- Regex Patterns (Lazy Static) ---
static DOT_LEADER_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.{3,}\s*\d{1,4}\s*$").expect("Failed to compile DOT_LEADER_LINE_RE")
});

static GROUPED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?").expect("Failed to compile GROUPED_NUMBER_RE")
});

/// One matched contents line: a statement title next to a printed page
/// number.
#[derive(Debug, Clone)]
struct TocEntry {
    statement: StatementType,
    reported_page: usize,
    line: String,
}

/// Locates statements through the report's table of contents: finds
/// contents-like pages in the leading window, reads title lines with
/// printed page numbers, then resolves the printed-to-physical page
/// offset by probing nearby pages for actual statement data.
#[derive(Debug, Clone)]
pub struct TocDetector {
    scan_window: usize,
    // Per statement type: patterns matching a title with the page number
    // trailing (dotted leaders tolerated) or leading.
    patterns: BTreeMap<StatementType, Vec<Regex>>,
}

impl TocDetector {
    pub fn new(config: &ExtractorConfig) -> Self {
        let mut patterns = BTreeMap::new();
        for statement in StatementType::ALL {
            let mut compiled = Vec::new();
            for keyword in schema::title_keywords(statement) {
                let kw = regex::escape(keyword).replace(' ', r"\s+");
                let trailing = format!(r"(?i)\b{}[\s.·…]{{1,60}}?(\d{{1,4}})\b", kw);
                let leading = format!(r"(?i)\b(\d{{1,4}})\s+{}", kw);
                compiled.extend(
                    [trailing, leading]
                        .iter()
                        .filter_map(|pat| Regex::new(pat).ok()),
                );
            }
            patterns.insert(statement, compiled);
        }
        Self { scan_window: config.toc_scan_window, patterns }
    }

    pub fn detect<P: PageProvider + ?Sized>(
        &self,
        document: &P,
        statement: StatementType,
        control: &ScanControl,
    ) -> Result<Vec<PageCandidate>, LocateError> {
        if control.all_satisfied() {
            tracing::debug!("ToC detector skipped for {}: all statements already located", statement);
            return Ok(Vec::new());
        }

        let entries = self.collect_entries(document);
        if entries.is_empty() {
            tracing::debug!("No contents entries found in the first {} pages", self.scan_window);
            return Ok(Vec::new());
        }

        let Some(vote) = self.resolve_offset(document, &entries) else {
            tracing::debug!("Contents entries found but no page offset could be verified");
            return Ok(Vec::new());
        };
        tracing::debug!(
            "Resolved printed-page offset {:+} ({} of {} entries agree)",
            vote.offset,
            vote.agreeing,
            vote.total
        );

        let candidates = self.build_candidates(document, statement, &entries, &vote);
        for candidate in &candidates {
            tracing::debug!(
                "ToC candidate for {}: pages {} (confidence {:.2})",
                statement,
                candidate.pages,
                candidate.confidence
            );
        }
        Ok(candidates)
    }

    /// Scans the leading window for contents-like pages and pulls every
    /// statement-title line carrying a printed page number. Entries for
    /// all statement types are collected so the offset vote can draw on
    /// all of them.
    fn collect_entries<P: PageProvider + ?Sized>(&self, document: &P) -> Vec<TocEntry> {
        let window = self.scan_window.min(document.page_count());
        let mut entries = Vec::new();
        let mut seen: HashSet<(StatementType, usize, usize)> = HashSet::new();

        for page_idx in 0..window {
            let text = match document.page_text(page_idx) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping unreadable page {} in ToC scan: {}", page_idx, e);
                    continue;
                }
            };
            if !is_contents_page(text) {
                continue;
            }

            for (line_idx, line) in text.lines().enumerate() {
                let flat = line.split_whitespace().collect::<Vec<_>>().join(" ");
                if flat.is_empty() {
                    continue;
                }
                for (stmt, patterns) in &self.patterns {
                    for pattern in patterns {
                        let Some(caps) = pattern.captures(&flat) else { continue };
                        let Some(reported) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok())
                        else {
                            continue;
                        };
                        if reported == 0 || !seen.insert((*stmt, page_idx, line_idx)) {
                            break;
                        }
                        entries.push(TocEntry {
                            statement: *stmt,
                            reported_page: reported,
                            line: flat.clone(),
                        });
                        break;
                    }
                }
            }
        }
        entries
    }

    /// Votes on the printed-to-physical offset: probes pages near each
    /// entry's reported number for statement data and takes the most
    /// frequent verified delta.
    fn resolve_offset<P: PageProvider + ?Sized>(
        &self,
        document: &P,
        entries: &[TocEntry],
    ) -> Option<OffsetVote> {
        let page_count = document.page_count();
        let mut votes: HashMap<i64, usize> = HashMap::new();

        for entry in entries {
            for delta in PROBE_DELTAS {
                let probe = entry.reported_page as i64 + delta;
                if probe < 0 || probe as usize >= page_count {
                    continue;
                }
                let Ok(text) = document.page_text(probe as usize) else { continue };
                if page_verifies(text, entry.statement) {
                    *votes.entry(*delta).or_insert(0) += 1;
                    break;
                }
            }
        }

        let total: usize = votes.values().sum();
        let (&offset, &agreeing) = votes.iter().max_by_key(|(delta, count)| {
            // Deterministic winner when counts tie: prefer the smaller delta.
            (**count, std::cmp::Reverse(delta.abs()))
        })?;
        Some(OffsetVote { offset, agreeing, total, conflicting: votes.len() > 1 })
    }

    fn build_candidates<P: PageProvider + ?Sized>(
        &self,
        document: &P,
        statement: StatementType,
        entries: &[TocEntry],
        vote: &OffsetVote,
    ) -> Vec<PageCandidate> {
        let page_count = document.page_count();

        // Offset-corrected ranges for the requested statement only.
        let mut located: Vec<(PageRange, TocEntry)> = Vec::new();
        for entry in entries.iter().filter(|e| e.statement == statement) {
            let start = entry.reported_page as i64 + vote.offset;
            if start < 0 {
                continue;
            }
            let range = PageRange::new(start as usize, start as usize + CANDIDATE_SPAN - 1);
            let Some(range) = range.clamp_to(page_count) else { continue };
            located.push((range, entry.clone()));
        }
        if located.is_empty() {
            return Vec::new();
        }
        located.sort_by_key(|(range, _)| (range.start, range.end));

        // Contiguous entries corroborate one candidate; distant entries
        // (e.g. separate Bank and Group listings) stay separate.
        let mut clusters: Vec<(PageRange, Vec<TocEntry>)> = Vec::new();
        for (range, entry) in located {
            match clusters.last_mut() {
                Some((span, members)) if span.gap(&range) <= 1 => {
                    *span = span.union_span(&range);
                    members.push(entry);
                }
                _ => clusters.push((range, vec![entry])),
            }
        }

        clusters
            .into_iter()
            .map(|(span, members)| {
                let mut confidence =
                    BASE_CONFIDENCE + PER_LINE_BONUS * (members.len() as f64 - 1.0);
                confidence = confidence.min(MAX_CONFIDENCE);
                if vote.conflicting {
                    confidence -= OFFSET_CONFLICT_PENALTY;
                }

                let mut evidence: Vec<EvidenceItem> = members
                    .iter()
                    .map(|entry| {
                        EvidenceItem::new(
                            EvidenceKind::TocEntry,
                            format!(
                                "Contents line '{}' reports printed page {} (physical page {})",
                                entry.line,
                                entry.reported_page,
                                entry.reported_page as i64 + vote.offset
                            ),
                            BASE_CONFIDENCE,
                        )
                    })
                    .collect();
                evidence.push(EvidenceItem::new(
                    EvidenceKind::TocOffset,
                    if vote.conflicting {
                        format!(
                            "Printed-page offset {:+} won the vote but offsets conflict ({} of {} entries agree)",
                            vote.offset, vote.agreeing, vote.total
                        )
                    } else {
                        format!(
                            "Printed-page offset {:+} verified by {} of {} contents entries",
                            vote.offset, vote.agreeing, vote.total
                        )
                    },
                    vote.agreeing as f64 / vote.total.max(1) as f64,
                ));

                PageCandidate::new(statement, span, confidence, evidence, DetectorSource::Toc)
            })
            .collect()
    }
}

#[derive(Debug)]
struct OffsetVote {
    offset: i64,
    agreeing: usize,
    total: usize,
    conflicting: bool,
}

/// Contents pages either announce themselves near the top or are full of
/// dotted-leader lines ending in page numbers.
fn is_contents_page(text: &str) -> bool {
    let head: String = text.chars().take(CONTENTS_MARKER_WINDOW).collect();
    if head.to_lowercase().contains("contents") {
        return true;
    }
    text.lines().filter(|line| DOT_LEADER_LINE_RE.is_match(line)).count() >= 3
}

/// A probed page verifies an entry when it carries the statement title,
/// both fiscal years, and enough formatted figures to be real data
/// rather than a cross-reference.
fn page_verifies(text: &str, statement: StatementType) -> bool {
    let flat = text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    let has_title =
        schema::title_keywords(statement).iter().any(|kw| flat.contains(kw));
    if !has_title {
        return false;
    }

    let mut years: Vec<&str> = YEAR_RE.find_iter(text).map(|m| m.as_str()).collect();
    years.sort_unstable();
    years.dedup();
    if years.len() < 2 {
        return false;
    }

    GROUPED_NUMBER_RE.find_iter(text).count() >= MIN_DATA_NUMBERS
}
