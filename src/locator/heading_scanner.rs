// src/locator/heading_scanner.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::PageProvider;
use crate::locator::{
    DetectorSource, EvidenceItem, EvidenceKind, PageCandidate, PageRange, ScanControl,
};
use crate::schema::{self, StatementType};
use crate::utils::error::LocateError;

// --- Constants ---
const EXACT_CONFIDENCE: f64 = 0.9;
const FUZZY_MIN_SIMILARITY: f64 = 0.7;
const TOP_LINE_BONUS: f64 = 0.05;
// Bonus overflow clamps at the fused-candidate cap.
const MAX_CONFIDENCE: f64 = 0.99;
// Lines inspected per page; statement headings sit at or near the top.
const LINES_SCANNED: usize = 15;
// Matches in the first few lines earn the position bonus.
const TOP_LINES: usize = 5;
// Anything longer than this many words is body text, not a heading.
const MAX_HEADING_WORDS: usize = 12;

// --- Regex Patterns (Lazy Static) ---
// Lines that mention a statement without being its heading: note
// references and in-sentence citations.
static DISQUALIFIER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bnote\s+\d+",
        r"(?i)\brefer\s+to\b",
        r"(?i)\bin\s+accordance\s+with\b",
        r"(?i)\bas\s+described\s+in\b",
        r"(?i)\bnotes\s+to\s+the\b",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

#[derive(Debug, Clone)]
struct PageMatch {
    page: usize,
    score: f64,
    detail: String,
}

/// Finds statements by their page headings: exact or fuzzy containment
/// of a statement title in the first lines of a page.
#[derive(Debug, Clone, Default)]
pub struct HeadingScanner;

impl HeadingScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn detect<P: PageProvider + ?Sized>(
        &self,
        document: &P,
        statement: StatementType,
        control: &ScanControl,
    ) -> Result<Vec<PageCandidate>, LocateError> {
        let keywords = schema::title_keywords(statement);
        let mut matches: Vec<PageMatch> = Vec::new();

        for page_idx in 0..document.page_count() {
            if control.all_satisfied() {
                tracing::debug!(
                    "Heading scan for {} stopping at page {}: all statements located",
                    statement,
                    page_idx
                );
                break;
            }
            let text = match document.page_text(page_idx) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping unreadable page {} in heading scan: {}", page_idx, e);
                    continue;
                }
            };
            if let Some(found) = scan_page(text, page_idx, keywords) {
                tracing::trace!(
                    "Heading match on page {} for {}: {:.2}",
                    page_idx,
                    statement,
                    found.score
                );
                matches.push(found);
            }
        }

        Ok(merge_matches(statement, matches))
    }
}

/// Best heading match within the first lines of one page, if any.
fn scan_page(text: &str, page: usize, keywords: &[&str]) -> Option<PageMatch> {
    let mut best: Option<PageMatch> = None;

    for (line_idx, line) in text.lines().take(LINES_SCANNED).enumerate() {
        let flat = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.is_empty() {
            continue;
        }
        let lower = flat.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        if words.len() > MAX_HEADING_WORDS {
            continue;
        }
        if DISQUALIFIER_RES.iter().any(|re| re.is_match(&lower)) {
            continue;
        }

        for keyword in keywords {
            // An exact phrase scores the fixed constant; a fuzzy hit
            // scores its similarity.
            let (mut score, similarity) = if lower.contains(keyword) {
                (EXACT_CONFIDENCE, 1.0)
            } else {
                let similarity = best_window_similarity(&words, keyword);
                if similarity < FUZZY_MIN_SIMILARITY {
                    continue;
                }
                (similarity, similarity)
            };
            if line_idx < TOP_LINES {
                score += TOP_LINE_BONUS;
            }
            let score = score.min(MAX_CONFIDENCE);

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(PageMatch {
                    page,
                    score,
                    detail: format!(
                        "Heading '{}' on page {} (line {}, similarity {:.2})",
                        flat, page, line_idx, similarity
                    ),
                });
            }
        }
    }
    best
}

/// Highest similarity between the keyword and any keyword-sized word
/// window of the line.
fn best_window_similarity(words: &[&str], keyword: &str) -> f64 {
    let kw_words = keyword.split_whitespace().count().max(1);
    if words.len() <= kw_words {
        return strsim::normalized_levenshtein(&words.join(" "), keyword);
    }
    words
        .windows(kw_words)
        .map(|w| strsim::normalized_levenshtein(&w.join(" "), keyword))
        .fold(0.0, f64::max)
}

/// Adjacent matched pages (gap <= 1) collapse into one candidate; the
/// cluster keeps its best score and every page's evidence.
fn merge_matches(statement: StatementType, matches: Vec<PageMatch>) -> Vec<PageCandidate> {
    let mut clusters: Vec<Vec<PageMatch>> = Vec::new();
    for m in matches {
        match clusters.last_mut() {
            Some(cluster)
                if PageRange::single(cluster.last().map(|p| p.page).unwrap_or(m.page))
                    .gap(&PageRange::single(m.page))
                    <= 1 =>
            {
                cluster.push(m);
            }
            _ => clusters.push(vec![m]),
        }
    }

    clusters
        .into_iter()
        .map(|cluster| {
            let start = cluster.first().map(|m| m.page).unwrap_or(0);
            let end = cluster.last().map(|m| m.page).unwrap_or(start);
            let confidence = cluster.iter().map(|m| m.score).fold(0.0, f64::max);
            let evidence = cluster
                .iter()
                .map(|m| EvidenceItem::new(EvidenceKind::Heading, m.detail.clone(), m.score))
                .collect();
            PageCandidate::new(
                statement,
                PageRange::new(start, end),
                confidence,
                evidence,
                DetectorSource::HeadingScan,
            )
        })
        .collect()
}
