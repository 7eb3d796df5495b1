// src/locator/page_locator.rs

// --- Imports ---
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::document::{DocumentText, PageProvider};
use crate::locator::{
    Detector, HeadingScanner, LayoutAnalyzer, LocationMap, PageCandidate, PageRange,
    ScanControl, TocDetector,
};
use crate::schema::StatementType;
use crate::utils::error::LocateError;

// --- Constants ---
// Fused belief never reaches certainty, however many sources agree.
const FUSED_CONFIDENCE_CAP: f64 = 0.99;
// Candidates whose ranges overlap or sit within this many pages of each
// other corroborate the same location.
const CLUSTER_MAX_GAP: usize = 1;

/// Orchestrates the detectors and fuses their candidates into a ranked
/// per-statement answer. Synchronous and free of I/O; timeouts wrap it
/// from the outside (`locate_with_timeout`).
#[derive(Debug, Clone)]
pub struct PageLocator {
    config: ExtractorConfig,
    detectors: Vec<Detector>,
}

impl PageLocator {
    pub fn new(config: ExtractorConfig) -> Self {
        let detectors = vec![
            Detector::Toc(TocDetector::new(&config)),
            Detector::Heading(HeadingScanner::new()),
            Detector::Layout(LayoutAnalyzer::new(&config)),
        ];
        Self { config, detectors }
    }

    /// Runs every detector for every statement type and fuses the
    /// results. A detector failure degrades to zero candidates from
    /// that detector; one statement type's failure never touches
    /// another's results.
    pub fn locate<P: PageProvider + ?Sized>(&self, document: &P) -> LocationMap {
        let control = ScanControl::new(self.config.early_stop_confidence);
        let mut raw: BTreeMap<StatementType, Vec<PageCandidate>> =
            StatementType::ALL.iter().map(|s| (*s, Vec::new())).collect();

        for detector in &self.detectors {
            for statement in StatementType::ALL {
                match detector.detect(document, statement, &control) {
                    Ok(candidates) => {
                        tracing::debug!(
                            "Detector '{}' produced {} candidate(s) for {}",
                            detector.source(),
                            candidates.len(),
                            statement
                        );
                        for candidate in &candidates {
                            control.record(statement, candidate.confidence);
                        }
                        raw.entry(statement).or_default().extend(candidates);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Detector '{}' failed for {}, continuing without it: {}",
                            detector.source(),
                            statement,
                            e
                        );
                    }
                }
            }
        }

        let mut results: LocationMap = BTreeMap::new();
        for (statement, candidates) in raw {
            let fused = fuse(candidates, self.config.min_page_confidence);
            match fused.first() {
                Some(best) => tracing::info!(
                    "Located {}: pages {} (confidence {:.2}, {} source(s), {} candidate(s) total)",
                    statement,
                    best.pages,
                    best.confidence,
                    best.sources.len(),
                    fused.len()
                ),
                None => tracing::info!("No candidates above threshold for {}", statement),
            }
            results.insert(statement, fused);
        }
        results
    }

    /// `locate` on a blocking worker under a caller-imposed deadline.
    pub async fn locate_with_timeout(
        &self,
        document: Arc<DocumentText>,
        limit: Duration,
    ) -> Result<LocationMap, LocateError> {
        let locator = self.clone();
        let handle = tokio::task::spawn_blocking(move || locator.locate(document.as_ref()));
        match tokio::time::timeout(limit, handle).await {
            Err(_) => Err(LocateError::Timeout(limit)),
            Ok(Err(join_err)) => Err(LocateError::Worker(join_err.to_string())),
            Ok(Ok(results)) => Ok(results),
        }
    }

    /// Top-n candidates per statement type.
    pub fn best_candidates(results: &LocationMap, top_n: usize) -> LocationMap {
        results
            .iter()
            .map(|(statement, candidates)| {
                (*statement, candidates.iter().take(top_n).cloned().collect())
            })
            .collect()
    }
}

/// One corroboration step: independent agreeing evidence only ever
/// raises belief.
pub fn bayesian_update(prior: f64, evidence: f64) -> f64 {
    1.0 - (1.0 - prior) * (1.0 - evidence.clamp(0.0, 1.0))
}

/// Clusters candidates of one statement type (overlap or gap <= 1),
/// fuses each cluster, drops weak results, and ranks the rest.
fn fuse(mut candidates: Vec<PageCandidate>, min_confidence: f64) -> Vec<PageCandidate> {
    if candidates.is_empty() {
        return candidates;
    }

    // Deterministic clustering order regardless of detector ordering.
    candidates.sort_by(|a, b| {
        (a.pages.start, a.pages.end)
            .cmp(&(b.pages.start, b.pages.end))
            .then_with(|| a.confidence.total_cmp(&b.confidence))
    });

    let mut spans: Vec<PageRange> = Vec::new();
    let mut clusters: Vec<Vec<PageCandidate>> = Vec::new();
    for candidate in candidates {
        match (spans.last_mut(), clusters.last_mut()) {
            (Some(span), Some(cluster)) if span.gap(&candidate.pages) <= CLUSTER_MAX_GAP => {
                *span = span.union_span(&candidate.pages);
                cluster.push(candidate);
            }
            _ => {
                spans.push(candidate.pages);
                clusters.push(vec![candidate]);
            }
        }
    }

    let mut fused: Vec<PageCandidate> = spans
        .into_iter()
        .zip(clusters)
        .map(|(span, members)| fuse_cluster(span, members))
        .collect();
    fused.retain(|c| c.confidence >= min_confidence);
    rank(&mut fused);
    fused
}

// A one-member cluster falls out unchanged: the fold reduces to the
// member's own confidence.
fn fuse_cluster(span: PageRange, members: Vec<PageCandidate>) -> PageCandidate {
    debug_assert!(
        members.windows(2).all(|w| w[0].statement_type == w[1].statement_type),
        "Clusters must never span statement types"
    );

    let statement_type = members[0].statement_type;
    let confidence = members
        .iter()
        .fold(0.0, |acc, m| bayesian_update(acc, m.confidence))
        .min(FUSED_CONFIDENCE_CAP);

    let mut evidence = Vec::new();
    let mut sources = BTreeSet::new();
    for member in members {
        evidence.extend(member.evidence);
        sources.extend(member.sources);
    }

    PageCandidate { statement_type, pages: span, confidence, evidence, sources }
}

/// Descending confidence; ties prefer more sources, then narrower
/// ranges, then earlier pages.
fn rank(candidates: &mut [PageCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.sources.len().cmp(&a.sources.len()))
            .then_with(|| a.pages.page_count().cmp(&b.pages.page_count()))
            .then_with(|| a.pages.start.cmp(&b.pages.start))
    });
}
