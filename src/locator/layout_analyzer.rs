// src/locator/layout_analyzer.rs

// --- Imports ---
use crate::config::ExtractorConfig;
use crate::document::PageProvider;
use crate::locator::{
    DetectorSource, EvidenceItem, EvidenceKind, PageCandidate, PageRange, ScanControl,
};
use crate::schema::{self, StatementType, YEAR_RE};
use crate::utils::error::LocateError;

// --- Constants ---
// Signal weights; they sum to 1.0 so page scores stay within [0, 1].
const W_DENSITY: f64 = 0.35;
const W_TABLE: f64 = 0.30;
const W_DUAL_YEAR: f64 = 0.15;
const W_ENTITY_PAIR: f64 = 0.15;
const W_NOTE: f64 = 0.05;
// Lines counted as the header region of a page.
const HEADER_LINES: usize = 15;
// Lines with at least this many numeric tokens count as table rows.
const MIN_ROW_NUMERICS: usize = 2;
const MIN_TABLE_ROWS: usize = 4;
// A page attributes to a statement type only with this many distinct
// domain keywords present.
const MIN_DOMAIN_HITS: usize = 2;
// Layout evidence alone never claims more than this.
const MAX_CONFIDENCE: f64 = 0.95;

/// Raw per-page layout observations.
#[derive(Debug, Clone)]
pub struct LayoutSignals {
    pub numeric_density: f64,
    pub density_score: f64,
    pub numeric_rows: usize,
    pub has_table_structure: bool,
    pub has_dual_year_header: bool,
    pub has_entity_pair: bool,
    pub has_note_column: bool,
    pub text_number_ratio: f64,
}

impl LayoutSignals {
    /// Compact one-line rendering for logs and the debug dump.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("density {:.2}", self.numeric_density),
            format!("{} numeric rows", self.numeric_rows),
        ];
        if self.has_dual_year_header {
            parts.push("dual-year header".to_string());
        }
        if self.has_entity_pair {
            parts.push("bank/group columns".to_string());
        }
        if self.has_note_column {
            parts.push("note column".to_string());
        }
        parts.join(", ")
    }
}

/// One scored page.
#[derive(Debug, Clone)]
pub struct PageScore {
    pub page: usize,
    pub score: f64,
    pub signals: LayoutSignals,
}

/// Scores pages by how much they look like a financial-statement table
/// (numeric density, aligned rows, dual-year header, Bank/Group columns)
/// and attributes dense pages to a statement type via domain keywords.
#[derive(Debug, Clone)]
pub struct LayoutAnalyzer {
    min_score: f64,
}

impl LayoutAnalyzer {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self { min_score: config.layout_min_score }
    }

    pub fn detect<P: PageProvider + ?Sized>(
        &self,
        document: &P,
        statement: StatementType,
        control: &ScanControl,
    ) -> Result<Vec<PageCandidate>, LocateError> {
        let mut qualifying: Vec<PageScore> = Vec::new();

        for page_idx in 0..document.page_count() {
            if control.all_satisfied() {
                tracing::debug!(
                    "Layout scan for {} stopping at page {}: all statements located",
                    statement,
                    page_idx
                );
                break;
            }
            let text = match document.page_text(page_idx) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping unreadable page {} in layout scan: {}", page_idx, e);
                    continue;
                }
            };

            let scored = self.score_page(page_idx, text);
            if scored.score < self.min_score {
                continue;
            }
            if domain_hits(text, statement) < MIN_DOMAIN_HITS {
                continue;
            }
            tracing::trace!(
                "Layout page {} qualifies for {} (score {:.2}: {})",
                page_idx,
                statement,
                scored.score,
                scored.signals.summary()
            );
            qualifying.push(scored);
        }

        Ok(group_runs(statement, qualifying))
    }

    /// Scores every readable page; used by the debug dump.
    pub fn score_pages<P: PageProvider + ?Sized>(&self, document: &P) -> Vec<PageScore> {
        (0..document.page_count())
            .filter_map(|page_idx| {
                document
                    .page_text(page_idx)
                    .ok()
                    .map(|text| self.score_page(page_idx, text))
            })
            .collect()
    }

    pub fn score_page(&self, page: usize, text: &str) -> PageScore {
        let signals = analyze(text);

        let mut score = W_DENSITY * signals.density_score
            + W_TABLE * if signals.has_table_structure { 1.0 } else { 0.0 }
            + W_DUAL_YEAR * if signals.has_dual_year_header { 1.0 } else { 0.0 }
            + W_ENTITY_PAIR * if signals.has_entity_pair { 1.0 } else { 0.0 }
            + W_NOTE * if signals.has_note_column { 1.0 } else { 0.0 };

        // Text-heavy pages (notes, commentary) get penalized even when
        // they quote plenty of figures.
        if signals.text_number_ratio > 5.0 {
            score *= 0.5;
        } else if signals.text_number_ratio > 3.0 {
            score *= 0.7;
        }

        PageScore { page, score: score.clamp(0.0, 1.0), signals }
    }
}

fn analyze(text: &str) -> LayoutSignals {
    let mut numeric_tokens = 0usize;
    let mut word_tokens = 0usize;
    let mut numeric_rows = 0usize;

    for line in text.lines() {
        let mut row_numerics = 0usize;
        for token in line.split_whitespace() {
            if is_numeric_token(token) {
                numeric_tokens += 1;
                row_numerics += 1;
            } else {
                word_tokens += 1;
            }
        }
        if row_numerics >= MIN_ROW_NUMERICS {
            numeric_rows += 1;
        }
    }

    let total = numeric_tokens + word_tokens;
    let numeric_density =
        if total == 0 { 0.0 } else { numeric_tokens as f64 / total as f64 };
    let text_number_ratio = if numeric_tokens == 0 {
        f64::INFINITY
    } else {
        word_tokens as f64 / numeric_tokens as f64
    };

    let head: Vec<String> = text
        .lines()
        .take(HEADER_LINES)
        .map(|l| l.to_lowercase())
        .collect();
    let has_dual_year_header = head.iter().any(|line| {
        let mut years: Vec<&str> = YEAR_RE.find_iter(line).map(|m| m.as_str()).collect();
        years.sort_unstable();
        years.dedup();
        years.len() >= 2
    });
    let head_joined = head.join("\n");
    let has_entity_pair = (head_joined.contains("bank") || head_joined.contains("company"))
        && (head_joined.contains("group") || head_joined.contains("consolidated"));
    let has_note_column = head.iter().any(|line| {
        line.split_whitespace().any(|token| token.trim_matches(|c: char| !c.is_alphanumeric()) == "note")
    });

    LayoutSignals {
        numeric_density,
        density_score: normalize_density(numeric_density),
        numeric_rows,
        has_table_structure: numeric_rows >= MIN_TABLE_ROWS,
        has_dual_year_header,
        has_entity_pair,
        has_note_column,
        text_number_ratio,
    }
}

/// Piecewise normalization: statement tables sit around 30%+ numeric
/// tokens, so the curve saturates quickly past that.
fn normalize_density(density: f64) -> f64 {
    if density >= 0.3 {
        (0.8 + (density - 0.3) * 0.67).min(1.0)
    } else if density >= 0.2 {
        0.5 + (density - 0.2) * 3.0
    } else {
        density * 2.5
    }
}

fn is_numeric_token(token: &str) -> bool {
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    has_digit
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '(' | ')' | '-' | '%'))
}

/// Distinct domain keywords of the statement present in the page text.
fn domain_hits(text: &str, statement: StatementType) -> usize {
    let flat = text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    schema::domain_keywords(statement)
        .iter()
        .filter(|kw| flat.contains(*kw))
        .count()
}

/// Consecutive qualifying pages (gap <= 1) become one candidate scored
/// by the mean page score.
fn group_runs(statement: StatementType, pages: Vec<PageScore>) -> Vec<PageCandidate> {
    let mut runs: Vec<Vec<PageScore>> = Vec::new();
    for scored in pages {
        match runs.last_mut() {
            Some(run)
                if PageRange::single(run.last().map(|p| p.page).unwrap_or(scored.page))
                    .gap(&PageRange::single(scored.page))
                    <= 1 =>
            {
                run.push(scored);
            }
            _ => runs.push(vec![scored]),
        }
    }

    runs.into_iter()
        .map(|run| {
            let start = run.first().map(|p| p.page).unwrap_or(0);
            let end = run.last().map(|p| p.page).unwrap_or(start);
            let confidence =
                (run.iter().map(|p| p.score).sum::<f64>() / run.len() as f64).min(MAX_CONFIDENCE);
            let evidence = run
                .iter()
                .map(|p| {
                    EvidenceItem::new(
                        EvidenceKind::Layout,
                        format!("Page {} layout score {:.2} ({})", p.page, p.score, p.signals.summary()),
                        p.score,
                    )
                })
                .collect();
            PageCandidate::new(
                statement,
                PageRange::new(start, end),
                confidence,
                evidence,
                DetectorSource::LayoutAnalysis,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentText;

    fn income_table_page() -> String {
        "INCOME STATEMENT\n\
         Bank Group\n\
         Note 2023 2022 2023 2022\n\
         Interest income 16 1,234,567 1,100,432 1,400,221 1,250,876\n\
         Interest expenses 17 (512,345) (470,221) (590,112) (530,444)\n\
         Net interest income 722,222 630,211 810,109 720,432\n\
         Fee and commission income 18 210,333 190,220 250,444 230,119\n\
         Gross income 2,345,678 2,100,444 2,650,332 2,400,911\n\
         Operating expenses (890,123) (810,456) (950,222) (870,333)\n\
         Profit before tax 455,678 400,123 510,889 450,777\n\
         Profit for the year 320,456 280,998 360,119 310,442"
            .to_string()
    }

    fn prose_page() -> String {
        "Chairman's review\n\
         The year under review was one of measured progress for the bank. \
         Our teams delivered service improvements across the island network \
         while keeping a careful eye on credit quality and funding costs. \
         The board thanks every employee for their commitment during 2023."
            .to_string()
    }

    #[test]
    fn test_statement_page_scores_high_and_prose_scores_low() {
        let analyzer = LayoutAnalyzer::new(&ExtractorConfig::default());
        let table = analyzer.score_page(0, &income_table_page());
        let prose = analyzer.score_page(1, &prose_page());

        assert!(table.score > 0.7, "Table page should score high, got {:.2}", table.score);
        assert!(prose.score < 0.3, "Prose page should score low, got {:.2}", prose.score);
        assert!(table.signals.has_table_structure);
        assert!(table.signals.has_dual_year_header);
        assert!(table.signals.has_entity_pair);
    }

    #[test]
    fn test_detect_emits_grouped_candidate_for_consecutive_pages() {
        let mut pages = vec![prose_page(); 12];
        pages[7] = income_table_page();
        pages[8] = income_table_page();
        let doc = DocumentText::new("fixture.pdf", pages);

        let analyzer = LayoutAnalyzer::new(&ExtractorConfig::default());
        let control = ScanControl::new(0.99);
        let candidates = analyzer
            .detect(&doc, StatementType::IncomeStatement, &control)
            .expect("layout detection should not fail");

        assert_eq!(candidates.len(), 1, "Consecutive pages should form one run");
        assert_eq!(candidates[0].pages, PageRange::new(7, 8));
        assert!(candidates[0].confidence > 0.7);
        assert_eq!(candidates[0].evidence.len(), 2);
    }

    #[test]
    fn test_attribution_requires_matching_domain_keywords() {
        let mut pages = vec![prose_page(); 10];
        pages[4] = income_table_page();
        let doc = DocumentText::new("fixture.pdf", pages);

        let analyzer = LayoutAnalyzer::new(&ExtractorConfig::default());
        let control = ScanControl::new(0.99);
        let candidates = analyzer
            .detect(&doc, StatementType::FinancialPosition, &control)
            .unwrap();

        assert!(
            candidates.is_empty(),
            "An income-statement page must not attribute to financial position"
        );
    }

    #[test]
    fn test_text_heavy_page_is_penalized() {
        let analyzer = LayoutAnalyzer::new(&ExtractorConfig::default());
        // Plenty of figures buried in running prose.
        let noisy = format!(
            "{}\nDeposits grew to 1,234,567 while advances reached 2,345,678 \
             and impairments of (45,678) were recognised against 910,112 of \
             recoveries, with totals of 3,456,789 and 4,567,890 reported.",
            prose_page()
        );
        let scored = analyzer.score_page(0, &noisy);
        assert!(
            scored.signals.text_number_ratio > 3.0,
            "Fixture should be word-dominated, got ratio {:.2}",
            scored.signals.text_number_ratio
        );
        assert!(scored.score < 0.4, "Prose-heavy page should be penalized, got {:.2}", scored.score);
    }
}
