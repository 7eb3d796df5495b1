// src/mapper/mapping_engine.rs

// --- Imports ---
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::config::ExtractorConfig;
use crate::schema::{self, StatementType};

// --- Regex Patterns (Lazy Static) ---
// Trailing note references ("Deposits from customers (Note 25)") carry
// no labeling information and are removed before matching.
static NOTE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(?\bnotes?\s*\d+(?:\.\d+)*\)?").expect("Failed to compile NOTE_REF_RE")
});

/// How a reported label was matched to a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Synonym,
    Fuzzy,
    None,
}

/// Outcome of mapping one reported row label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingResult {
    pub raw_label: String,
    /// Canonical field key, absent when no match cleared the cascade.
    pub canonical_key: Option<String>,
    pub match_method: MatchMethod,
    pub confidence: f64,
}

struct FieldEntry {
    canonical: &'static str,
    normalized: String,
    synonyms: &'static [&'static str],
}

/// Maps reported row labels onto the canonical field schema through an
/// exact / synonym / fuzzy cascade. Labels that clear none of the three
/// stages map to nothing rather than to a wrong field.
pub struct MappingEngine {
    fuzzy_threshold: f64,
    synonym_confidence: f64,
    tables: BTreeMap<StatementType, Vec<FieldEntry>>,
}

impl MappingEngine {
    pub fn new(config: &ExtractorConfig) -> Self {
        let tables = StatementType::ALL
            .into_iter()
            .map(|statement| {
                let entries = schema::field_synonyms(statement)
                    .iter()
                    .map(|(canonical, synonyms)| FieldEntry {
                        canonical,
                        normalized: normalize_label(canonical),
                        synonyms,
                    })
                    .collect();
                (statement, entries)
            })
            .collect();
        Self {
            fuzzy_threshold: config.fuzzy_threshold,
            synonym_confidence: config.synonym_confidence,
            tables,
        }
    }

    /// Runs the cascade for one label. Table order breaks ties, so the
    /// result is deterministic for any input.
    pub fn map_label(&self, raw_label: &str, statement: StatementType) -> MappingResult {
        let normalized = normalize_label(raw_label);
        let entries = match self.tables.get(&statement) {
            Some(entries) if !normalized.is_empty() => entries,
            _ => return unmapped(raw_label),
        };

        for entry in entries {
            if entry.normalized == normalized {
                return MappingResult {
                    raw_label: raw_label.to_string(),
                    canonical_key: Some(entry.canonical.to_string()),
                    match_method: MatchMethod::Exact,
                    confidence: 1.0,
                };
            }
        }

        for entry in entries {
            if entry.synonyms.iter().any(|synonym| *synonym == normalized) {
                return MappingResult {
                    raw_label: raw_label.to_string(),
                    canonical_key: Some(entry.canonical.to_string()),
                    match_method: MatchMethod::Synonym,
                    confidence: self.synonym_confidence,
                };
            }
        }

        let mut best: Option<(&'static str, f64)> = None;
        for entry in entries {
            let candidates =
                std::iter::once(entry.normalized.as_str()).chain(entry.synonyms.iter().copied());
            for candidate in candidates {
                let score = normalized_levenshtein(&normalized, candidate) * 100.0;
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((entry.canonical, score));
                }
            }
        }
        if let Some((canonical, score)) = best {
            if score >= self.fuzzy_threshold {
                tracing::trace!(
                    "Fuzzy match '{}' -> '{}' (score {:.1})",
                    raw_label,
                    canonical,
                    score
                );
                return MappingResult {
                    raw_label: raw_label.to_string(),
                    canonical_key: Some(canonical.to_string()),
                    match_method: MatchMethod::Fuzzy,
                    confidence: (score / 100.0) * self.synonym_confidence,
                };
            }
        }

        unmapped(raw_label)
    }

    pub fn map_labels(&self, labels: &[String], statement: StatementType) -> Vec<MappingResult> {
        labels.iter().map(|label| self.map_label(label, statement)).collect()
    }
}

fn unmapped(raw_label: &str) -> MappingResult {
    MappingResult {
        raw_label: raw_label.to_string(),
        canonical_key: None,
        match_method: MatchMethod::None,
        confidence: 0.0,
    }
}

/// Canonical form used on both sides of every comparison: lowercase,
/// "&" spelled out, separators spaced, note references and remaining
/// punctuation dropped, whitespace collapsed.
fn normalize_label(label: &str) -> String {
    let lower = label.to_lowercase();
    let without_notes = NOTE_REF_RE.replace_all(&lower, " ");
    let spelled: String = without_notes
        .replace('&', " and ")
        .chars()
        .map(|c| match c {
            '/' | '-' | '_' | '–' | '—' => ' ',
            c if c.is_alphanumeric() || c.is_whitespace() => c,
            _ => ' ',
        })
        .collect();
    spelled.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MappingEngine {
        MappingEngine::new(&ExtractorConfig::default())
    }

    #[test]
    fn test_exact_match_has_full_confidence() {
        let result = engine().map_label("Interest income", StatementType::IncomeStatement);
        assert_eq!(result.canonical_key.as_deref(), Some("Interest income"));
        assert_eq!(result.match_method, MatchMethod::Exact);
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_match_survives_case_and_punctuation() {
        let result = engine().map_label(
            "PROPERTY, PLANT & EQUIPMENT",
            StatementType::FinancialPosition,
        );
        assert_eq!(result.canonical_key.as_deref(), Some("Property, plant and equipment"));
        assert_eq!(result.match_method, MatchMethod::Exact);
    }

    #[test]
    fn test_note_reference_is_ignored() {
        let result = engine().map_label(
            "Deposits from customers (Note 25)",
            StatementType::FinancialPosition,
        );
        assert_eq!(result.canonical_key.as_deref(), Some("Deposits from customers"));
        assert_eq!(result.match_method, MatchMethod::Exact);
    }

    #[test]
    fn test_synonym_match_uses_synonym_confidence() {
        let result = engine().map_label("Interest revenue", StatementType::IncomeStatement);
        assert_eq!(result.canonical_key.as_deref(), Some("Interest income"));
        assert_eq!(result.match_method, MatchMethod::Synonym);
        assert!((result.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_fuzzy_match_catches_typo() {
        let result = engine().map_label("Intrest income", StatementType::IncomeStatement);
        assert_eq!(result.canonical_key.as_deref(), Some("Interest income"));
        assert_eq!(result.match_method, MatchMethod::Fuzzy);
        assert!(result.confidence > 0.0);
        assert!(result.confidence < 0.95, "Fuzzy confidence stays below a synonym match");
    }

    #[test]
    fn test_fuzzy_respects_threshold() {
        let mut config = ExtractorConfig::default();
        config.fuzzy_threshold = 99.0;
        let engine = MappingEngine::new(&config);

        let result = engine.map_label("Intrest income", StatementType::IncomeStatement);
        assert_eq!(result.match_method, MatchMethod::None);
        assert!(result.canonical_key.is_none());
    }

    #[test]
    fn test_unmatched_label_maps_to_nothing() {
        let result = engine().map_label("zzz qqq report artifact", StatementType::CashFlow);
        assert_eq!(result.match_method, MatchMethod::None);
        assert!(result.canonical_key.is_none());
        assert!((result.confidence - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_cascade_is_monotone() {
        let engine = engine();
        let exact = engine.map_label("Total assets", StatementType::FinancialPosition);
        let synonym = engine.map_label("Customer deposits", StatementType::FinancialPosition);
        let fuzzy = engine.map_label("Total asets", StatementType::FinancialPosition);

        assert_eq!(exact.match_method, MatchMethod::Exact);
        assert_eq!(synonym.match_method, MatchMethod::Synonym);
        assert_eq!(fuzzy.match_method, MatchMethod::Fuzzy);
        assert!(exact.confidence > synonym.confidence);
        assert!(synonym.confidence > fuzzy.confidence);
    }

    #[test]
    fn test_map_labels_preserves_row_order() {
        let labels = vec!["Total assets".to_string(), "mystery row".to_string()];
        let results = engine().map_labels(&labels, StatementType::FinancialPosition);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].raw_label, "Total assets");
        assert_eq!(results[1].match_method, MatchMethod::None);
    }
}
