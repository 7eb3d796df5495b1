// src/extractors/numeric_normalizer.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// --- Constants ---
// Tokens that mean "no figure here" rather than a bad parse: the dash
// family (hyphen, en dash, em dash, minus sign) and explicit null words.
const NULL_TOKENS: &[&str] = &["-", "–", "—", "−", "nil", "n/a", "na", "not applicable"];

// Currency markers stripped before parsing, longest first so "rs."
// never leaves a dangling period behind.
const DEFAULT_CURRENCY_MARKERS: &[&str] = &["rs.", "lkr", "usd", "rs", "₨", "$", "€", "£"];

// --- Regex Patterns (Lazy Static) ---
static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((.*)\)$").expect("Failed to compile BRACKET_RE"));

static PLAIN_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("Failed to compile PLAIN_NUMBER_RE"));

/// Outcome of normalizing one table cell. `is_null` marks an explicit
/// null token; `parse_failed` marks unintelligible content; they are
/// never both set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub raw: String,
    pub value: Option<f64>,
    pub is_negative: bool,
    pub is_null: bool,
    pub parse_failed: bool,
}

impl NormalizedValue {
    fn null(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            value: None,
            is_negative: false,
            is_null: true,
            parse_failed: false,
        }
    }

    fn failed(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            value: None,
            is_negative: false,
            is_null: false,
            parse_failed: true,
        }
    }

    fn number(raw: &str, magnitude: f64, is_negative: bool) -> Self {
        let signed = if is_negative { -magnitude } else { magnitude };
        Self {
            raw: raw.to_string(),
            value: Some(signed),
            is_negative,
            is_null: false,
            parse_failed: false,
        }
    }
}

/// Turns reported cell strings ("(1,234)", "Rs. 1,000,000", "–") into
/// numeric values. Unit scaling (thousands, millions) is applied by the
/// caller from header metadata, never here.
#[derive(Debug, Clone)]
pub struct NumericNormalizer {
    currency_markers: Vec<String>,
}

impl Default for NumericNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NumericNormalizer {
    pub fn new() -> Self {
        Self::with_currency_markers(
            DEFAULT_CURRENCY_MARKERS.iter().map(|m| m.to_string()).collect(),
        )
    }

    /// Custom marker set, e.g. when the header names a currency this
    /// crate does not carry by default.
    pub fn with_currency_markers(markers: Vec<String>) -> Self {
        let mut currency_markers: Vec<String> =
            markers.into_iter().map(|m| m.to_lowercase()).collect();
        currency_markers.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { currency_markers }
    }

    pub fn normalize(&self, raw: &str) -> NormalizedValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return NormalizedValue::null(raw);
        }

        // Work in lowercase from here; the raw form is preserved on the result.
        let mut body = trimmed.to_lowercase();
        if NULL_TOKENS.contains(&body.as_str()) {
            return NormalizedValue::null(raw);
        }

        // Accounting negative: parentheses around the figure.
        let mut is_negative = false;
        if let Some(caps) = BRACKET_RE.captures(&body) {
            is_negative = true;
            body = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
        }

        // A leading minus (ASCII or typographic) also marks a negative.
        for minus in ['-', '−', '–'] {
            if let Some(rest) = body.strip_prefix(minus) {
                is_negative = true;
                body = rest.trim_start().to_string();
                break;
            }
        }

        body = strip_markers(body, &self.currency_markers);
        body.retain(|c| c != ',' && !c.is_whitespace());

        if body.is_empty() {
            // Nothing but currency symbols or an empty bracket pair.
            return NormalizedValue::null(raw);
        }
        if !PLAIN_NUMBER_RE.is_match(&body) {
            return NormalizedValue::failed(raw);
        }
        match body.parse::<f64>() {
            Ok(magnitude) => NormalizedValue::number(raw, magnitude, is_negative),
            Err(_) => NormalizedValue::failed(raw),
        }
    }

    /// Normalizes every cell of a row in order.
    pub fn normalize_row(&self, cells: &[String]) -> Vec<NormalizedValue> {
        cells.iter().map(|cell| self.normalize(cell)).collect()
    }
}

fn strip_markers(mut body: String, markers: &[String]) -> String {
    for marker in markers {
        while let Some(idx) = body.find(marker.as_str()) {
            body.replace_range(idx..idx + marker.len(), "");
        }
    }
    body.trim().to_string()
}
