// src/extractors/unit_detector.rs

// --- Imports ---
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// --- Constants ---
// Currency marker tables, most specific marker first per currency.
// LKR precedes INR so the shared "Rs." abbreviation resolves to the
// Sri Lankan rupee, the home currency of the reports we read.
const CURRENCY_MARKERS: &[(&str, &[&str])] = &[
    ("LKR", &["sri lankan rupee", "rs.", "₨", "lkr"]),
    ("USD", &["us dollar", "usd", "us$", "$"]),
    ("EUR", &["euro", "eur", "€"]),
    ("GBP", &["pound sterling", "gbp", "£"]),
    ("INR", &["indian rupee", "inr"]),
];

// --- Regex Patterns (Lazy Static) ---
static BILLIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(bn|billions?)\b").expect("Failed to compile BILLIONS_RE"));

static MILLIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(mn|millions?)\b").expect("Failed to compile MILLIONS_RE"));

static THOUSANDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bthousands?\b").expect("Failed to compile THOUSANDS_RE"));

/// Magnitude the table's figures are quoted in, usually announced in
/// the header ("Rs. '000", "LKR Mn").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitScale {
    #[default]
    Ones,
    Thousands,
    Millions,
    Billions,
}

impl UnitScale {
    pub fn multiplier(&self) -> f64 {
        match self {
            UnitScale::Ones => 1.0,
            UnitScale::Thousands => 1_000.0,
            UnitScale::Millions => 1_000_000.0,
            UnitScale::Billions => 1_000_000_000.0,
        }
    }

    /// Scales a quoted figure up to absolute units.
    pub fn apply(&self, value: f64) -> f64 {
        value * self.multiplier()
    }
}

impl fmt::Display for UnitScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitScale::Ones => "ones",
            UnitScale::Thousands => "thousands",
            UnitScale::Millions => "millions",
            UnitScale::Billions => "billions",
        };
        write!(f, "{}", name)
    }
}

/// Finds the reporting currency named in header or page text. Returns
/// `None` when no marker appears.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    for (code, markers) in CURRENCY_MARKERS {
        if markers.iter().any(|marker| lower.contains(marker)) {
            return Some(code);
        }
    }
    None
}

/// Finds the magnitude figures are quoted in. Larger scales are checked
/// first so "Rs. Mn" never reads as thousands from a stray "'000"
/// elsewhere on the line.
pub fn detect_scale(text: &str) -> UnitScale {
    let lower = text.to_lowercase();
    if BILLIONS_RE.is_match(&lower) {
        UnitScale::Billions
    } else if MILLIONS_RE.is_match(&lower) {
        UnitScale::Millions
    } else if lower.contains("'000") || lower.contains("000's") || THOUSANDS_RE.is_match(&lower) {
        UnitScale::Thousands
    } else {
        UnitScale::Ones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_currency_lkr_from_rs_marker() {
        assert_eq!(detect_currency("Rs. '000"), Some("LKR"));
        assert_eq!(detect_currency("Amounts in LKR"), Some("LKR"));
    }

    #[test]
    fn test_detect_currency_common_codes() {
        assert_eq!(detect_currency("US$ million"), Some("USD"));
        assert_eq!(detect_currency("in € thousands"), Some("EUR"));
        assert_eq!(detect_currency("£'000"), Some("GBP"));
        assert_eq!(detect_currency("INR crore"), Some("INR"));
    }

    #[test]
    fn test_detect_currency_none_without_marker() {
        assert_eq!(detect_currency("For the year ended 31 December 2023"), None);
    }

    #[test]
    fn test_detect_scale_thousands() {
        assert_eq!(detect_scale("Rs. '000"), UnitScale::Thousands);
        assert_eq!(detect_scale("in thousands"), UnitScale::Thousands);
    }

    #[test]
    fn test_detect_scale_millions_and_billions() {
        assert_eq!(detect_scale("Rs. Mn"), UnitScale::Millions);
        assert_eq!(detect_scale("LKR billion"), UnitScale::Billions);
    }

    #[test]
    fn test_detect_scale_ignores_embedded_letters() {
        assert_eq!(detect_scale("amnesty provision"), UnitScale::Ones);
    }

    #[test]
    fn test_scale_applies_multiplier() {
        assert!((UnitScale::Thousands.apply(512.0) - 512_000.0).abs() < f64::EPSILON);
        assert!((UnitScale::Ones.apply(512.0) - 512.0).abs() < f64::EPSILON);
    }
}
