// src/validation/mod.rs

// --- Imports ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;

/// Outcome of one accounting identity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheck {
    pub rule: String,
    pub passed: bool,
    pub expected: f64,
    pub actual: f64,
    pub difference: f64,
}

/// Checks extracted figures against accounting identities that must
/// hold in any internally consistent statement. Rules whose inputs are
/// missing or null are skipped, not failed.
///
/// Expense and tax lines may be reported bracketed (negative) or as
/// positive magnitudes depending on the report's convention, so rules
/// subtract absolute values where a deduction is meant.
#[derive(Debug, Clone)]
pub struct AccountingValidator {
    tolerance: f64,
}

impl AccountingValidator {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self { tolerance: config.validation_tolerance }
    }

    /// Runs every applicable rule against one field map, as returned by
    /// [`crate::schema::CanonicalReport::values`].
    pub fn check(&self, values: &BTreeMap<String, Option<f64>>) -> Vec<RuleCheck> {
        let get = |key: &str| values.get(key).copied().flatten();
        let mut checks = Vec::new();

        if let (Some(assets), Some(liabilities), Some(equity)) =
            (get("Total assets"), get("Total liabilities"), get("Total equity"))
        {
            checks.push(self.evaluate(
                "Total assets = Total liabilities + Total equity",
                liabilities + equity,
                assets,
            ));
        }

        if let (Some(net), Some(income), Some(expenses)) = (
            get("Net interest income"),
            get("Interest income"),
            get("Interest expenses"),
        ) {
            checks.push(self.evaluate(
                "Net interest income = Interest income - Interest expenses",
                income - expenses.abs(),
                net,
            ));
        }

        if let (Some(profit), Some(before_tax), Some(tax)) = (
            get("Profit for the year"),
            get("Profit before tax"),
            get("Income tax expenses"),
        ) {
            checks.push(self.evaluate(
                "Profit for the year = Profit before tax - Income tax expenses",
                before_tax - tax.abs(),
                profit,
            ));
        }

        checks
    }

    fn evaluate(&self, rule: &str, expected: f64, actual: f64) -> RuleCheck {
        let difference = (expected - actual).abs();
        let scale = expected.abs().max(actual.abs()).max(1.0);
        let passed = difference <= self.tolerance * scale;
        if !passed {
            tracing::warn!(
                "Accounting rule failed: {} (expected {:.2}, reported {:.2})",
                rule,
                expected,
                actual
            );
        }
        RuleCheck { rule: rule.to_string(), passed, expected, actual, difference }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> AccountingValidator {
        AccountingValidator::new(&ExtractorConfig::default())
    }

    fn field_map(pairs: &[(&str, f64)]) -> BTreeMap<String, Option<f64>> {
        pairs.iter().map(|(k, v)| (k.to_string(), Some(*v))).collect()
    }

    #[test]
    fn test_balanced_position_passes() {
        let values = field_map(&[
            ("Total assets", 1_000_000.0),
            ("Total liabilities", 900_000.0),
            ("Total equity", 100_000.0),
        ]);
        let checks = validator().check(&values);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].passed, "Identity holds exactly: {:?}", checks[0]);
    }

    #[test]
    fn test_imbalance_beyond_tolerance_fails() {
        let values = field_map(&[
            ("Total assets", 1_000_000.0),
            ("Total liabilities", 900_000.0),
            ("Total equity", 50_000.0),
        ]);
        let checks = validator().check(&values);
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].passed);
        assert!((checks[0].difference - 50_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_rounding_gap_within_tolerance_passes() {
        // 0.5% off, tolerance is 1% relative.
        let values = field_map(&[
            ("Total assets", 1_000_000.0),
            ("Total liabilities", 900_000.0),
            ("Total equity", 95_000.0),
        ]);
        let checks = validator().check(&values);
        assert!(checks[0].passed);
    }

    #[test]
    fn test_bracketed_expense_convention_is_accepted() {
        let values = field_map(&[
            ("Net interest income", 211_145.0),
            ("Interest income", 512_345.0),
            ("Interest expenses", -301_200.0),
        ]);
        let checks = validator().check(&values);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].passed, "Negative expense figures validate the same as positive ones");

        let positive_convention = field_map(&[
            ("Net interest income", 211_145.0),
            ("Interest income", 512_345.0),
            ("Interest expenses", 301_200.0),
        ]);
        let checks = validator().check(&positive_convention);
        assert!(checks[0].passed);
    }

    #[test]
    fn test_missing_fields_skip_the_rule() {
        let values = field_map(&[("Total assets", 1_000_000.0)]);
        assert!(validator().check(&values).is_empty());

        let mut with_null = field_map(&[
            ("Profit for the year", 80_000.0),
            ("Profit before tax", 100_000.0),
        ]);
        with_null.insert("Income tax expenses".to_string(), None);
        assert!(validator().check(&with_null).is_empty(), "Null inputs skip, never fail");
    }

    #[test]
    fn test_tax_rule_checks_profit_chain() {
        let values = field_map(&[
            ("Profit for the year", 80_000.0),
            ("Profit before tax", 100_000.0),
            ("Income tax expenses", -20_000.0),
        ]);
        let checks = validator().check(&values);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].passed);
    }
}
