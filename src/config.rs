// src/config.rs

/// Thresholds and scan windows for the location and mapping stages.
/// Built once by the caller (CLI flags or defaults) and handed to each
/// component at construction; nothing here is read from the environment.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Fused candidates below this confidence are discarded.
    pub min_page_confidence: f64,
    /// Minimum fuzzy label-match score on a 0-100 scale.
    pub fuzzy_threshold: f64,
    /// Confidence assigned to synonym-table label matches.
    pub synonym_confidence: f64,
    /// How many leading pages to inspect for a table of contents.
    pub toc_scan_window: usize,
    /// Once every statement type has a candidate at or above this,
    /// remaining page scans short-circuit.
    pub early_stop_confidence: f64,
    /// Minimum per-page layout score for a page to join a layout candidate.
    pub layout_min_score: f64,
    /// Relative tolerance for accounting-rule checks.
    pub validation_tolerance: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_page_confidence: 0.5,
            fuzzy_threshold: 85.0,
            synonym_confidence: 0.95,
            toc_scan_window: 20,
            early_stop_confidence: 0.9,
            layout_min_score: 0.6,
            validation_tolerance: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_are_sane() {
        let cfg = ExtractorConfig::default();
        assert!(cfg.min_page_confidence > 0.0 && cfg.min_page_confidence < 1.0);
        assert!(cfg.fuzzy_threshold > 0.0 && cfg.fuzzy_threshold <= 100.0);
        assert!(cfg.synonym_confidence <= 1.0);
        assert!(cfg.toc_scan_window > 0, "ToC window must cover at least one page");
    }
}
