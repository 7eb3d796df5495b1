// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::locator::LocationMap;
use crate::schema::CanonicalReport;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Saves located page candidates for one document in JSON format
    pub fn save_location_results(
        &self,
        document_name: &str,
        locations: &LocationMap,
    ) -> Result<PathBuf, StorageError> {
        let filename = format!("{}_locations.json", document_name);
        let file_path = self.base_dir.join(filename);

        let payload = serde_json::json!({
            "document": document_name,
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "locations": locations,
        });

        let payload_str = serde_json::to_string_pretty(&payload)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, payload_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved location results to {}", file_path.display());

        Ok(file_path)
    }

    /// Saves the canonical extraction report for one document
    pub fn save_canonical_report(
        &self,
        document_name: &str,
        report: &CanonicalReport,
    ) -> Result<PathBuf, StorageError> {
        let filename = format!("{}_canonical.json", document_name);
        let file_path = self.base_dir.join(filename);

        let report_str = serde_json::to_string_pretty(report)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, report_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved canonical report to {}", file_path.display());

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{DetectorSource, EvidenceItem, EvidenceKind, PageCandidate, PageRange};
    use crate::schema::{CanonicalBuilder, StatementType};
    use std::collections::BTreeMap;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("statement_extractor_{}_{}", label, std::process::id()))
    }

    #[test]
    fn test_save_location_results_writes_json() {
        let dir = scratch_dir("locations");
        let storage = StorageManager::new(&dir).unwrap();

        let mut locations: LocationMap = BTreeMap::new();
        locations.insert(
            StatementType::IncomeStatement,
            vec![PageCandidate::new(
                StatementType::IncomeStatement,
                PageRange::single(120),
                0.9,
                vec![EvidenceItem::new(EvidenceKind::Heading, "exact title match", 0.9)],
                DetectorSource::HeadingScan,
            )],
        );

        let path = storage.save_location_results("annual_report_2023", &locations).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();

        assert_eq!(parsed["document"], "annual_report_2023");
        assert!(parsed["locations"]["income_statement"].is_array());
        assert_eq!(parsed["locations"]["income_statement"][0]["pages"]["start"], 120);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_canonical_report_round_trips() {
        let dir = scratch_dir("canonical");
        let storage = StorageManager::new(&dir).unwrap();

        let mut builder = CanonicalBuilder::new("annual_report_2023");
        builder.set_currency(Some("LKR"));
        let report = builder.build();

        let path = storage.save_canonical_report("annual_report_2023", &report).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let parsed: CanonicalReport = serde_json::from_str(&contents).unwrap();

        assert_eq!(parsed.source, "annual_report_2023");
        assert_eq!(parsed.currency.as_deref(), Some("LKR"));

        let _ = fs::remove_dir_all(&dir);
    }
}
