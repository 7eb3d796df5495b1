// src/schema/canonical.rs

// --- Imports ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::TableRow;
use crate::extractors::{ColumnInfo, ColumnType, NormalizedValue, UnitScale};
use crate::mapper::MappingResult;
use crate::schema::{Entity, StatementType, YearSlot};

/// Why a row or cell was routed to manual review instead of the
/// canonical map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    UnmappedLabel,
    ParseFailure,
}

/// One entry in the manual review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    pub statement_type: StatementType,
    pub raw_label: String,
    pub reason: ReviewReason,
    /// The offending cell or column, when the problem is narrower than
    /// the whole row.
    pub detail: Option<String>,
}

type FieldValues = BTreeMap<String, Option<f64>>;
type StatementValues = BTreeMap<StatementType, FieldValues>;

/// Normalized extraction output for one document: figures keyed by
/// entity, year slot, statement and canonical field, with unit and
/// currency metadata and a review queue for everything that did not
/// make it in cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalReport {
    pub source: String,
    pub generated_at: String,
    pub currency: Option<String>,
    /// Magnitude the stored figures are quoted in, as reported.
    pub unit: UnitScale,
    pub statements: BTreeMap<Entity, BTreeMap<YearSlot, StatementValues>>,
    pub review: Vec<ReviewItem>,
}

impl CanonicalReport {
    /// Field values for one (entity, year, statement) cell of the report.
    pub fn values(
        &self,
        entity: Entity,
        slot: YearSlot,
        statement: StatementType,
    ) -> Option<&FieldValues> {
        self.statements.get(&entity)?.get(&slot)?.get(&statement)
    }
}

/// Accumulates interpreted table rows into a [`CanonicalReport`].
///
/// Rows whose label mapped to no canonical field go to the review
/// queue, as do cells that failed numeric parsing. Null cells are kept
/// as explicit nulls so a reported dash never becomes a zero.
#[derive(Debug, Clone)]
pub struct CanonicalBuilder {
    source: String,
    currency: Option<String>,
    unit: UnitScale,
    statements: BTreeMap<Entity, BTreeMap<YearSlot, StatementValues>>,
    review: Vec<ReviewItem>,
}

impl CanonicalBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            currency: None,
            unit: UnitScale::Ones,
            statements: BTreeMap::new(),
            review: Vec::new(),
        }
    }

    pub fn set_currency(&mut self, currency: Option<&str>) {
        self.currency = currency.map(|c| c.to_string());
    }

    pub fn set_unit(&mut self, unit: UnitScale) {
        self.unit = unit;
    }

    /// Merges one interpreted table into the report.
    ///
    /// `rows`, `mappings` and `values` run in parallel; `values[i]`
    /// holds the normalized cells of `rows[i]`, aligned with the grid
    /// columns of `columns` minus the description column. The first
    /// occurrence of a canonical field wins, so repeats further down
    /// the table (note sections restating a total) do not overwrite it.
    pub fn add_statement(
        &mut self,
        statement: StatementType,
        columns: &BTreeMap<usize, ColumnInfo>,
        rows: &[TableRow],
        mappings: &[MappingResult],
        values: &[Vec<NormalizedValue>],
    ) {
        debug_assert_eq!(rows.len(), mappings.len(), "one mapping per row");
        debug_assert_eq!(rows.len(), values.len(), "one value row per table row");

        // Cells are positional over the grid with the description
        // column removed.
        let cell_columns: Vec<&ColumnInfo> = columns
            .values()
            .filter(|info| info.column_type != ColumnType::Description)
            .collect();

        for ((row, mapping), row_values) in rows.iter().zip(mappings).zip(values) {
            let canonical_key = match &mapping.canonical_key {
                Some(key) => key,
                None => {
                    self.review.push(ReviewItem {
                        statement_type: statement,
                        raw_label: row.label.clone(),
                        reason: ReviewReason::UnmappedLabel,
                        detail: None,
                    });
                    continue;
                }
            };

            for (cell_idx, info) in cell_columns.iter().enumerate() {
                let (entity, slot) = match entity_slot(info.column_type) {
                    Some(pair) => pair,
                    None => continue,
                };
                let value = match row_values.get(cell_idx) {
                    Some(value) => value,
                    None => continue,
                };
                if value.parse_failed {
                    self.review.push(ReviewItem {
                        statement_type: statement,
                        raw_label: row.label.clone(),
                        reason: ReviewReason::ParseFailure,
                        detail: Some(format!("'{}' in column '{}'", value.raw, info.header_text)),
                    });
                    continue;
                }
                self.statements
                    .entry(entity)
                    .or_default()
                    .entry(slot)
                    .or_default()
                    .entry(statement)
                    .or_default()
                    .entry(canonical_key.clone())
                    .or_insert(value.value);
            }
        }
    }

    pub fn build(self) -> CanonicalReport {
        CanonicalReport {
            source: self.source,
            generated_at: chrono::Utc::now().to_rfc3339(),
            currency: self.currency,
            unit: self.unit,
            statements: self.statements,
            review: self.review,
        }
    }
}

fn entity_slot(column_type: ColumnType) -> Option<(Entity, YearSlot)> {
    match column_type {
        ColumnType::BankYear1 => Some((Entity::Bank, YearSlot::Year1)),
        ColumnType::BankYear2 => Some((Entity::Bank, YearSlot::Year2)),
        ColumnType::GroupYear1 => Some((Entity::Group, YearSlot::Year1)),
        ColumnType::GroupYear2 => Some((Entity::Group, YearSlot::Year2)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::extractors::{ColumnInterpreter, NumericNormalizer};
    use crate::mapper::MappingEngine;

    fn interpreted_columns() -> BTreeMap<usize, ColumnInfo> {
        let header = vec![
            vec!["".to_string(), "Bank".to_string(), "Bank".to_string()],
            vec!["Particulars".to_string(), "2023".to_string(), "2022".to_string()],
        ];
        ColumnInterpreter::new().interpret(&header)
    }

    fn table_row(label: &str, cells: &[&str]) -> TableRow {
        TableRow {
            label: label.to_string(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn add_rows(builder: &mut CanonicalBuilder, rows: Vec<TableRow>) {
        let columns = interpreted_columns();
        let engine = MappingEngine::new(&ExtractorConfig::default());
        let normalizer = NumericNormalizer::new();

        let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();
        let mappings = engine.map_labels(&labels, StatementType::IncomeStatement);
        let values: Vec<Vec<NormalizedValue>> =
            rows.iter().map(|r| normalizer.normalize_row(&r.cells)).collect();

        builder.add_statement(
            StatementType::IncomeStatement,
            &columns,
            &rows,
            &mappings,
            &values,
        );
    }

    #[test]
    fn test_mapped_rows_land_under_entity_slot_and_field() {
        let mut builder = CanonicalBuilder::new("annual_report_2023");
        add_rows(
            &mut builder,
            vec![
                table_row("Interest income", &["512,345", "498,120"]),
                table_row("Interest expenses", &["(301,200)", "(280,500)"]),
            ],
        );
        let report = builder.build();

        let year1 = report
            .values(Entity::Bank, YearSlot::Year1, StatementType::IncomeStatement)
            .unwrap();
        assert_eq!(year1["Interest income"], Some(512_345.0));
        assert_eq!(year1["Interest expenses"], Some(-301_200.0));

        let year2 = report
            .values(Entity::Bank, YearSlot::Year2, StatementType::IncomeStatement)
            .unwrap();
        assert_eq!(year2["Interest income"], Some(498_120.0));
    }

    #[test]
    fn test_null_cells_stay_null() {
        let mut builder = CanonicalBuilder::new("report");
        add_rows(&mut builder, vec![table_row("Net trading income", &["-", "1,200"])]);
        let report = builder.build();

        let year1 = report
            .values(Entity::Bank, YearSlot::Year1, StatementType::IncomeStatement)
            .unwrap();
        assert!(year1.contains_key("Net trading income"), "Null is recorded, not dropped");
        assert_eq!(year1["Net trading income"], None, "A dash never becomes zero");
        assert!(report.review.is_empty());
    }

    #[test]
    fn test_unmapped_label_goes_to_review() {
        let mut builder = CanonicalBuilder::new("report");
        add_rows(&mut builder, vec![table_row("Completely novel line item", &["10", "20"])]);
        let report = builder.build();

        assert!(report
            .values(Entity::Bank, YearSlot::Year1, StatementType::IncomeStatement)
            .is_none());
        assert_eq!(report.review.len(), 1);
        assert_eq!(report.review[0].reason, ReviewReason::UnmappedLabel);
        assert_eq!(report.review[0].raw_label, "Completely novel line item");
    }

    #[test]
    fn test_parse_failure_goes_to_review_without_a_value() {
        let mut builder = CanonicalBuilder::new("report");
        add_rows(&mut builder, vec![table_row("Interest income", &["garbled#", "498,120"])]);
        let report = builder.build();

        let year1 = report
            .values(Entity::Bank, YearSlot::Year1, StatementType::IncomeStatement)
            .cloned()
            .unwrap_or_default();
        assert!(!year1.contains_key("Interest income"));

        let year2 = report
            .values(Entity::Bank, YearSlot::Year2, StatementType::IncomeStatement)
            .unwrap();
        assert_eq!(year2["Interest income"], Some(498_120.0), "Good cells in the row still land");

        assert_eq!(report.review.len(), 1);
        assert_eq!(report.review[0].reason, ReviewReason::ParseFailure);
        assert!(report.review[0].detail.as_deref().unwrap_or("").contains("garbled#"));
    }

    #[test]
    fn test_first_occurrence_of_a_field_wins() {
        let mut builder = CanonicalBuilder::new("report");
        add_rows(
            &mut builder,
            vec![
                table_row("Interest income", &["512,345", "498,120"]),
                table_row("Interest income", &["999", "999"]),
            ],
        );
        let report = builder.build();

        let year1 = report
            .values(Entity::Bank, YearSlot::Year1, StatementType::IncomeStatement)
            .unwrap();
        assert_eq!(year1["Interest income"], Some(512_345.0));
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut builder = CanonicalBuilder::new("annual_report_2023");
        builder.set_currency(Some("LKR"));
        builder.set_unit(UnitScale::Thousands);
        let report = builder.build();

        assert_eq!(report.source, "annual_report_2023");
        assert_eq!(report.currency.as_deref(), Some("LKR"));
        assert_eq!(report.unit, UnitScale::Thousands);
        assert!(!report.generated_at.is_empty());

        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"unit\": \"thousands\""));
    }
}
