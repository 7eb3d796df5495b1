// src/extractors/column_interpreter.rs

// --- Imports ---
use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{Entity, YearSlot, YEAR_RE};

// --- Constants ---
const BASE_CONFIDENCE: f64 = 0.2;
const ANCHOR_BONUS: f64 = 0.3;
const YEAR_BONUS: f64 = 0.3;
const POSITION_BONUS: f64 = 0.2;
const UNKNOWN_FLOOR: f64 = 0.2;
// Note columns sit just right of the description column.
const NOTE_POSITION_LIMIT: usize = 2;

// --- Regex Patterns (Lazy Static) ---
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(particulars|description|details|items?)\b")
        .expect("Failed to compile DESCRIPTION_RE")
});

static NOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnotes?\b").expect("Failed to compile NOTE_RE"));

static BANK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(bank|company|entity)\b").expect("Failed to compile BANK_RE")
});

static GROUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(group|consolidated)\b").expect("Failed to compile GROUP_RE")
});

/// Semantic role of one table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Description,
    BankYear1,
    BankYear2,
    GroupYear1,
    GroupYear2,
    Note,
    Unknown,
}

/// Classification of one header column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_index: usize,
    pub column_type: ColumnType,
    pub entity: Option<Entity>,
    pub year: Option<u16>,
    pub confidence: f64,
    /// The merged header text the classification came from.
    pub header_text: String,
}

#[derive(Debug)]
struct HeaderFeatures {
    text: String,
    is_description: bool,
    is_note: bool,
    entity: Option<Entity>,
    year: Option<u16>,
}

/// Classifies statement-table header columns into description, note and
/// entity/year value columns. Never errors: strange headers degrade to
/// `unknown`.
#[derive(Debug, Clone, Default)]
pub struct ColumnInterpreter;

impl ColumnInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Merges multi-row headers per column and classifies every column.
    pub fn interpret(&self, header_rows: &[Vec<String>]) -> BTreeMap<usize, ColumnInfo> {
        let width = header_rows.iter().map(|row| row.len()).max().unwrap_or(0);
        if width == 0 {
            return BTreeMap::new();
        }

        let features: Vec<HeaderFeatures> = (0..width)
            .map(|idx| {
                let merged = header_rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                extract_features(merged)
            })
            .collect();

        // Most recent year in the header is Year1, the next distinct
        // year is the comparative.
        let mut years: Vec<u16> = features.iter().filter_map(|f| f.year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        let slot_of_year = |year: u16| -> Option<YearSlot> {
            match years.iter().position(|y| *y == year) {
                Some(0) => Some(YearSlot::Year1),
                Some(1) => Some(YearSlot::Year2),
                _ => None,
            }
        };

        let any_entity = features.iter().any(|f| f.entity.is_some());
        let mut used_slots: HashMap<Entity, BTreeSet<YearSlot>> = HashMap::new();
        let mut description_assigned = false;
        let mut columns = BTreeMap::new();

        for (idx, feat) in features.iter().enumerate() {
            let info = if feat.is_description {
                description_assigned = true;
                ColumnInfo {
                    column_index: idx,
                    column_type: ColumnType::Description,
                    entity: None,
                    year: feat.year,
                    confidence: confidence(true, false, idx == 0),
                    header_text: feat.text.clone(),
                }
            } else if feat.is_note && feat.entity.is_none() && feat.year.is_none() {
                ColumnInfo {
                    column_index: idx,
                    column_type: ColumnType::Note,
                    entity: None,
                    year: None,
                    confidence: confidence(true, false, idx <= NOTE_POSITION_LIMIT),
                    header_text: feat.text.clone(),
                }
            } else if feat.entity.is_some() || feat.year.is_some() {
                // Value column. A year-only header inherits the entity
                // of the nearest preceding entity-bearing column; a
                // table with no entity columns at all reports on the
                // standalone (Bank) basis.
                let anchored = feat.entity.is_some();
                let entity = feat.entity.or_else(|| {
                    features[..idx]
                        .iter()
                        .rev()
                        .find_map(|f| f.entity)
                        .or(if any_entity { None } else { Some(Entity::Bank) })
                });
                match entity {
                    Some(entity) => {
                        let slot = resolve_slot(
                            feat.year,
                            &slot_of_year,
                            used_slots.entry(entity).or_default(),
                        );
                        match slot {
                            Some(slot) => ColumnInfo {
                                column_index: idx,
                                column_type: value_column_type(entity, slot),
                                entity: Some(entity),
                                year: feat.year,
                                confidence: confidence(
                                    anchored,
                                    feat.year.is_some(),
                                    idx >= 1,
                                ),
                                header_text: feat.text.clone(),
                            },
                            None => unknown_column(idx, feat),
                        }
                    }
                    None => unknown_column(idx, feat),
                }
            } else if !description_assigned && !feat.is_note {
                // Leftmost column without entity or year defaults to
                // the description column.
                description_assigned = true;
                ColumnInfo {
                    column_index: idx,
                    column_type: ColumnType::Description,
                    entity: None,
                    year: None,
                    confidence: confidence(false, false, idx == 0),
                    header_text: feat.text.clone(),
                }
            } else {
                unknown_column(idx, feat)
            };

            tracing::trace!(
                "Column {} '{}' classified as {:?} (confidence {:.2})",
                idx,
                info.header_text,
                info.column_type,
                info.confidence
            );
            columns.insert(idx, info);
        }
        columns
    }
}

fn extract_features(merged: String) -> HeaderFeatures {
    let is_description = DESCRIPTION_RE.is_match(&merged);
    let is_note = NOTE_RE.is_match(&merged);

    // When both entity vocabularies appear, the earlier occurrence wins.
    let bank_at = BANK_RE.find(&merged).map(|m| m.start());
    let group_at = GROUP_RE.find(&merged).map(|m| m.start());
    let entity = match (bank_at, group_at) {
        (Some(b), Some(g)) if b <= g => Some(Entity::Bank),
        (Some(_), Some(_)) => Some(Entity::Group),
        (Some(_), None) => Some(Entity::Bank),
        (None, Some(_)) => Some(Entity::Group),
        (None, None) => None,
    };

    let year = YEAR_RE
        .find(&merged)
        .and_then(|m| m.as_str().parse::<u16>().ok());

    HeaderFeatures { text: merged, is_description, is_note, entity, year }
}

/// Explicit year wins; otherwise slots fill by left-to-right first
/// appearance for the entity. Exhausted slots leave the column
/// unclassifiable.
fn resolve_slot(
    year: Option<u16>,
    slot_of_year: &impl Fn(u16) -> Option<YearSlot>,
    used: &mut BTreeSet<YearSlot>,
) -> Option<YearSlot> {
    let slot = match year {
        Some(year) => slot_of_year(year),
        None => [YearSlot::Year1, YearSlot::Year2]
            .into_iter()
            .find(|slot| !used.contains(slot)),
    };
    if let Some(slot) = slot {
        used.insert(slot);
    }
    slot
}

fn value_column_type(entity: Entity, slot: YearSlot) -> ColumnType {
    match (entity, slot) {
        (Entity::Bank, YearSlot::Year1) => ColumnType::BankYear1,
        (Entity::Bank, YearSlot::Year2) => ColumnType::BankYear2,
        (Entity::Group, YearSlot::Year1) => ColumnType::GroupYear1,
        (Entity::Group, YearSlot::Year2) => ColumnType::GroupYear2,
    }
}

fn unknown_column(idx: usize, feat: &HeaderFeatures) -> ColumnInfo {
    ColumnInfo {
        column_index: idx,
        column_type: ColumnType::Unknown,
        entity: feat.entity,
        year: feat.year,
        confidence: UNKNOWN_FLOOR,
        header_text: feat.text.clone(),
    }
}

fn confidence(anchor: bool, year: bool, position: bool) -> f64 {
    let mut c = BASE_CONFIDENCE;
    if anchor {
        c += ANCHOR_BONUS;
    }
    if year {
        c += YEAR_BONUS;
    }
    if position {
        c += POSITION_BONUS;
    }
    c.min(1.0)
}
