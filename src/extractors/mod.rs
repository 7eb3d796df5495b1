// src/extractors/mod.rs
pub mod column_interpreter;
pub mod numeric_normalizer;
pub mod unit_detector;

// Re-export key extraction types for convenience
pub use column_interpreter::{ColumnInfo, ColumnInterpreter, ColumnType};
pub use numeric_normalizer::{NormalizedValue, NumericNormalizer};
pub use unit_detector::{detect_currency, detect_scale, UnitScale};
