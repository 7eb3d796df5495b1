// src/mapper/mod.rs
pub mod mapping_engine;

// Re-export key mapping types for convenience
pub use mapping_engine::{MappingEngine, MappingResult, MatchMethod};
