// src/utils/debug_dump.rs
use std::fs;
use std::path::Path;

use crate::utils::error::AppError;

/// Writes a per-page layout score table to a plain-text file.
/// Each row is (page index, overall score, signal summary).
pub fn save_page_scores(filename: &str, rows: &[(usize, f64, String)]) -> Result<(), AppError> {
    let path = Path::new(filename);

    let mut out = String::from("page   score  signals\n");
    for (page, score, signals) in rows {
        out.push_str(&format!("{:>4}  {:>6.3}  {}\n", page, score, signals));
    }

    fs::write(path, out)?;

    tracing::info!("Saved page score dump to {}", path.display());
    Ok(())
}
