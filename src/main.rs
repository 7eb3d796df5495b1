// src/main.rs
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use statement_extractor::config::ExtractorConfig;
use statement_extractor::document::ExtractionInput;
use statement_extractor::extractors::{
    detect_currency, detect_scale, ColumnInterpreter, NormalizedValue, NumericNormalizer,
    UnitScale,
};
use statement_extractor::locator::{LayoutAnalyzer, PageLocator};
use statement_extractor::mapper::{MappingEngine, MatchMethod};
use statement_extractor::schema::{CanonicalBuilder, Entity, StatementType, YearSlot};
use statement_extractor::storage::StorageManager;
use statement_extractor::utils::{self, AppError};
use statement_extractor::validation::AccountingValidator;

/// Command Line Interface for the statement locator and normalizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the extraction input JSON (document pages plus optional raw tables)
    input: String,

    /// Output directory for location results and canonical reports
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Minimum fused confidence for a page candidate to survive
    #[arg(long, default_value_t = 0.5)]
    min_confidence: f64,

    /// Fuzzy label-match threshold in percent
    #[arg(long, default_value_t = 85.0)]
    fuzzy_threshold: f64,

    /// Leading pages scanned for a table of contents
    #[arg(long, default_value_t = 20)]
    toc_window: usize,

    /// Candidates kept per statement type in the saved location results
    #[arg(long, default_value_t = 3)]
    top_n: usize,

    /// Deadline for page location, in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Debug mode - dump per-page layout scores next to the results
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    if !(0.0..=1.0).contains(&args.min_confidence) {
        return Err(AppError::Config(format!(
            "--min-confidence must lie in [0, 1], got {}",
            args.min_confidence
        )));
    }

    let config = ExtractorConfig {
        min_page_confidence: args.min_confidence,
        fuzzy_threshold: args.fuzzy_threshold,
        toc_scan_window: args.toc_window,
        ..ExtractorConfig::default()
    };

    // 3. Initialize storage
    let storage = StorageManager::new(&args.output_dir)?;

    // 4. Load the extraction input
    let ExtractionInput { document, tables } = ExtractionInput::from_file(&args.input)?;
    let name = document.name().to_string();
    let document = Arc::new(document);
    tracing::info!(
        "Loaded '{}' ({} pages, {} raw table(s))",
        name,
        document.pages.len(),
        tables.len()
    );

    // 5. Locate the three statements
    let locator = PageLocator::new(config.clone());
    let locations = locator
        .locate_with_timeout(Arc::clone(&document), Duration::from_secs(args.timeout_secs))
        .await?;

    for statement in StatementType::ALL {
        match locations.get(&statement).and_then(|candidates| candidates.first()) {
            Some(best) => tracing::info!(
                "{}: pages {} (confidence {:.2}, sources: {})",
                statement,
                best.pages,
                best.confidence,
                best.sources.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("+")
            ),
            None => tracing::warn!("{}: no location found", statement),
        }
    }

    let best = PageLocator::best_candidates(&locations, args.top_n);
    storage.save_location_results(&name, &best)?;

    // 6. Optionally dump per-page layout scores for threshold tuning
    if args.debug {
        let analyzer = LayoutAnalyzer::new(&config);
        let scores = analyzer.score_pages(document.as_ref());
        let rows: Vec<(usize, f64, String)> =
            scores.iter().map(|s| (s.page, s.score, s.signals.summary())).collect();
        let path = format!("{}/{}_layout_scores.txt", args.output_dir, name);
        utils::debug_dump::save_page_scores(&path, &rows)?;
        tracing::info!("Saved layout scores to {}", path);
    }

    // 7. Normalize any supplied raw tables into the canonical report
    if tables.is_empty() {
        tracing::info!("No raw tables supplied; location-only run complete.");
        return Ok(());
    }

    let interpreter = ColumnInterpreter::new();
    let engine = MappingEngine::new(&config);
    let normalizer = NumericNormalizer::new();
    let mut builder = CanonicalBuilder::new(name.clone());

    let mut currency: Option<&'static str> = None;
    let mut unit: Option<UnitScale> = None;
    let mut success_count = 0;
    let mut failure_count = 0;

    for (statement, table) in &tables {
        tracing::info!("Normalizing {} table ({} data rows)", statement, table.rows.len());

        let columns = interpreter.interpret(&table.header_rows);
        if columns.is_empty() {
            tracing::error!("{} table has no header columns, skipping", statement);
            failure_count += 1;
            continue;
        }

        // The first table announcing a currency or unit names them for
        // the whole report.
        let header_text =
            table.header_rows.iter().flatten().cloned().collect::<Vec<_>>().join(" ");
        if currency.is_none() {
            currency = detect_currency(&header_text);
        }
        if unit.is_none() {
            match detect_scale(&header_text) {
                UnitScale::Ones => {}
                scale => unit = Some(scale),
            }
        }

        let labels: Vec<String> = table.rows.iter().map(|row| row.label.clone()).collect();
        let mappings = engine.map_labels(&labels, *statement);
        let mapped = mappings.iter().filter(|m| m.match_method != MatchMethod::None).count();
        tracing::info!("Mapped {}/{} row labels for {}", mapped, mappings.len(), statement);

        let values: Vec<Vec<NormalizedValue>> =
            table.rows.iter().map(|row| normalizer.normalize_row(&row.cells)).collect();

        builder.add_statement(*statement, &columns, &table.rows, &mappings, &values);

        if mapped == 0 && !table.rows.is_empty() {
            tracing::error!("No row label of the {} table could be mapped", statement);
            failure_count += 1;
        } else {
            success_count += 1;
        }
    }

    builder.set_currency(currency);
    builder.set_unit(unit.unwrap_or_default());
    let report = builder.build();

    // 8. Check accounting identities on what was extracted
    let validator = AccountingValidator::new(&config);
    let mut checks_passed = 0;
    let mut checks_failed = 0;
    for entity in [Entity::Bank, Entity::Group] {
        for slot in [YearSlot::Year1, YearSlot::Year2] {
            for statement in StatementType::ALL {
                if let Some(values) = report.values(entity, slot, statement) {
                    for check in validator.check(values) {
                        if check.passed {
                            checks_passed += 1;
                        } else {
                            checks_failed += 1;
                        }
                    }
                }
            }
        }
    }
    tracing::info!("Accounting checks: {} passed, {} failed", checks_passed, checks_failed);
    if !report.review.is_empty() {
        tracing::warn!("{} item(s) routed to manual review", report.review.len());
    }

    storage.save_canonical_report(&name, &report)?;

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to normalize any of {} raw table(s)",
            failure_count
        )));
    }

    Ok(())
}
