//! Resample pipeline: load a base CSV, aggregate, write one CSV per target

use crate::config::ResampleConfig;
use crate::data::{load_csv, CsvStorage};
use crate::resample::{OhlcvAggregator, ResampleTarget};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Outcome of one resample target
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: String,
    /// Rows written, `None` if writing failed
    pub rows: Option<usize>,
    pub path: PathBuf,
}

/// Result of a resample run
#[derive(Debug, Clone)]
pub struct ResampleSummary {
    pub input: PathBuf,
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub duplicates_removed: usize,
    pub outcomes: Vec<TargetOutcome>,
}

impl ResampleSummary {
    /// Targets written successfully
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.rows.is_some()).count()
    }

    /// Targets whose output could not be written
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Format summary as string
    pub fn format(&self) -> String {
        let mut out = format!(
            r#"
Resample Summary
================
Input: {}
Input Rows: {}
Dropped Rows: {}
Duplicates Removed: {}
Targets Written: {}/{}
"#,
            self.input.display(),
            self.input_rows,
            self.dropped_rows,
            self.duplicates_removed,
            self.succeeded(),
            self.outcomes.len(),
        );
        for outcome in &self.outcomes {
            let rows = match outcome.rows {
                Some(rows) => format!("{rows} rows"),
                None => "FAILED".to_string(),
            };
            out.push_str(&format!(
                "  {:<12} {:>12}  {}\n",
                outcome.target,
                rows,
                outcome.path.display()
            ));
        }
        out
    }
}

/// Strip the `_1min_` token from an input file stem.
///
/// `BTCUSDT_1min_20231201_to_20241201.csv` becomes
/// `BTCUSDT_20231201_to_20241201`.
pub fn base_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.replacen("_1min_", "_", 1)
}

/// `{base}_{suffix}.csv`
pub fn output_filename(base: &str, target: &ResampleTarget) -> String {
    format!("{}_{}.csv", base, target.file_suffix())
}

/// Run the resample pipeline.
///
/// A load or schema failure is fatal. A failure to write one target is
/// logged and counted, and the remaining targets are still produced.
pub fn resample_file(config: &ResampleConfig) -> Result<ResampleSummary> {
    config.validate()?;

    let loaded = load_csv(&config.input)?;
    let storage = CsvStorage::new(config.resolved_output_dir());
    let aggregator = OhlcvAggregator::new(config.base);
    let base = base_name(&config.input);

    info!(
        "Resampling {} candles from {} into {} timeframes",
        loaded.series.len(),
        config.input.display(),
        config.targets.len()
    );

    let mut outcomes = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let filename = output_filename(&base, target);
        let resampled = aggregator.aggregate(&loaded.series, target.timeframe);

        let outcome = match storage.save(&filename, &resampled) {
            Ok(path) => {
                info!("{}: {} records -> {}", target, resampled.len(), path.display());
                TargetOutcome {
                    target: target.name.clone(),
                    rows: Some(resampled.len()),
                    path,
                }
            }
            Err(e) => {
                error!("Failed to write {}: {}", target, e);
                TargetOutcome {
                    target: target.name.clone(),
                    rows: None,
                    path: storage.path_for(&filename),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(ResampleSummary {
        input: config.input.clone(),
        input_rows: loaded.series.len(),
        dropped_rows: loaded.dropped_rows,
        duplicates_removed: loaded.duplicates_removed,
        outcomes,
    })
}
