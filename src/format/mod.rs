//! Output naming, CSV and JSON writing, and the run summary printed to stdout.

use crate::commands::reviews::{Outcome, RunReport};
use crate::error::ReviewResult;
use crate::target::Target;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A serializable CSV row with a fixed header.
///
/// The header is written explicitly so an empty review list still yields a
/// valid file.
pub trait CsvRow: Serialize {
    const HEADERS: &'static [&'static str];
}

/// A CSV file produced by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub rows: usize,
}

/// Replaces carriage returns and line feeds with spaces, one for one.
pub fn normalize_body(text: &str) -> String {
    text.replace('\r', " ").replace('\n', " ")
}

/// Returns `{identifier}-{lang}-{country}-{marketplace}-app-review.csv`.
pub fn output_file_name(target: &Target) -> String {
    format!(
        "{}-{}-{}-{}-app-review.csv",
        target.identifier,
        target.lang,
        target.country,
        target.marketplace.slug()
    )
}

/// Writes rows for a target under `dir`, creating the directory if needed.
pub fn write_reviews<T: CsvRow>(
    dir: &Path,
    target: &Target,
    rows: &[T],
) -> ReviewResult<OutputFile> {
    fs::create_dir_all(dir)?;
    let path = dir.join(output_file_name(target));
    debug!("Writing {} rows to {}", rows.len(), path.display());

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&path)?;
    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Wrote {} reviews to {}", rows.len(), path.display());
    Ok(OutputFile { path, rows: rows.len() })
}

/// Writes `value` as pretty-printed JSON to `dir/file_name`.
pub fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    file_name: &str,
    value: &T,
) -> ReviewResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    debug!("Writing {}", path.display());

    let mut writer = BufWriter::new(fs::File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Formats a UTC time as `2024-03-01T17:00:00.000Z`.
pub fn iso_millis(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// File-name-safe form of [`iso_millis`]: `2024-03-01T17-00-00-000Z`.
pub fn file_stamp(time: DateTime<Utc>) -> String {
    iso_millis(time).replace([':', '.'], "-")
}

/// Formats a run report as a small table.
pub fn format_report(report: &RunReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{:<12}  {:<8}  {}", "Store", "Status", "Detail"));
    lines.push(format!("{:-<12}  {:-<8}  {:-<40}", "", "", ""));

    for (marketplace, outcome) in report.outcomes() {
        let (status, detail) = match outcome {
            Outcome::Written(file) => {
                ("written", format!("{} reviews -> {}", file.rows, file.path.display()))
            }
            Outcome::Skipped(reason) => ("skipped", reason.to_string()),
            Outcome::Failed(err) => ("failed", err.to_string()),
        };
        lines.push(format!("{:<12}  {:<8}  {}", marketplace.to_string(), status, detail));
    }

    lines.join("\n")
}
