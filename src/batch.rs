//! Directory-level driver: one JSON output per PDF, failures isolated per
//! document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{OutlineError, Result};
use crate::logging::OUTLINE_BATCH;
use crate::OutlineExtractor;

/// Soft per-document time budget. Overruns are logged, never aborted.
pub const SOFT_TIME_LIMIT: Duration = Duration::from_secs(10);
/// Page count at which an overrun is reported as critical.
pub const LARGE_DOCUMENT_PAGES: u32 = 50;

#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    error: String,
    input_file: &'a str,
    processing_time_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Processed { outline_items: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub elapsed: Duration,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub reports: Vec<FileReport>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, FileOutcome::Processed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.processed()
    }
}

/// PDFs directly inside `dir`, sorted by name.
pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

/// Process every PDF in `input_dir` in parallel, writing `<stem>.json` files
/// into `output_dir`.
pub fn run_batch(
    extractor: &OutlineExtractor,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<BatchSummary> {
    if !input_dir.is_dir() {
        return Err(OutlineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory {} does not exist", input_dir.display()),
        )));
    }
    fs::create_dir_all(output_dir)?;

    let pdfs = find_pdfs(input_dir)?;
    if pdfs.is_empty() {
        info!(target: OUTLINE_BATCH, dir = %input_dir.display(), "No PDF files found");
        return Ok(BatchSummary::default());
    }
    info!(target: OUTLINE_BATCH, count = pdfs.len(), "Found PDF files to process");

    let reports: Vec<FileReport> = pdfs
        .par_iter()
        .map(|pdf| process_file(extractor, pdf, output_dir))
        .collect();

    let summary = BatchSummary { reports };
    info!(
        target: OUTLINE_BATCH,
        processed = summary.processed(),
        failed = summary.failed(),
        "Batch processing complete"
    );
    Ok(summary)
}

fn process_file(extractor: &OutlineExtractor, pdf: &Path, output_dir: &Path) -> FileReport {
    let file_name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_name = format!("{}.json", stem);
    let output = output_dir.join(&output_name);

    let start = Instant::now();
    let result = extractor.extract_path(pdf);
    let elapsed = start.elapsed();

    let written = match result {
        Ok(mut document) => {
            document.metadata.processing_time_seconds = Some(elapsed.as_secs_f64());
            document.metadata.input_file = Some(file_name.clone());
            document.metadata.output_file = Some(output_name);

            if elapsed > SOFT_TIME_LIMIT {
                let pages = document.metadata.total_pages;
                if pages >= LARGE_DOCUMENT_PAGES {
                    error!(
                        target: OUTLINE_BATCH,
                        file = %file_name,
                        pages,
                        secs = elapsed.as_secs_f64(),
                        "Large document exceeded time limit"
                    );
                } else {
                    warn!(
                        target: OUTLINE_BATCH,
                        file = %file_name,
                        pages,
                        secs = elapsed.as_secs_f64(),
                        "Processing exceeded time limit"
                    );
                }
            }

            let items = document.metadata.outline_items;
            write_json(&output, &document).map(|_| items)
        }
        Err(e) => Err(e),
    };

    let outcome = match written {
        Ok(outline_items) => {
            info!(
                target: OUTLINE_BATCH,
                file = %file_name,
                outline_items,
                secs = elapsed.as_secs_f64(),
                "Processed"
            );
            FileOutcome::Processed { outline_items }
        }
        Err(e) => {
            error!(target: OUTLINE_BATCH, file = %file_name, "Error processing: {}", e);
            let record = ErrorRecord {
                error: e.to_string(),
                input_file: &file_name,
                processing_time_seconds: elapsed.as_secs_f64(),
            };
            if let Err(write_err) = write_json(&output, &record) {
                error!(
                    target: OUTLINE_BATCH,
                    file = %file_name,
                    "Failed to write error record: {}",
                    write_err
                );
            }
            FileOutcome::Failed {
                error: e.to_string(),
            }
        }
    };

    FileReport {
        input: pdf.to_path_buf(),
        output,
        elapsed,
        outcome,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
