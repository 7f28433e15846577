//! Batch processing command for multiple monthly reports.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use basket_core::{BasketConfig, BasketError, BasketExtractor, Extraction, Period};

use super::extract::{OutputFormat, format_extraction};
use super::store::RecordStore;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Reporting period applied to every file; read from each report when omitted
    #[arg(short, long)]
    period: Option<Period>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Upsert all records into a CSV store
    #[arg(long)]
    store: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Stop at the first file that fails instead of reporting it in the summary
    #[arg(long)]
    fail_fast: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Result<Extraction, BasketError>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config: BasketConfig) -> anyhow::Result<()> {
    let start = Instant::now();

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("pdf")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let extractor = Arc::new(BasketExtractor::new(config)?);
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let extractor = Arc::clone(&extractor);
        let semaphore = Arc::clone(&semaphore);
        let period = args.period;
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let task_path = path.clone();
            let (outcome, processing_time_ms) = tokio::task::spawn_blocking(move || {
                let file_start = Instant::now();
                let outcome = process_single_file(&task_path, &extractor, period);
                (outcome, file_start.elapsed().as_millis() as u64)
            })
            .await?;
            anyhow::Ok(ProcessResult {
                path,
                outcome,
                processing_time_ms,
            })
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    let mut pending = handles.into_iter();
    while let Some(handle) = pending.next() {
        let result = handle.await??;
        overall_pb.inc(1);

        if let Err(e) = &result.outcome {
            if args.fail_fast {
                error!("Failed to process {}: {}", result.path.display(), e);
                for rest in pending {
                    rest.abort();
                }
                overall_pb.abandon();
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), e);
            }
            warn!("Failed to process {}: {}", result.path.display(), e);
        }
        results.push(result);
    }

    overall_pb.finish_with_message("Complete");

    let successful: Vec<(&ProcessResult, &Extraction)> = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok().map(|e| (r, e)))
        .collect();
    let failed: Vec<(&ProcessResult, &BasketError)> = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().err().map(|e| (r, e)))
        .collect();

    if let Some(output_dir) = &args.output_dir {
        for (result, extraction) in &successful {
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("report");
            let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_extraction(extraction, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if let Some(store_path) = &args.store {
        let records: Vec<_> = successful
            .iter()
            .flat_map(|(_, e)| e.records.iter().cloned())
            .collect();
        let stats = RecordStore::new(store_path).upsert(&records)?;
        println!(
            "{} Store {}: {} inserted, {} updated, {} unchanged",
            style("✓").green(),
            store_path.display(),
            stats.inserted,
            stats.updated,
            stats.unchanged
        );
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let record_count: usize = successful.iter().map(|(_, e)| e.records.len()).sum();
    let warning_count: usize = successful.iter().map(|(_, e)| e.warning_count()).sum();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} records, {} warnings",
        style(successful.len()).green(),
        style(failed.len()).red(),
        record_count,
        warning_count
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (result, e) in &failed {
            println!("  - {}: [{}] {}", result.path.display(), e.kind(), e);
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    extractor: &BasketExtractor,
    period: Option<Period>,
) -> Result<Extraction, BasketError> {
    let data = fs::read(path)?;
    extractor.extract(&data, period)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "period",
        "page",
        "records",
        "missing_prices",
        "warnings",
        "processing_time_ms",
        "failure",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &result.outcome {
            Ok(extraction) => {
                wtr.write_record([
                    filename,
                    "success",
                    &extraction.period.to_string(),
                    &extraction.page.to_string(),
                    &extraction.records.len().to_string(),
                    &extraction.skipped.missing_prices.to_string(),
                    &extraction.warning_count().to_string(),
                    &result.processing_time_ms.to_string(),
                    "",
                    "",
                ])?;
            }
            Err(e) => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "0",
                    "",
                    "",
                    &result.processing_time_ms.to_string(),
                    e.kind().as_str(),
                    &e.to_string(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
