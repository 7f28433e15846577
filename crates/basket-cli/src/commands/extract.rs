//! Extract command - basket records from a single report.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use basket_core::{BasketConfig, BasketExtractor, Extraction, Period};

use super::store::{CsvRow, RecordStore};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF report
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Reporting period (YYYY-MM); read from the report when omitted
    #[arg(short, long)]
    period: Option<Period>,

    /// Upsert the records into a CSV store
    #[arg(long)]
    store: Option<PathBuf>,

    /// Show the selected table and skip counts
    #[arg(long)]
    show_stats: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per record
    Csv,
    /// Plain text table
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config: BasketConfig) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );

    pb.set_message("Loading PDF...");
    let data = fs::read(&args.input)?;

    pb.set_message("Scanning tables...");
    let extractor = BasketExtractor::new(config)?;
    let extraction = extractor.extract(&data, args.period)?;

    pb.finish_and_clear();

    let output = format_extraction(&extraction, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if let Some(store_path) = &args.store {
        let stats = RecordStore::new(store_path).upsert(&extraction.records)?;
        println!(
            "{} Store {}: {} inserted, {} updated, {} unchanged",
            style("✓").green(),
            store_path.display(),
            stats.inserted,
            stats.updated,
            stats.unchanged
        );
    }

    if extraction.warning_count() > 0 {
        eprintln!(
            "{} {} values skipped with warnings",
            style("⚠").yellow(),
            extraction.warning_count()
        );
    }

    if args.show_stats {
        print_stats(&extraction);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_stats(extraction: &Extraction) {
    let skipped = &extraction.skipped;
    println!();
    println!(
        "{} Table on page {} (score {:.1}), period {}",
        style("ℹ").blue(),
        extraction.page,
        extraction.score,
        extraction.period
    );
    println!("   Header: {}", extraction.header.join(" | "));
    println!(
        "   {} records; skipped {} blank, {} footnote, {} repeated header rows",
        extraction.records.len(),
        skipped.blank_rows,
        skipped.footnote_rows,
        skipped.repeated_headers
    );
    println!(
        "   {} missing, {} malformed prices, {} invalid records",
        skipped.missing_prices, skipped.malformed_prices, skipped.invalid_records
    );
    println!("   Processing time: {}ms", extraction.processing_time_ms);
}

pub fn format_extraction(extraction: &Extraction, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(extraction)?),
        OutputFormat::Csv => format_csv(extraction),
        OutputFormat::Text => Ok(format_text(extraction)),
    }
}

fn format_csv(extraction: &Extraction) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    if extraction.records.is_empty() {
        wtr.write_record(["region", "item", "price", "unit", "period"])?;
    }
    for record in &extraction.records {
        wtr.serialize(CsvRow::from(record))?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(extraction: &Extraction) -> String {
    let region_width = extraction
        .records
        .iter()
        .map(|r| r.region().chars().count())
        .chain(std::iter::once("Region".len()))
        .max()
        .unwrap_or(0);
    let item_width = extraction
        .records
        .iter()
        .map(|r| r.item().chars().count())
        .chain(std::iter::once("Item".len()))
        .max()
        .unwrap_or(0);

    let mut output = String::new();
    output.push_str(&format!(
        "Household food basket, {} (page {})\n\n",
        extraction.period, extraction.page
    ));
    output.push_str(&format!(
        "{:<rw$}  {:<iw$}  {:>10}  {}\n",
        "Region",
        "Item",
        "Price",
        "Unit",
        rw = region_width,
        iw = item_width
    ));

    for record in &extraction.records {
        output.push_str(&format!(
            "{:<rw$}  {:<iw$}  {:>10}  {}\n",
            record.region(),
            record.item(),
            format!("R {:.2}", record.price()),
            record.unit().unwrap_or("-"),
            rw = region_width,
            iw = item_width
        ));
    }

    output
}
