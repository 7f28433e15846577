//! Tables command - list candidate tables with their classification scores.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;

use basket_core::{BasketConfig, BasketExtractor, RawTable, TableScore};

/// Arguments for the tables command.
#[derive(Args)]
pub struct TablesArgs {
    /// Input PDF report
    #[arg(required = true)]
    input: PathBuf,

    /// Number of rows to preview per table
    #[arg(short, long, default_value = "3")]
    rows: usize,

    /// Only show tables that could be selected
    #[arg(long)]
    eligible: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Candidate<'a> {
    score: &'a TableScore,
    context: &'a str,
    rows: &'a [Vec<String>],
}

pub async fn run(args: TablesArgs, config: BasketConfig) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let data = fs::read(&args.input)?;
    let extractor = BasketExtractor::new(config)?;
    let candidates: Vec<(RawTable, TableScore)> = extractor
        .inspect(&data)?
        .into_iter()
        .filter(|(_, score)| !args.eligible || score.eligible)
        .collect();

    if args.json {
        let out: Vec<Candidate> = candidates
            .iter()
            .map(|(table, score)| Candidate {
                score,
                context: &table.context,
                rows: table.rows(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!("{} No tables detected", style("ℹ").blue());
        return Ok(());
    }

    for (table, score) in &candidates {
        print_candidate(table, score, args.rows);
    }

    let eligible = candidates.iter().filter(|(_, s)| s.eligible).count();
    println!(
        "{} {} tables, {} eligible",
        style("ℹ").blue(),
        candidates.len(),
        eligible
    );

    Ok(())
}

fn print_candidate(table: &RawTable, score: &TableScore, preview_rows: usize) {
    let marker = if score.eligible {
        style("✓").green()
    } else {
        style("✗").red()
    };

    println!(
        "{} Table #{} on page {} ({} rows x {} columns)",
        marker,
        score.ordinal,
        score.page,
        table.num_rows(),
        table.num_cols()
    );
    println!(
        "   score {:.1}: {}/{} keywords, {} data rows{}",
        score.score,
        score.keywords_matched,
        score.keywords_required,
        score.data_rows,
        if score.title_matched { ", title matched" } else { "" }
    );

    match score.header_row {
        Some(header_row) => {
            let header = table.row(header_row).unwrap_or(&[]);
            println!("   header (row {}): {}", header_row, header.join(" | "));
        }
        None => println!("   header: {}", style("none").yellow()),
    }

    for row in table.rows().iter().take(preview_rows) {
        println!("   {}", style(row.join(" | ")).dim());
    }
    println!();
}
