//! Fetch command - download the latest report from the publisher.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use tracing::{debug, info, trace};
use url::Url;

use basket_core::{BasketConfig, BasketExtractor, Period};

use super::extract::{OutputFormat, format_extraction};
use super::store::RecordStore;

/// Household Affordability Index listing page.
pub const DEFAULT_INDEX_URL: &str = "https://pmbejd.org.za/index.php/household-affordability-index";

const USER_AGENT: &str = concat!("basket-cli/", env!("CARGO_PKG_VERSION"));

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Page listing the published reports
    #[arg(long, default_value = DEFAULT_INDEX_URL)]
    index_url: String,

    /// Directory for downloaded reports
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Download even when the report is already cached
    #[arg(long)]
    force: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// Extract records from the downloaded report
    #[arg(long)]
    extract: bool,

    /// Reporting period for --extract; read from the report when omitted
    #[arg(short, long)]
    period: Option<Period>,

    /// Output format for --extract
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Upsert extracted records into a CSV store
    #[arg(long)]
    store: Option<PathBuf>,
}

pub async fn run(args: FetchArgs, config: BasketConfig) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    let index_url = Url::parse(&args.index_url)?;
    info!("Reading report index {}", index_url);

    let body = client
        .get(index_url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let pdf_url = latest_pdf_url(&body, &index_url)
        .ok_or_else(|| anyhow::anyhow!("No PDF link found on {}", index_url))?;
    println!("{} Latest report: {}", style("ℹ").blue(), pdf_url);

    let cache_dir = args.cache_dir.clone().unwrap_or_else(default_cache_dir);
    fs::create_dir_all(&cache_dir)?;
    let path = cache_dir.join(report_file_name(&pdf_url));

    let data = if path.exists() && !args.force {
        println!(
            "  {} {} (already cached)",
            style("✓").green(),
            path.display()
        );
        fs::read(&path)?
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} {msg:<30} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message(report_file_name(&pdf_url));

        match download_pdf(&client, &pdf_url, &path, &pb).await {
            Ok(data) => {
                pb.finish_with_message(format!("{} {}", style("✓").green(), path.display()));
                data
            }
            Err(e) => {
                pb.abandon_with_message(format!("{} download failed", style("✗").red()));
                return Err(e);
            }
        }
    };

    println!("  Checksum (SHA-256): {}", sha256_hex(&data));

    if args.extract || args.store.is_some() {
        let extractor = BasketExtractor::new(config)?;
        let extraction = extractor.extract(&data, args.period)?;

        if args.extract {
            println!();
            println!("{}", format_extraction(&extraction, args.format)?);
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
    }

    Ok(())
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("basket")
        .join("reports")
}

/// First link on the page whose path ends in `.pdf`, resolved against `base`.
pub fn latest_pdf_url(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("a[href]").ok()?;

    doc.select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .inspect(|url| trace!(url = %url, "Found link"))
        .find(|url| url.path().to_lowercase().ends_with(".pdf"))
}

/// File name for a cached report: the last path segment, made filesystem safe.
pub fn report_file_name(url: &Url) -> String {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("report.pdf");

    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Stream a report to `path` through a temporary file, returning its bytes.
async fn download_pdf(
    client: &reqwest::Client,
    url: &Url,
    path: &Path,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<u8>> {
    let response = client.get(url.clone()).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if !content_type.contains("pdf") {
        anyhow::bail!("Downloaded file is not a PDF (content type {:?})", content_type);
    }

    if let Some(content_length) = response.content_length() {
        pb.set_length(content_length);
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    let mut data = Vec::new();

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        data.extend_from_slice(&chunk);
        pb.set_position(data.len() as u64);
    }

    file.flush()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    debug!("Downloaded {} bytes to {}", data.len(), path.display());

    Ok(data)
}
