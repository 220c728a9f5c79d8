use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use vessel_scraper::common::constants::{
    DEFAULT_CLEAN_FILE, DEFAULT_DETAILS_FILE, DEFAULT_LISTING_FILE,
};
use vessel_scraper::config::Config;
use vessel_scraper::infra::{cached_http_fetcher, page_cache};
use vessel_scraper::observability::init_logging;
use vessel_scraper::pipeline::processing::normalize::summarize;
use vessel_scraper::pipeline::storage::tabular;
use vessel_scraper::pipeline::{CleanJob, CrawlJob, EnrichJob, Pipeline, PipelineReport, RunJob};

#[derive(Parser)]
#[command(name = "vessel_scraper")]
#[command(about = "Vessel listing crawler, detail enricher and cleaner")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to vessel_scraper.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct CrawlArgs {
    /// Entity type to list, e.g. "Tanker" or "Cargo ships"
    #[arg(long)]
    entity_type: Option<String>,
    /// Stop after this many listing pages
    #[arg(long)]
    page_cap: Option<u32>,
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args, Clone)]
struct DetailArgs {
    /// Keep only the first N+1 input records
    #[arg(long)]
    head: Option<usize>,
    /// Concurrent detail fetches
    #[arg(long)]
    pool_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the paginated listing into a CSV file
    Crawl {
        #[command(flatten)]
        crawl: CrawlArgs,
        #[arg(default_value = DEFAULT_LISTING_FILE)]
        output: String,
    },
    /// Enrich listing rows with their detail pages
    Details {
        #[arg(long, default_value = ".")]
        input_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_LISTING_FILE)]
        input_file: String,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        #[command(flatten)]
        details: DetailArgs,
        #[arg(default_value = DEFAULT_DETAILS_FILE)]
        output: String,
    },
    /// Normalize enriched rows into the clean table
    Clean {
        #[arg(long, default_value = ".")]
        input_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_DETAILS_FILE)]
        input_file: String,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(default_value = DEFAULT_CLEAN_FILE)]
        output: String,
    },
    /// Print per-segment statistics of a clean table
    Summary {
        #[arg(long, default_value = ".")]
        input_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_CLEAN_FILE)]
        input_file: String,
    },
    /// Crawl, enrich and clean in one process
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        details: DetailArgs,
    },
    /// Delete the page caches under the output directory
    CacheClear {
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

impl Commands {
    fn entry_point(&self) -> &'static str {
        match self {
            Commands::Crawl { .. } => "download-vessels",
            Commands::Details { .. } => "download-vessels-details",
            Commands::Clean { .. } => "clean-vessels-data",
            Commands::Summary { .. } => "summary",
            Commands::Run { .. } => "vessel-pipeline",
            Commands::CacheClear { .. } => "cache-clear",
        }
    }
}

fn print_report(report: &PipelineReport) {
    println!("\n📊 {} finished in {:.1}s", report.stage, report.duration_secs());
    if let Some(n) = report.listing_rows {
        println!("   Listing rows: {}", n);
    }
    if let Some(n) = report.enriched_rows {
        println!("   Enriched rows: {}", n);
    }
    if let Some(n) = report.normalized_rows {
        println!("   Clean rows: {}", n);
    }
    for path in &report.outputs {
        println!("   Output file: {}", path.display());
    }
}

fn fetcher_for(
    config: &Config,
    output_dir: &Path,
    cache_dir: &str,
) -> anyhow::Result<vessel_scraper::infra::CachedFetcher<vessel_scraper::infra::HttpFetcher>> {
    let root = output_dir.join(cache_dir);
    cached_http_fetcher(&config.fetch, &root)
        .with_context(|| format!("failed to build fetcher for {}", root.display()))
}

fn entity_type(args: &CrawlArgs, config: &Config) -> String {
    args.entity_type
        .clone()
        .unwrap_or_else(|| config.site.entity_type.clone())
}

async fn execute(command: Commands, config: Config) -> anyhow::Result<()> {
    let listing_cache = config.fetch.listing_cache_dir.clone();
    let details_cache = config.fetch.details_cache_dir.clone();

    match command {
        Commands::Crawl { crawl, output } => {
            println!("🔄 Crawling listing...");
            let fetcher = fetcher_for(&config, &crawl.output_dir, &listing_cache)?;
            let job = CrawlJob {
                entity_type: entity_type(&crawl, &config),
                page_cap: crawl.page_cap,
                output: crawl.output_dir.join(output),
            };
            let report = Pipeline::new(config).crawl_to_file(fetcher, &job).await?;
            print_report(&report);
        }
        Commands::Details {
            input_dir,
            input_file,
            output_dir,
            details,
            output,
        } => {
            println!("🔄 Downloading vessel details...");
            let fetcher = fetcher_for(&config, &output_dir, &details_cache)?;
            let job = EnrichJob {
                input: input_dir.join(input_file),
                head: details.head,
                pool_size: details.pool_size,
                output: output_dir.join(output),
            };
            let report = Pipeline::new(config).enrich_file(fetcher, &job).await?;
            print_report(&report);
        }
        Commands::Clean {
            input_dir,
            input_file,
            output_dir,
            output,
        } => {
            println!("🔨 Cleaning vessel data...");
            let job = CleanJob {
                input: input_dir.join(input_file),
                output: output_dir.join(output),
            };
            let report = Pipeline::new(config).clean_file(&job)?;
            print_report(&report);
        }
        Commands::Summary {
            input_dir,
            input_file,
        } => {
            let path = input_dir.join(input_file);
            let table = tabular::read_table(&path, &config.normalize.schema)
                .with_context(|| format!("failed to read {}", path.display()))?;
            info!(rows = table.len(), "loaded clean table");
            for summary in summarize(&table, &config.normalize.segments) {
                println!("{}", summary);
            }
        }
        Commands::Run { crawl, details } => {
            println!("🚀 Running full pipeline (crawl + details + clean)...");
            let listing_fetcher = fetcher_for(&config, &crawl.output_dir, &listing_cache)?;
            let detail_fetcher = fetcher_for(&config, &crawl.output_dir, &details_cache)?;
            let job = RunJob {
                crawl: CrawlJob {
                    entity_type: entity_type(&crawl, &config),
                    page_cap: crawl.page_cap,
                    output: crawl.output_dir.join(DEFAULT_LISTING_FILE),
                },
                head: details.head,
                pool_size: details.pool_size,
                details_output: crawl.output_dir.join(DEFAULT_DETAILS_FILE),
                clean_output: crawl.output_dir.join(DEFAULT_CLEAN_FILE),
            };
            let report = Pipeline::new(config)
                .run(listing_fetcher, detail_fetcher, &job)
                .await?;
            print_report(&report);
        }
        Commands::CacheClear { output_dir } => {
            for dir in [&listing_cache, &details_cache] {
                let root = output_dir.join(dir);
                page_cache::clear_dir(&root)
                    .await
                    .with_context(|| format!("failed to clear {}", root.display()))?;
                println!("🧹 Cleared {}", root.display());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_config = config.logging.clone().for_entry_point(cli.command.entry_point());
    let _guard = init_logging(&log_config);

    match execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "uncaught error");
            println!("❌ Failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
