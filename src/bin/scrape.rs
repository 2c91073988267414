//! One scrape run: walk a board for every keyword × location pair, then
//! write the collected listings to Postgres or a JSON file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use jobboard_scraper::{
    config::{get_config, init_config},
    database::pool::connect_and_migrate,
    services::{
        boards::BoardKind,
        export_service::ExportService,
        fetcher::{HttpFetcher, RetryPolicy},
        file_store::JsonFileStore,
        listing_service::ListingService,
        listing_store::ListingStore,
        orchestrator::{ScrapeContext, ScrapeOptions},
        sink::{persist, SinkPolicy},
    },
    utils::logging::init_tracing,
};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sink {
    /// Bulk insert into the `listings` table.
    Db,
    /// Overwrite a JSON file; with `--skip-existing`, append to it.
    File,
}

#[derive(Parser)]
#[command(name = "scrape")]
#[command(about = "Scrape job listings from Jora or Seek")]
struct Cli {
    #[arg(long, value_enum, default_value_t = BoardKind::Jora)]
    board: BoardKind,

    /// Search keyword; repeat for several.
    #[arg(short, long = "keyword", required = true)]
    keywords: Vec<String>,

    /// Search location; repeat for several. Omit to search everywhere.
    #[arg(short, long = "location")]
    locations: Vec<String>,

    #[arg(long, value_enum, default_value_t = Sink::File)]
    sink: Sink,

    /// JSON file written by the file sink.
    #[arg(short, long, default_value = "jobs.json")]
    output: PathBuf,

    /// Also write the batch as a spreadsheet.
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Skip listings whose id is already stored.
    #[arg(long)]
    skip_existing: bool,

    /// Only save listings with every field filled in.
    #[arg(long)]
    complete_only: bool,

    /// Only keep listings whose description contains an email address.
    #[arg(long)]
    email_only: bool,

    /// Visit the board's home page first to pick up session cookies.
    #[arg(long)]
    warm_up: bool,

    #[arg(long)]
    max_pages: Option<u32>,

    #[arg(long)]
    workers: Option<usize>,

    /// Keep apply links as found instead of following their redirects.
    #[arg(long)]
    no_resolve_apply: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    init_config()?;
    let config = get_config();

    let mut settings = config.scrape.clone();
    if let Some(max_pages) = cli.max_pages {
        settings.max_pages = max_pages;
    }
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    if cli.no_resolve_apply {
        settings.resolve_apply_urls = false;
    }
    settings.check()?;

    let store: Arc<dyn ListingStore> = match cli.sink {
        Sink::Db => {
            let pool = connect_and_migrate(config.require_database_url()?)
                .await
                .context("Failed to prepare database")?;
            Arc::new(ListingService::new(pool))
        }
        Sink::File if cli.skip_existing => Arc::new(JsonFileStore::appending(&cli.output)),
        Sink::File => Arc::new(JsonFileStore::new(&cli.output)),
    };

    let retry = RetryPolicy::new(
        settings.retry_max_attempts,
        Duration::from_millis(settings.retry_backoff_ms),
    );
    let fetcher = HttpFetcher::new(settings.timeout(), retry)?;
    let board = cli.board.build()?;
    if cli.warm_up {
        fetcher.warm_up(board.base_url().as_str()).await;
    }

    let options = ScrapeOptions {
        require_email: cli.email_only,
        ..ScrapeOptions::from(&settings)
    };
    let mut ctx = ScrapeContext::new(Arc::new(fetcher), options);
    if cli.skip_existing {
        match store.existing_ids().await {
            Ok(ids) => {
                info!(known = ids.len(), "Loaded stored listing ids");
                ctx = ctx.with_known_ids(ids);
            }
            Err(err) => warn!(error = %err, "Could not load stored listing ids"),
        }
    }

    let started = Instant::now();
    let scraped = ctx
        .scrape_all(board, &cli.keywords, &cli.locations)
        .await;
    let listings = ctx.into_listings();
    info!(
        scraped,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Scraping finished"
    );

    if let Some(path) = &cli.xlsx {
        let bytes = ExportService::generate_listings_xlsx(&listings)?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Spreadsheet written");
    }

    let policy = SinkPolicy {
        skip_existing: cli.skip_existing,
        complete_only: cli.complete_only,
    };
    if let Err(err) = persist(store.as_ref(), listings, policy).await {
        error!(error = %err, "Failed to save listings");
        return Err(err.into());
    }

    Ok(())
}
