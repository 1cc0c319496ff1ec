//! Marquee main entry point
//!
//! This is the command-line interface for the Marquee catalog crawler.

use clap::Parser;
use marquee::config::{load_config_with_hash, Config};
use marquee::crawler::build_coordinator;
use marquee::output::{load_statistics, print_statistics, render_search_response};
use marquee::query::search_catalog;
use marquee::state::CrawlCursor;
use marquee::storage::{open_storage, CatalogStore};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Marquee: an incremental title-catalog crawler
///
/// Marquee walks a ranked title index one position per paced cycle,
/// normalizes each title into a catalog record and stores it. The stored
/// catalog can be searched with flat key/value filters.
#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(version = "1.0.0")]
#[command(about = "An incremental title-catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Reset the crawl cursor to the first film position before crawling
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "search"])]
    fresh: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with_all = ["stats", "search"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "search"])]
    stats: bool,

    /// Run one catalog search, print the JSON response and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    search: bool,

    /// Search parameter as KEY=VALUE (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param, requires = "search")]
    params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.search {
        handle_search(&config, &cli.params)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("marquee=info,warn"),
            1 => EnvFilter::new("marquee=debug,info"),
            2 => EnvFilter::new("marquee=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Marquee Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Pacing interval: {}s", config.crawler.pacing_interval);
    println!("  Backoff interval: {}s", config.crawler.backoff_interval);
    println!("  Cold start delay: {}s", config.crawler.cold_start_delay);
    println!("  Position ceiling: {}", config.crawler.position_ceiling);
    println!(
        "  Seed backoff: film {}, game {}",
        config.crawler.film_seed_backoff, config.crawler.game_seed_backoff
    );

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Minimum user rating: {}", config.source.min_user_rating);
    println!(
        "  Minimum votes: film {}, game {}",
        config.source.film_min_votes, config.source.game_min_votes
    );
    println!("  Request timeout: {}s", config.source.request_timeout);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --search mode: runs one search and prints the response
fn handle_search(
    config: &Config,
    params: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let response = search_catalog(&storage, params.iter().map(|(k, v)| (k, v)))?;
    println!("{}", render_search_response(&response)?);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(Path::new(&config.storage.database_path))?;
    tracing::info!("Database connected: {}", config.storage.database_path);

    if fresh {
        let cursor = CrawlCursor::initial();
        storage.write_cursor(&cursor)?;
        tracing::info!("Crawl cursor reset to {}", cursor);
    } else {
        match storage.read_cursor()? {
            Some(cursor) => tracing::info!("Resuming crawl at {}", cursor),
            None => tracing::warn!("No crawl cursor stored; run with --fresh to start crawling"),
        }
    }

    let store = Arc::new(Mutex::new(storage));
    let coordinator = build_coordinator(&config, Arc::clone(&store))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let crawl = tokio::spawn(async move { coordinator.run(shutdown_rx).await });

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Interrupt received, shutting down"),
        Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
    }
    if shutdown_tx.send(true).is_err() {
        tracing::debug!("Crawl task already stopped before shutdown was signalled");
    }

    match crawl.await {
        Ok(summary) => tracing::info!(
            "Crawl stopped after {} cycles ({} records stored)",
            summary.cycles,
            summary.records_stored
        ),
        Err(e) => tracing::error!("Crawl task failed: {}", e),
    }

    // The crawl task has finished, so this is the last handle to the connection
    drop(store);
    tracing::info!("Database disconnected");

    Ok(())
}
