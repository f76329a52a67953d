//! Follow-Ripple main entry point
//!
//! This is the command-line interface for the Follow-Ripple follower crawler.

use clap::Parser;
use follow_ripple::broker::{Broker, RetryPolicy, TokioSleeper};
use follow_ripple::config::{load_config_with_hash, Config};
use follow_ripple::storage::{DedupStore, SqliteStore};
use follow_ripple::{Driver, GithubClient, TraversalEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Follow-Ripple: a rate-aware follower graph crawler
///
/// Follow-Ripple walks the followers of every account you follow and follows
/// each account it has not handled before, recording every follow in a local
/// database. It runs until stopped.
#[derive(Parser, Debug)]
#[command(name = "follow-ripple")]
#[command(version)]
#[command(about = "A rate-aware follower graph crawler", long_about = None)]
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

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show dedup statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Stop after this many iterations instead of running forever
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,
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

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.iterations).await?;
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
            0 => EnvFilter::new("follow_ripple=info,warn"),
            1 => EnvFilter::new("follow_ripple=debug,info"),
            2 => EnvFilter::new("follow_ripple=trace,debug"),
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
    println!("=== Follow-Ripple Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  User agent: {}", config.api.user_agent);
    println!("  Request timeout: {}s", config.api.request_timeout);
    let token_state = match config.access_token() {
        Ok(_) => "set",
        Err(_) => "MISSING",
    };
    println!("  Token variable: {} ({})", config.api.token_env, token_state);

    println!("\nTraversal:");
    println!("  Workers: {}", config.traversal.worker_count());

    println!("\nRetry:");
    println!(
        "  Default Retry-After: {}s",
        config.retry.default_retry_after
    );
    println!("  Rate poll interval: {}s", config.retry.rate_poll_interval);
    println!("  Failure backoff: {}s", config.retry.failure_backoff);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows what the dedup store holds
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.storage.database_path);

    let store = SqliteStore::open(Path::new(&config.storage.database_path))?;

    println!("Followed accounts: {}", store.count()?);

    let recent = store.recent(10)?;
    if !recent.is_empty() {
        println!("\nMost recent:");
        for record in recent {
            println!("  {}  {}", record.followed_at, record.login);
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    iterations: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = config.access_token()?;
    let api = GithubClient::new(&config.api, &token)?;
    let store: Arc<dyn DedupStore> =
        Arc::new(SqliteStore::open(Path::new(&config.storage.database_path))?);

    let broker = Broker::new(api, RetryPolicy::from_config(&config.retry), TokioSleeper).spawn();
    let engine = TraversalEngine::start(
        broker.clone(),
        store,
        config.traversal.worker_count(),
    );
    tracing::info!("Startup complete: {} workers", engine.worker_count());

    let driver = Driver::new(broker, engine);
    match driver.run(iterations).await {
        Ok(()) => {
            tracing::info!("Crawl finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Fatal error: {}", e);
            Err(e.into())
        }
    }
}
