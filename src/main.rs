//! Feed-Harvest main entry point
//!
//! This is the command-line interface for the Feed-Harvest profile crawler.

use anyhow::Context;
use clap::Parser;
use feed_harvest::config::{load_config_with_hash, validate_profile_name, Config};
use feed_harvest::crawler::{plan, run_crawl};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Feed-Harvest: a rate-limit tolerant profile crawler
///
/// Feed-Harvest fetches the newest posts of public profiles through a pool
/// of rotating sessions, deduplicates them and writes normalized records to
/// a JSON file. It can also serve stored posts over HTTP.
#[derive(Parser, Debug)]
#[command(name = "feed-harvest")]
#[command(version)]
#[command(about = "A rate-limit tolerant profile crawler", long_about = None)]
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

    /// Crawl these profiles instead of the configured ones (repeatable)
    #[arg(long = "profile", value_name = "NAME")]
    profiles: Vec<String>,

    /// Override the configured number of posts per profile
    #[arg(long, value_name = "N")]
    max_posts: Option<usize>,

    /// Validate config and show the crawl plan without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "serve"])]
    dry_run: bool,

    /// Show statistics of the existing output file and exit
    #[arg(long, conflicts_with_all = ["dry_run", "serve"])]
    stats: bool,

    /// Serve the HTTP API
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.serve {
        feed_harvest::api::serve(&config).await?;
    } else {
        handle_crawl(&config).await?;
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
            0 => EnvFilter::new("feed_harvest=info,warn"),
            1 => EnvFilter::new("feed_harvest=debug,info"),
            2 => EnvFilter::new("feed_harvest=trace,debug"),
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

/// Applies `--profile` and `--max-posts`
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if !cli.profiles.is_empty() {
        for profile in &cli.profiles {
            validate_profile_name(profile)?;
        }
        config.profiles = cli.profiles.clone();
    }

    if let Some(max_posts) = cli.max_posts {
        anyhow::ensure!(max_posts > 0, "--max-posts must be at least 1");
        config.crawler.max_posts_per_profile = max_posts;
    }

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Feed-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max posts per profile: {}",
        config.crawler.max_posts_per_profile
    );
    println!("  Chunks per profile: {}", config.crawler.chunks_per_profile);
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Max attempts per chunk: {}", config.crawler.max_attempts);

    println!("\nSource:");
    match (&config.source.base_url, &config.source.fixture_path) {
        (Some(url), _) => println!("  HTTP: {}", url),
        (None, Some(path)) => println!("  Fixture: {}", path),
        (None, None) => println!("  (none)"),
    }
    println!("  User agent: {}", config.source.user_agent);
    println!("  Sessions ({}):", config.source.sessions.len());
    for session in &config.source.sessions {
        let token = if session.token.is_some() { "token" } else { "anonymous" };
        println!("    - {} ({})", session.name, token);
    }

    println!("\nOutput:");
    println!("  File: {}", config.output.path);
    println!("  Batch size: {}", config.output.batch_size);

    println!("\nProfiles ({}):", config.profiles.len());
    let workers = config.crawler.worker_count.max(1);
    for (index, profile) in config.profiles.iter().enumerate() {
        println!("  - {} (worker {})", profile, index % workers);
        for chunk in plan(
            profile,
            config.crawler.max_posts_per_profile,
            config.crawler.chunks_per_profile,
        ) {
            println!("    * posts {}..{}", chunk.start_index, chunk.end_index);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would request up to {} posts",
        config.profiles.len() * config.crawler.max_posts_per_profile
    );
}

/// Handles the --stats mode: shows statistics of the output file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use feed_harvest::output::{load_statistics, print_statistics};
    use std::path::Path;

    println!("Output file: {}\n", config.output.path);

    let stats = load_statistics(Path::new(&config.output.path))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.profiles.is_empty(),
        "No profiles to crawl; set `profiles` in the config or pass --profile"
    );

    tracing::info!(
        "Profiles: {}, Sessions: {}",
        config.profiles.len(),
        config.source.sessions.len()
    );

    match run_crawl(config).await {
        Ok(report) => {
            println!(
                "✓ Wrote {} posts to {} ({} chunks exhausted)",
                report.records, config.output.path, report.chunks_exhausted
            );
            if !report.failed_profiles.is_empty() {
                println!("✗ Failed profiles: {}", report.failed_profiles.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
