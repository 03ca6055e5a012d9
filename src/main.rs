//! Shop-Harvest main entry point
//!
//! This is the command-line interface for the Shop-Harvest catalog harvester.

use anyhow::Context;
use clap::Parser;
use shop_harvest::config::{load_config_or_default, Config};
use shop_harvest::crawler::{read_links, run_harvest};
use shop_harvest::output::export_spreadsheet;
use shop_harvest::HarvestError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Shop-Harvest: a rendered-catalog harvester
///
/// Shop-Harvest loads every category link through a headless browser,
/// collects the products on each listing and their specification pages, and
/// writes the result as JSON plus a spreadsheet export.
#[derive(Parser, Debug)]
#[command(name = "shop-harvest")]
#[command(version)]
#[command(about = "A rendered-catalog harvester", long_about = None)]
struct Cli {
    /// Newline-delimited list of category URLs
    #[arg(value_name = "LINKS", default_value = "dns-links.txt")]
    links: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and links and show what would be harvested
    #[arg(long, conflicts_with = "export_only")]
    dry_run: bool,

    /// Rebuild the spreadsheet from the existing result file and exit
    #[arg(long, conflicts_with = "dry_run")]
    export_only: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            let code = e
                .downcast_ref::<HarvestError>()
                .map(HarvestError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config_or_default(Some(path.as_path()))
                .map_err(HarvestError::from)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => load_config_or_default(None).map_err(HarvestError::from)?,
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli.links)?;
    } else if cli.export_only {
        handle_export(&config)?;
    } else {
        handle_harvest(&config, &cli.links).await?;
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
            0 => EnvFilter::new("shop_harvest=info,warn"),
            1 => EnvFilter::new("shop_harvest=debug,info"),
            2 => EnvFilter::new("shop_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates inputs and shows what would be harvested
fn handle_dry_run(config: &Config, links_path: &Path) -> anyhow::Result<()> {
    let links = read_links(links_path)?;

    println!("=== Shop-Harvest Dry Run ===\n");

    println!("Fetching:");
    println!("  Max concurrent tasks: {}", config.crawler.max_concurrent_tasks);
    println!("  Max pages per category: {}", config.crawler.max_pages);
    println!("  Ready timeout: {:?}", config.crawler.ready_timeout());
    println!("  Settle delay: {:?}", config.crawler.settle_delay());

    println!("\nCache:");
    println!("  Backend: {:?}", config.cache.backend);
    println!("  TTL: {:?}", config.cache.ttl());

    println!("\nOutput:");
    println!("  Result: {}", config.output.result_path.display());
    println!("  Export: {}", config.output.export_path.display());

    println!("\nCategory links ({}):", links.len());
    for link in &links {
        println!("  - {}", link);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --export-only mode: rebuilds the spreadsheet
fn handle_export(config: &Config) -> anyhow::Result<()> {
    let rows = export_spreadsheet(&config.output.result_path, &config.output.export_path)?;
    println!(
        "✓ Exported {} rows to: {}",
        rows,
        config.output.export_path.display()
    );
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, links_path: &Path) -> anyhow::Result<()> {
    tracing::info!("Reading category links from: {}", links_path.display());

    let results = run_harvest(config, links_path).await?;
    let products: usize = results.iter().map(|r| r.products.len()).sum();
    tracing::info!(
        categories = results.len(),
        products,
        "Harvest completed successfully"
    );
    Ok(())
}
