use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use venue_resolver::constants;
use venue_resolver::logging;
use venue_resolver::metrics;
use venue_resolver::resolver::{normalize, SignalBreakdown};
use venue_resolver::{InMemoryVenueStore, ResolverConfig, VenueResolver, VenueStore};

#[derive(Parser)]
#[command(name = "venue-resolver")]
#[command(about = "Resolve missing venue slugs to a redirect, suggestions, or not-found")]
#[command(version = "0.1.0")]
struct Cli {
    /// Resolver config (TOML); defaults apply when absent
    #[arg(long, global = true, default_value = constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more missing slugs against a venue snapshot
    Resolve {
        /// Missing slugs to resolve
        #[arg(required = true)]
        slugs: Vec<String>,
        /// JSON file holding an array of venue records
        #[arg(long, required_unless_present = "database")]
        venues: Option<PathBuf>,
        /// Local libSQL database with the venues schema
        #[arg(long)]
        database: Option<String>,
    },
    /// Print the normalized form of a slug
    Normalize {
        slug: String,
    },
    /// Print the confidence of a candidate slug against a missing slug
    Score {
        candidate: String,
        slug: String,
    },
}

async fn open_store(venues: Option<PathBuf>, database: Option<String>) -> anyhow::Result<Arc<dyn VenueStore>> {
    if let Some(path) = database {
        return open_database(&path).await;
    }
    let path = venues.context("either --venues or --database is required")?;
    let store = InMemoryVenueStore::from_json_file(&path)
        .with_context(|| format!("failed to load venues from {}", path.display()))?;
    Ok(Arc::new(store))
}

#[cfg(feature = "db")]
async fn open_database(path: &str) -> anyhow::Result<Arc<dyn VenueStore>> {
    let store = venue_resolver::storage::LibsqlVenueStore::open_local(path).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "db"))]
async fn open_database(_path: &str) -> anyhow::Result<Arc<dyn VenueStore>> {
    anyhow::bail!("--database requires building with the `db` feature")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ResolverConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    logging::init_logging(&config);
    metrics::init_from_env();

    match cli.command {
        Commands::Resolve { slugs, venues, database } => {
            let store = open_store(venues, database).await?;
            let resolver = VenueResolver::with_ttl_cache(store, config);

            for slug in &slugs {
                let result = resolver.resolve(slug).await;
                let line = json!({ "slug": slug, "result": result });
                println!("{}", serde_json::to_string(&line)?);
            }
            info!("Resolved {} slugs", slugs.len());
        }
        Commands::Normalize { slug } => {
            println!("{}", normalize(&slug));
        }
        Commands::Score { candidate, slug } => {
            let normalized = normalize(&slug);
            let signals = SignalBreakdown::compute(&candidate, &normalized, &slug);
            let report = json!({
                "candidate": candidate,
                "normalized": normalized,
                "signals": signals,
                "fuzzy": signals.fuzzy(),
                "bonus": signals.bonus(),
                "confidence": signals.confidence(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
