#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI for the ice-maker rink directory pipeline.
//!
//! One operation per invocation (`--source`, `--geocode-pending`,
//! `--promote`, `--sync-ice-time`, `--repair-failed`,
//! `--push-to-skatetrax`); `--export-csv` composes with any of them or
//! runs standalone.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use ice_maker_geocoder::clock::SystemClock;
use ice_maker_geocoder::nominatim::Geocoder;
use ice_maker_pipeline::{export, ice_time, promoter, push, runner};
use ice_maker_staging::{db, init_db, sources};
use switchy_database::Database;

#[derive(Parser)]
#[command(
    name = "ice_maker_pipeline",
    about = "Run the ice-maker rink directory pipeline",
    group(ArgGroup::new("mode").args([
        "source",
        "geocode_pending",
        "promote",
        "sync_ice_time",
        "repair_failed",
        "push_to_skatetrax",
    ]))
)]
struct Cli {
    /// Run the full pipeline for a source: sk8stuff, arena_guide,
    /// learntoskate, fandom_wiki, or "all"
    #[arg(long)]
    source: Option<String>,

    /// Geocode existing unverified candidates (no scraping)
    #[arg(long)]
    geocode_pending: bool,

    /// Promote verified candidates to the locations table
    #[arg(long)]
    promote: bool,

    /// Confirm rinks via the Skatetrax ice_time table (requires SKATETRAX_DB_URL)
    #[arg(long)]
    sync_ice_time: bool,

    /// Re-parse geocode_failed candidates with the fixed parser
    #[arg(long)]
    repair_failed: bool,

    /// Push active locations into the Skatetrax DB (requires SKATETRAX_DB_URL)
    #[arg(long)]
    push_to_skatetrax: bool,

    /// Export the locations table to CSV at the given path (can be
    /// combined with other operations)
    #[arg(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// Limit --geocode-pending to a specific source
    #[arg(long)]
    geocode_source: Option<String>,

    /// Preview changes without writing (for --push-to-skatetrax)
    #[arg(long)]
    dry_run: bool,

    /// Only scrape and fingerprint, skip parse/geocode
    #[arg(long)]
    scrape_only: bool,

    /// Skip the geocoding step
    #[arg(long)]
    no_geocode: bool,

    /// Max new entries to process (for testing)
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let has_mode = cli.source.is_some()
        || cli.geocode_pending
        || cli.promote
        || cli.sync_ice_time
        || cli.repair_failed
        || cli.push_to_skatetrax;

    if !has_mode && cli.export_csv.is_none() {
        eprintln!(
            "Provide a pipeline operation (--source, --geocode-pending, --promote, \
             --sync-ice-time, --repair-failed, --push-to-skatetrax) and/or --export-csv PATH"
        );
        std::process::exit(2);
    }

    let db = match db::connect_from_env().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    };
    init_db(db.as_ref()).await?;

    if has_mode {
        let pairs = run_mode(db.as_ref(), &cli).await?;

        println!("\n=== Pipeline Results ===");
        for (key, value) in &pairs {
            println!("  {key}: {value}");
        }
    }

    if let Some(path) = &cli.export_csv {
        let count = export::export_csv(db.as_ref(), path).await?;
        println!("\n=== Exported {count} locations to {} ===", path.display());
    }

    Ok(())
}

/// Dispatches the selected mode and returns its stats pairs.
async fn run_mode(
    db: &dyn Database,
    cli: &Cli,
) -> Result<Vec<(&'static str, String)>, Box<dyn std::error::Error>> {
    if cli.geocode_pending {
        let geocoder = Geocoder::new()?;
        let stats = runner::geocode_pending(db, &geocoder, cli.geocode_source.as_deref()).await?;
        return Ok(stats.pairs());
    }

    if cli.promote {
        return Ok(promoter::run_promotion(db).await?.pairs());
    }

    if cli.sync_ice_time {
        return Ok(ice_time::sync_ice_time(db).await?.pairs());
    }

    if cli.repair_failed {
        return Ok(runner::repair_geocode_failed(db).await?.pairs());
    }

    if cli.push_to_skatetrax {
        return Ok(push::push_locations(db, cli.dry_run).await?.pairs());
    }

    let source = cli.source.as_deref().unwrap_or_default();
    let geocoder = Geocoder::new()?;
    let options = runner::RunOptions {
        scrape_only: cli.scrape_only,
        geocode: !cli.no_geocode,
        limit: cli.limit,
    };

    if source == "all" {
        run_all(db, &geocoder, &options).await
    } else {
        Ok(runner::run_source(db, &geocoder, source, &options).await?.pairs())
    }
}

/// Runs every enabled source, then geocodes pending, then promotes.
async fn run_all(
    db: &dyn Database,
    geocoder: &Geocoder<SystemClock>,
    options: &runner::RunOptions,
) -> Result<Vec<(&'static str, String)>, Box<dyn std::error::Error>> {
    let enabled = sources::list_enabled_sources(db).await?;
    let source_names: Vec<String> = enabled
        .into_iter()
        .map(|s| s.name)
        .filter(|name| name != "skatetrax")
        .collect();

    let mut total_scraped = 0u64;
    let mut total_new = 0u64;
    let mut total_parsed = 0u64;

    for name in &source_names {
        log::info!("=== Running source: {name} ===");
        let stats = runner::run_source(db, geocoder, name, options).await?;
        total_scraped += stats.scraped;
        total_new += stats.new;
        total_parsed += stats.parsed;
    }

    log::info!("=== Geocoding remaining pending candidates ===");
    let geo_stats = runner::geocode_pending(db, geocoder, None).await?;

    log::info!("=== Promoting verified candidates ===");
    let promo_stats = promoter::run_promotion(db).await?;

    Ok(vec![
        ("sources_run", source_names.join(", ")),
        ("total_scraped", total_scraped.to_string()),
        ("total_new", total_new.to_string()),
        ("total_parsed", total_parsed.to_string()),
        ("geocode_match", geo_stats.geocode_match.to_string()),
        ("geocode_mismatch", geo_stats.geocode_mismatch.to_string()),
        ("geocode_failed", geo_stats.geocode_failed.to_string()),
        (
            "locations_new",
            promo_stats.phase1.promoted_new.to_string(),
        ),
        (
            "locations_linked",
            promo_stats.phase1.promoted_existing.to_string(),
        ),
        ("total_locations", promo_stats.total_locations.to_string()),
    ])
}
