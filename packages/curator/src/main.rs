#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI for curating the ice-maker locations directory.

use clap::{Parser, Subcommand};
use ice_maker_curator::{
    LocationRef, demote_location, merge_locations, rename_location, search_locations,
};
use ice_maker_staging::{db, init_db};
use ice_maker_staging_models::LocationStatus;

#[derive(Parser)]
#[command(name = "ice_maker_curator", about = "Curate the ice-maker locations directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search locations by partial name
    Search {
        /// Case-insensitive name fragment
        query: String,
        /// Exact 2-letter state filter
        #[arg(long)]
        state: Option<String>,
    },
    /// Change a location's status
    Demote {
        /// Target by exact rink id
        #[arg(long)]
        id: Option<String>,
        /// Target by (unique) name
        #[arg(long)]
        name: Option<String>,
        /// New status: active, closed_permanently, seasonal, merged, disabled
        #[arg(long, default_value = "disabled")]
        status: LocationStatus,
    },
    /// Rename a location, keeping the old name as an alias
    Rename {
        /// Target by exact rink id
        #[arg(long)]
        id: Option<String>,
        /// Target by (unique) name
        #[arg(long)]
        name: Option<String>,
        /// The new display name
        #[arg(long)]
        new_name: String,
    },
    /// Merge one location into another
    Merge {
        /// Rink id being retired
        #[arg(long)]
        from: String,
        /// Rink id that survives
        #[arg(long)]
        into: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let db = match db::connect_from_env().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    };
    init_db(db.as_ref()).await?;

    match cli.command {
        Commands::Search { query, state } => {
            let results = search_locations(db.as_ref(), &query, state.as_deref()).await?;

            for (location, source_count) in &results {
                println!(
                    "  {:45} | {:20} | {} | {:10} | sources={source_count} | id={}",
                    location.rink_name,
                    location.rink_city,
                    location.rink_state,
                    location.rink_status.as_ref(),
                    location.rink_id,
                );
            }
            println!("\n  {} location(s) found", results.len());
        }
        Commands::Demote { id, name, status } => {
            let target = LocationRef::from_args(id, name)?;
            let result = demote_location(db.as_ref(), &target, status).await?;
            println!(
                "Demoted '{}' ({}, {}): {} -> {}",
                result.rink_name, result.city, result.state, result.old_status, result.new_status,
            );
        }
        Commands::Rename { id, name, new_name } => {
            let target = LocationRef::from_args(id, name)?;
            let result = rename_location(db.as_ref(), &target, &new_name).await?;
            println!(
                "Renamed '{}' -> '{}' (alias {})",
                result.old_name,
                result.new_name,
                if result.alias_created { "created" } else { "not needed" },
            );
        }
        Commands::Merge { from, into } => {
            let stats = merge_locations(db.as_ref(), &from, &into).await?;
            println!(
                "Merged {from} into {into}: {} sources moved, {} updated, {} candidates \
                 repointed, alias_created={}",
                stats.sources_moved,
                stats.sources_updated,
                stats.candidates_repointed,
                stats.alias_created,
            );
        }
    }

    Ok(())
}
