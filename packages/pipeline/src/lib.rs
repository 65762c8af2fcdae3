#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The ingestion-to-promotion pipeline.
//!
//! Per-source runs fetch, fingerprint, parse, dedup, and verify entries
//! into the staging store ([`runner`]); the [`promoter`] then lifts
//! verified candidates into the locations directory in three phases,
//! adopting peer identifiers where the Skatetrax directory already knows
//! a rink. Peer synchronization ([`ice_time`], [`push`]) and CSV export
//! round out the command surface.
//!
//! Everything is deliberately batch-sequential: one source at a time,
//! one entry at a time. Upstream sites require politeness and the
//! geocoder enforces a process-wide rate limit, so there is nothing to
//! win by going concurrent — and dedup correctness depends on earlier
//! candidates being visible to later ones within a run.

pub mod export;
pub mod ice_time;
pub mod promoter;
pub mod push;
pub mod runner;
pub mod skatetrax;

use thiserror::Error;

/// Errors from pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Staging store failure.
    #[error("Database error: {0}")]
    Db(#[from] ice_maker_staging::DbError),

    /// Source fetch failure.
    #[error("Source error: {0}")]
    Source(#[from] ice_maker_source::SourceError),

    /// Geocoder client construction failure.
    #[error("Geocoder error: {0}")]
    Geocode(#[from] ice_maker_geocoder::GeocodeError),

    /// CSV export failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
