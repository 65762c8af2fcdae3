#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Manual curation of the locations directory.
//!
//! Demote, rename, merge, and search — the operations a human reaches
//! for when the pipeline gets something wrong or the real world changes.
//! Renames and merges preserve the outgoing name as an alias so old
//! references keep resolving; merges also repair every dependent row
//! before retiring the source location.

use chrono::{DateTime, Utc};
use ice_maker_staging::{aliases, candidates, location_sources, locations};
use ice_maker_staging_models::{LocationRow, LocationStatus};
use switchy_database::Database;
use thiserror::Error;

/// Errors from curation operations.
#[derive(Debug, Error)]
pub enum CuratorError {
    /// Staging store failure.
    #[error("Database error: {0}")]
    Db(#[from] ice_maker_staging::DbError),

    /// No location matched the target specification.
    #[error("No location found matching {target}")]
    NotFound {
        /// What was searched for.
        target: String,
    },

    /// A partial name matched more than one location.
    #[error("Ambiguous name '{name}' matched {} locations:\n{}", matches.len(), describe(matches))]
    Ambiguous {
        /// The ambiguous query.
        name: String,
        /// Every location it matched.
        matches: Vec<LocationRow>,
    },

    /// A target specification with neither id nor name.
    #[error("Must provide --id or --name")]
    MissingTarget,

    /// Merging a location into itself.
    #[error("Cannot merge a location into itself")]
    SelfMerge,
}

fn describe(matches: &[LocationRow]) -> String {
    matches
        .iter()
        .map(|loc| {
            format!(
                "  {} | {}, {} | id={}",
                loc.rink_name, loc.rink_city, loc.rink_state, loc.rink_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// How a curation command identifies its target location.
#[derive(Debug, Clone)]
pub enum LocationRef {
    /// Exact identifier.
    Id(String),
    /// Name: exact (case-insensitive) first, then unique partial.
    Name(String),
}

impl LocationRef {
    /// Builds a reference from optional CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CuratorError::MissingTarget`] when both are absent.
    pub fn from_args(id: Option<String>, name: Option<String>) -> Result<Self, CuratorError> {
        id.map(Self::Id)
            .or(name.map(Self::Name))
            .ok_or(CuratorError::MissingTarget)
    }
}

/// Resolves a target specification to a single location.
///
/// # Errors
///
/// Returns [`CuratorError::NotFound`] when nothing matches and
/// [`CuratorError::Ambiguous`] when a partial name matches several
/// locations.
pub async fn find_location(
    db: &dyn Database,
    target: &LocationRef,
) -> Result<LocationRow, CuratorError> {
    match target {
        LocationRef::Id(rink_id) => locations::get_location(db, rink_id)
            .await?
            .ok_or_else(|| CuratorError::NotFound {
                target: format!("rink_id={rink_id}"),
            }),
        LocationRef::Name(name) => {
            if let Some(exact) = locations::find_by_name_exact(db, name).await? {
                return Ok(exact);
            }

            let mut partial = locations::search_by_name(db, name, None).await?;
            match partial.len() {
                0 => Err(CuratorError::NotFound {
                    target: format!("name '{name}'"),
                }),
                1 => Ok(partial.remove(0)),
                _ => Err(CuratorError::Ambiguous {
                    name: name.clone(),
                    matches: partial,
                }),
            }
        }
    }
}

/// Outcome of a demote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoteResult {
    /// The demoted location's identifier.
    pub rink_id: String,
    /// Its name.
    pub rink_name: String,
    /// Its city.
    pub city: String,
    /// Its state.
    pub state: String,
    /// Status before the change.
    pub old_status: LocationStatus,
    /// Status after the change.
    pub new_status: LocationStatus,
}

/// Changes a location's lifecycle status.
///
/// # Errors
///
/// Returns [`CuratorError`] when the target can't be resolved or the
/// update fails.
pub async fn demote_location(
    db: &dyn Database,
    target: &LocationRef,
    status: LocationStatus,
) -> Result<DemoteResult, CuratorError> {
    let location = find_location(db, target).await?;

    let old_status = location.rink_status;
    locations::update_status(db, &location.rink_id, status).await?;

    log::info!(
        "Demoted '{}' ({}, {}): {old_status} -> {status}",
        location.rink_name,
        location.rink_city,
        location.rink_state,
    );

    Ok(DemoteResult {
        rink_id: location.rink_id,
        rink_name: location.rink_name,
        city: location.rink_city,
        state: location.rink_state,
        old_status,
        new_status: status,
    })
}

/// Outcome of a rename operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameResult {
    /// The renamed location's identifier.
    pub rink_id: String,
    /// Name before the change.
    pub old_name: String,
    /// Name after the change.
    pub new_name: String,
    /// Whether an alias row was written for the old name.
    pub alias_created: bool,
}

/// Renames a location, saving the old name as an alias so searches for
/// it still resolve here.
///
/// # Errors
///
/// Returns [`CuratorError`] when the target can't be resolved or the
/// writes fail.
pub async fn rename_location(
    db: &dyn Database,
    target: &LocationRef,
    new_name: &str,
) -> Result<RenameResult, CuratorError> {
    let location = find_location(db, target).await?;
    let old_name = location.rink_name.clone();
    let alias_created = old_name != new_name;

    if alias_created {
        aliases::insert_alias(
            db,
            &location.rink_id,
            &old_name,
            Some(Utc::now()),
            Some(&format!("Renamed to {new_name}")),
        )
        .await?;
    }

    locations::update_name(db, &location.rink_id, new_name).await?;

    log::info!(
        "Renamed '{old_name}' -> '{new_name}' ({}, {})",
        location.rink_city,
        location.rink_state,
    );

    Ok(RenameResult {
        rink_id: location.rink_id,
        old_name,
        new_name: new_name.to_string(),
        alias_created,
    })
}

/// Counters for a merge operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Source links re-pointed at the target.
    pub sources_moved: u64,
    /// Target links widened to cover the source link's window.
    pub sources_updated: u64,
    /// Candidates re-pointed at the target.
    pub candidates_repointed: u64,
    /// Whether the source's name became an alias on the target.
    pub alias_created: bool,
}

/// The conservative union of two observation windows: earliest non-null
/// first-seen, latest non-null last-seen. A null on either side never
/// shrinks the window.
#[must_use]
pub fn widen_window(
    target_first: Option<DateTime<Utc>>,
    target_last: Option<DateTime<Utc>>,
    other_first: Option<DateTime<Utc>>,
    other_last: Option<DateTime<Utc>>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let first = match (target_first, other_first) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (first, None) | (None, first) => first,
    };
    let last = match (target_last, other_last) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (last, None) | (None, last) => last,
    };
    (first, last)
}

/// Merges one location into another.
///
/// Source links move to the target (widening any the target already
/// holds), candidates re-point, the source's name becomes an alias when
/// it differs, and the source is left with `merged` status.
///
/// # Errors
///
/// Returns [`CuratorError::SelfMerge`] for `from == into`,
/// [`CuratorError::NotFound`] when either side is missing, and
/// [`CuratorError::Db`] when a write fails.
pub async fn merge_locations(
    db: &dyn Database,
    from_id: &str,
    into_id: &str,
) -> Result<MergeStats, CuratorError> {
    if from_id == into_id {
        return Err(CuratorError::SelfMerge);
    }

    let source_loc =
        locations::get_location(db, from_id)
            .await?
            .ok_or_else(|| CuratorError::NotFound {
                target: format!("source location {from_id}"),
            })?;
    let target_loc =
        locations::get_location(db, into_id)
            .await?
            .ok_or_else(|| CuratorError::NotFound {
                target: format!("target location {into_id}"),
            })?;

    let mut stats = MergeStats::default();

    for link in location_sources::list_for_location(db, from_id).await? {
        if let Some(existing) = location_sources::get_link(db, into_id, link.source_id).await? {
            let (first, last) = widen_window(
                existing.first_seen_at,
                existing.last_seen_at,
                link.first_seen_at,
                link.last_seen_at,
            );
            location_sources::update_window(db, existing.id, first, last).await?;
            location_sources::delete_link(db, link.id).await?;
            stats.sources_updated += 1;
        } else {
            location_sources::repoint_link(db, link.id, into_id).await?;
            stats.sources_moved += 1;
        }
    }

    if source_loc.rink_name != target_loc.rink_name {
        aliases::insert_alias(
            db,
            into_id,
            &source_loc.rink_name,
            Some(Utc::now()),
            Some(&format!("Merged from {from_id}")),
        )
        .await?;
        stats.alias_created = true;
    }

    stats.candidates_repointed = candidates::repoint_location(db, from_id, into_id).await?;

    locations::update_status(db, from_id, LocationStatus::Merged).await?;

    log::info!(
        "Merged '{}' ({from_id}) into '{}' ({into_id}): {} sources moved, {} updated, \
         {} candidates repointed",
        source_loc.rink_name,
        target_loc.rink_name,
        stats.sources_moved,
        stats.sources_updated,
        stats.candidates_repointed,
    );

    Ok(stats)
}

/// Searches locations by partial name, optionally filtered to a state.
/// Returns each hit with its corroborating source count, ordered by
/// state then city.
///
/// # Errors
///
/// Returns [`CuratorError::Db`] when the query fails.
pub async fn search_locations(
    db: &dyn Database,
    query: &str,
    state: Option<&str>,
) -> Result<Vec<(LocationRow, usize)>, CuratorError> {
    let results = locations::search_by_name(db, query, state).await?;

    let mut with_counts = Vec::with_capacity(results.len());
    for location in results {
        let count = location_sources::list_for_location(db, &location.rink_id)
            .await?
            .len();
        with_counts.push((location, count));
    }

    Ok(with_counts)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn window_union_takes_min_first_and_max_last() {
        let (first, last) = widen_window(
            Some(at(200)),
            Some(at(300)),
            Some(at(100)),
            Some(at(400)),
        );
        assert_eq!(first, Some(at(100)));
        assert_eq!(last, Some(at(400)));
    }

    #[test]
    fn window_union_never_shrinks() {
        let (first, last) = widen_window(
            Some(at(100)),
            Some(at(400)),
            Some(at(200)),
            Some(at(300)),
        );
        assert_eq!(first, Some(at(100)));
        assert_eq!(last, Some(at(400)));
    }

    #[test]
    fn null_sides_keep_the_known_value() {
        let (first, last) = widen_window(None, None, Some(at(100)), Some(at(200)));
        assert_eq!(first, Some(at(100)));
        assert_eq!(last, Some(at(200)));

        let (first, last) = widen_window(Some(at(100)), Some(at(200)), None, None);
        assert_eq!(first, Some(at(100)));
        assert_eq!(last, Some(at(200)));

        let (first, last) = widen_window(None, None, None, None);
        assert_eq!(first, None);
        assert_eq!(last, None);
    }

    #[test]
    fn target_requires_id_or_name() {
        assert!(matches!(
            LocationRef::from_args(None, None),
            Err(CuratorError::MissingTarget)
        ));
        assert!(matches!(
            LocationRef::from_args(Some("abc".to_string()), None),
            Ok(LocationRef::Id(_))
        ));
        assert!(matches!(
            LocationRef::from_args(None, Some("Polar".to_string())),
            Ok(LocationRef::Name(_))
        ));
    }
}
