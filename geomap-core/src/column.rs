//! Column role inference.
//!
//! User tables rarely agree on column names, so each semantic role owns a
//! small set of lowercase keywords. Matching is case-insensitive, but the
//! names handed back keep their original casing because dataset lookups
//! are exact-match.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Semantic role of a table column (or of a GeoJSON property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Time,
    Name,
    Value,
    Longitude,
    Latitude,
    /// Matches every column.
    Free,
    /// Join properties inside a GeoJSON feature.
    NameGeoJSON,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 7] = [
        ColumnRole::Time,
        ColumnRole::Name,
        ColumnRole::Value,
        ColumnRole::Longitude,
        ColumnRole::Latitude,
        ColumnRole::Free,
        ColumnRole::NameGeoJSON,
    ];

    /// Lowercase keywords for the role; `None` for [`ColumnRole::Free`].
    pub fn keywords(&self) -> Option<&'static [&'static str]> {
        match self {
            ColumnRole::Time => Some(&["time", "date", "year"]),
            ColumnRole::Name => Some(&[
                "name",
                "orf",
                "uniqid",
                "face",
                "triangle",
                "iso_code",
                "continent",
                "country",
                "location",
                "territory",
            ]),
            ColumnRole::Value => Some(&["value", "weight", "intensity", "amount", "level", "count"]),
            ColumnRole::Longitude => Some(&["longitude", "long", "lon"]),
            ColumnRole::Latitude => Some(&["latitude", "lat"]),
            ColumnRole::Free => None,
            ColumnRole::NameGeoJSON => Some(&["name", "admin", "iso_a3", "iso_a2", "iso"]),
        }
    }

    fn matches(&self, folded: &str) -> bool {
        self.keywords().map_or(true, |k| k.contains(&folded))
    }

    /// True when some role other than this one claims the folded name.
    fn claimed_elsewhere(&self, folded: &str) -> bool {
        ColumnRole::ALL
            .iter()
            .filter(|other| *other != self)
            .filter_map(|other| other.keywords())
            .any(|k| k.contains(&folded))
    }
}

/// Indices of the first occurrence of each folded name that passes `keep`, in column order.
fn first_occurrences<F>(folded: &[String], keep: F) -> Vec<usize>
where
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    folded
        .iter()
        .enumerate()
        .filter(|(_, f)| seen.insert(f.as_str()))
        .filter(|(_, f)| keep(f))
        .map(|(i, _)| i)
        .collect()
}

/// Candidate columns for `role`, best first.
///
/// Columns whose lowercased name is one of the role's keywords are returned
/// in their original order and casing, followed by `extras`. When nothing
/// matches, the list falls back to `extras` first (so the explicit choice is
/// the default), then every column not claimed by another role. If other
/// roles claim every column, all columns are offered instead of none.
pub fn classify_columns<S: AsRef<str>>(columns: &[String], role: ColumnRole, extras: &[S]) -> Vec<String> {
    let folded: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    let extras = extras.iter().map(|e| e.as_ref().to_string());

    let matched = first_occurrences(&folded, |f| role.matches(f));
    if !matched.is_empty() {
        return matched
            .into_iter()
            .map(|i| columns[i].clone())
            .chain(extras)
            .collect();
    }

    let mut fallback = first_occurrences(&folded, |f| !role.claimed_elsewhere(f));
    if fallback.is_empty() {
        log::debug!(
            "[Geomap] classify: every column belongs to another role than {:?}, offering all",
            role
        );
        fallback = first_occurrences(&folded, |_| true);
    }
    extras
        .chain(fallback.into_iter().map(|i| columns[i].clone()))
        .collect()
}

/// The best candidate column for `role`, if any.
pub fn classify_column<S: AsRef<str>>(columns: &[String], role: ColumnRole, extras: &[S]) -> Option<String> {
    classify_columns(columns, role, extras).into_iter().next()
}

/// The first column named by one of the role's keywords, with no fallback.
///
/// Coordinate columns use this: a guessed latitude is worse than none.
pub fn match_column(columns: &[String], role: ColumnRole) -> Option<String> {
    columns
        .iter()
        .find(|c| role.matches(&c.to_lowercase()))
        .cloned()
}

/// Default value column: the first Value candidate that is not the key column.
pub fn choose_value_column(columns: &[String], key: Option<&str>) -> Option<String> {
    classify_columns::<&str>(columns, ColumnRole::Value, &[])
        .into_iter()
        .find(|candidate| Some(candidate.as_str()) != key)
}
