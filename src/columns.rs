//! Column name canonicalization and fuzzy indicator lookup.
//!
//! [`normalize_column_name`] produces the canonical `[a-z0-9_]` form used by
//! every later lookup. [`resolve_column`] maps a human-readable indicator name
//! (for example `"internet access percentage"`) onto a column by
//! case-insensitive substring match and reports ambiguity explicitly instead
//! of silently taking the first candidate.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::frame::Table;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9_]").expect("valid column name pattern"));

pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace(' ', "_");
    DISALLOWED.replace_all(&lowered, "").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unique(String),
    /// Several columns matched; candidates are in column order.
    Ambiguous { candidates: Vec<String> },
    NotFound,
}

impl Resolution {
    /// First matching column in column order, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            Resolution::Unique(name) => Some(name),
            Resolution::Ambiguous { candidates } => candidates.first().map(String::as_str),
            Resolution::NotFound => None,
        }
    }
}

/// Finds columns whose name contains `requested` (case-insensitive).
///
/// The request is tried verbatim first and then in its normalized form, so
/// `"internet access percentage"` still finds `internet_access_percentage`
/// after column names were normalized.
pub fn resolve_column(requested: &str, columns: &[&str]) -> Resolution {
    let needle = requested.trim().to_lowercase();
    if needle.is_empty() {
        return Resolution::NotFound;
    }
    let mut candidates = matching(&needle, columns);
    if candidates.is_empty() {
        let normalized = normalize_column_name(requested);
        if !normalized.is_empty() && normalized != needle {
            candidates = matching(&normalized, columns);
        }
    }
    match candidates.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Unique(candidates.remove(0)),
        _ => Resolution::Ambiguous { candidates },
    }
}

fn matching(needle: &str, columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| name.to_lowercase().contains(needle))
        .map(|name| name.to_string())
        .collect()
}

/// Resolves `requested` against `table`, accepting the first candidate.
///
/// Ambiguity and misses are logged; callers treat `None` as "skip this
/// query".
pub fn resolve_first(table: &Table, requested: &str) -> Option<String> {
    match resolve_column(requested, &table.column_names()) {
        Resolution::Unique(name) => Some(name),
        Resolution::Ambiguous { candidates } => {
            warn!(
                "Column '{requested}' is ambiguous ({}); using '{}'",
                candidates.join(", "),
                candidates[0]
            );
            candidates.into_iter().next()
        }
        Resolution::NotFound => {
            warn!("Column '{requested}' not found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_and_joins_words() {
        assert_eq!(
            normalize_column_name("  Internet Access (%) "),
            "internet_access_"
        );
        assert_eq!(normalize_column_name("Rural-Urban Gap"), "ruralurban_gap");
        assert_eq!(normalize_column_name("Year"), "year");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["Mobile Coverage %", "  A b  C ", "été 2024", "x__y"] {
            let once = normalize_column_name(raw);
            assert_eq!(normalize_column_name(&once), once);
        }
    }

    #[test]
    fn resolve_reports_unique_ambiguous_and_missing() {
        let columns = [
            "region",
            "rural_internet_access",
            "urban_internet_access",
            "year",
        ];
        assert_eq!(
            resolve_column("REGION", &columns),
            Resolution::Unique("region".to_string())
        );
        let ambiguous = resolve_column("internet_access", &columns);
        assert_eq!(
            ambiguous,
            Resolution::Ambiguous {
                candidates: vec![
                    "rural_internet_access".to_string(),
                    "urban_internet_access".to_string()
                ]
            }
        );
        assert_eq!(ambiguous.first(), Some("rural_internet_access"));
        assert_eq!(resolve_column("gender", &columns), Resolution::NotFound);
        assert_eq!(resolve_column("  ", &columns), Resolution::NotFound);
    }

    #[test]
    fn resolve_falls_back_to_normalized_request() {
        let columns = ["region", "internet_access_percentage"];
        assert_eq!(
            resolve_column("Internet Access Percentage", &columns),
            Resolution::Unique("internet_access_percentage".to_string())
        );
    }
}
