use std::collections::BTreeSet;
use std::fmt;

use super::model::MergedRecord;

// ---------------------------------------------------------------------------
// Filter predicate: year range and season
// ---------------------------------------------------------------------------

/// Season selector value: everything, or one observed season.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SeasonFilter {
    #[default]
    All,
    Only(String),
}

impl SeasonFilter {
    /// Parse a selector label; `"All"` (any case) means no season filter.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("all") {
            SeasonFilter::All
        } else {
            SeasonFilter::Only(label.to_string())
        }
    }

    pub fn matches(&self, record: &MergedRecord) -> bool {
        match self {
            SeasonFilter::All => true,
            SeasonFilter::Only(season) => record.season.as_deref() == Some(season.as_str()),
        }
    }
}

impl fmt::Display for SeasonFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonFilter::All => write!(f, "All"),
            SeasonFilter::Only(s) => write!(f, "{s}"),
        }
    }
}

/// User selection applied to the merged records on every interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    /// Inclusive year range.
    pub year_range: (i32, i32),
    pub season: SeasonFilter,
}

impl FilterState {
    /// Everything selected: the full year span and all seasons.
    pub fn full(records: &[MergedRecord]) -> Self {
        FilterState {
            year_range: year_bounds(records).unwrap_or((0, 0)),
            season: SeasonFilter::All,
        }
    }

    pub fn contains_year(&self, year: i32) -> bool {
        let (lo, hi) = self.year_range;
        lo <= year && year <= hi
    }
}

/// Indices of records inside the year range, ignoring the season.
pub fn year_filtered_indices(records: &[MergedRecord], filters: &FilterState) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| filters.contains_year(r.year))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of records inside the year range and the selected season.
pub fn filtered_indices(records: &[MergedRecord], filters: &FilterState) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| filters.contains_year(r.year) && filters.season.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Resolve indices back to records.
pub fn select<'a>(records: &'a [MergedRecord], indices: &[usize]) -> Vec<&'a MergedRecord> {
    indices.iter().filter_map(|&i| records.get(i)).collect()
}

// ---------------------------------------------------------------------------
// Control domains
// ---------------------------------------------------------------------------

/// Smallest and largest year present, for the year-range slider.
pub fn year_bounds(records: &[MergedRecord]) -> Option<(i32, i32)> {
    let min = records.iter().map(|r| r.year).min()?;
    let max = records.iter().map(|r| r.year).max()?;
    Some((min, max))
}

/// Distinct seasons in ascending order, for the season selector.
pub fn observed_seasons(records: &[MergedRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.season.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::{decade_label, period_label};

    fn record(year: i32, season: Option<&str>) -> MergedRecord {
        MergedRecord {
            exp_id: None,
            peak_id: "EVER".into(),
            year,
            season: season.map(str::to_string),
            routes: Default::default(),
            successes: [false; 4],
            total_days: None,
            host: None,
            term_reason: None,
            any_success: false,
            peak: None,
            coords: None,
            decade: decade_label(year),
            period: period_label(year),
        }
    }

    fn records() -> Vec<MergedRecord> {
        vec![
            record(1950, Some("Spring")),
            record(1975, Some("Autumn")),
            record(1990, Some("Spring")),
            record(2010, None),
        ]
    }

    #[test]
    fn year_range_is_inclusive() {
        let recs = records();
        let filters = FilterState {
            year_range: (1975, 1990),
            season: SeasonFilter::All,
        };
        assert_eq!(year_filtered_indices(&recs, &filters), vec![1, 2]);
    }

    #[test]
    fn season_narrows_the_year_filter() {
        let recs = records();
        let filters = FilterState {
            year_range: (1900, 2100),
            season: SeasonFilter::from_label("Spring"),
        };
        assert_eq!(filtered_indices(&recs, &filters), vec![0, 2]);
        assert_eq!(year_filtered_indices(&recs, &filters).len(), 4);
    }

    #[test]
    fn full_state_selects_everything() {
        let recs = records();
        let filters = FilterState::full(&recs);
        assert_eq!(filters.year_range, (1950, 2010));
        assert_eq!(filtered_indices(&recs, &filters).len(), recs.len());
        assert_eq!(SeasonFilter::from_label("ALL"), SeasonFilter::All);
    }

    #[test]
    fn control_domains_come_from_data() {
        let recs = records();
        assert_eq!(observed_seasons(&recs), vec!["Autumn", "Spring"]);
        assert_eq!(year_bounds(&[]), None);
    }
}
