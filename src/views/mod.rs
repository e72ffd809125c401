//! Aggregate views over the merged expedition records.
//!
//! Each preparer is a pure function of the records it is given: the full
//! merged table for the cached views, or a filtered selection when the user
//! changes the year range or season.

pub mod countries;
pub mod duration;
pub mod overview;
pub mod routes;
pub mod termination;

use serde::Serialize;

use crate::data::model::MergedRecord;

pub use countries::{prepare_country_data, CountryView};
pub use duration::{
    duration_comparison, prepare_duration_data, DurationAverage, DurationBucket, DurationView,
};
pub use routes::{prepare_route_success, RouteSuccess};
pub use termination::{prepare_termination_data, TerminationView};

/// The chart-family views computed from the full merged table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Views {
    pub route_success: Vec<RouteSuccess>,
    pub countries: CountryView,
    pub duration: DurationView,
    /// Cross-peak mean durations by outcome.
    pub duration_comparison: Vec<DurationAverage>,
    pub termination: TerminationView,
}

impl Views {
    pub fn prepare(records: &[MergedRecord]) -> Self {
        Views {
            route_success: prepare_route_success(records),
            countries: prepare_country_data(records),
            duration: prepare_duration_data(records),
            duration_comparison: duration_comparison(records),
            termination: prepare_termination_data(records),
        }
    }
}


#[cfg(test)]
pub(crate) mod test_support {
    use crate::data::clean::{decade_label, period_label};
    use crate::data::model::{Coordinates, MergedRecord, PeakInfo};

    /// A bare expedition on a known peak. `EVER` resolves to Everest; any
    /// other id uses the id as the peak name.
    pub fn expedition(peak: &str, year: i32) -> MergedRecord {
        let (name, height) = match peak {
            "EVER" => ("Everest", Some(8849.0)),
            other => (other, None),
        };
        MergedRecord {
            exp_id: Some(format!("{peak}{year}")),
            peak_id: peak.to_string(),
            year,
            season: Some("Spring".into()),
            routes: Default::default(),
            successes: [false; 4],
            total_days: None,
            host: None,
            term_reason: None,
            any_success: false,
            peak: Some(PeakInfo {
                name: Some(name.to_string()),
                height_m: height,
                himal: None,
                region: None,
            }),
            coords: Some(Coordinates {
                latitude: 27.98,
                longitude: 86.92,
            }),
            decade: decade_label(year),
            period: period_label(year),
        }
    }
}
