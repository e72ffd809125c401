use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{ranked_counts, MergedRecord};

/// Routes with fewer attempts than this have no reported success rate.
pub const MIN_ROUTE_ATTEMPTS: u32 = 5;

/// Success statistics for one route on one peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSuccess {
    pub peak_id: String,
    pub peak_name: String,
    pub route: String,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    /// First known height among the grouped attempts.
    pub height_m: Option<f64>,
    pub success_rate: f64,
}

#[derive(Default)]
struct RouteTally {
    attempts: u32,
    successes: u32,
    height_m: Option<f64>,
}

/// Expand every record into its route attempts and compute success rates per
/// (peak, peak name, route).
///
/// Attempts on peaks without a known name are not grouped. Rows are ordered
/// by peak id, then name, then route.
pub fn prepare_route_success<'a, I>(records: I) -> Vec<RouteSuccess>
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut groups: BTreeMap<(&str, &str, &str), RouteTally> = BTreeMap::new();

    for rec in records {
        let Some(name) = rec.peak_name() else {
            continue;
        };
        for attempt in rec.attempts() {
            let tally = groups
                .entry((rec.peak_id.as_str(), name, attempt.route))
                .or_default();
            tally.attempts += 1;
            tally.successes += u32::from(attempt.success);
            if tally.height_m.is_none() {
                tally.height_m = rec.height_m();
            }
        }
    }

    let rows: Vec<RouteSuccess> = groups
        .into_iter()
        .filter(|(_, t)| t.attempts >= MIN_ROUTE_ATTEMPTS)
        .map(|((peak_id, peak_name, route), t)| RouteSuccess {
            peak_id: peak_id.to_string(),
            peak_name: peak_name.to_string(),
            route: route.to_string(),
            total_attempts: t.attempts,
            successful_attempts: t.successes,
            height_m: t.height_m,
            success_rate: f64::from(t.successes) / f64::from(t.attempts),
        })
        .collect();

    log::debug!("Route success view: {} routes", rows.len());
    rows
}

/// One peak's routes, best success rate first.
pub fn routes_for_peak(rows: &[RouteSuccess], peak_id: &str) -> Vec<RouteSuccess> {
    let mut out: Vec<RouteSuccess> = rows
        .iter()
        .filter(|r| r.peak_id == peak_id)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    out
}

/// The `n` route labels that occur on the most peaks in the success view.
pub fn common_routes(rows: &[RouteSuccess], n: usize) -> Vec<String> {
    ranked_counts(rows.iter().map(|r| r.route.as_str()))
        .into_iter()
        .take(n)
        .map(|(route, _)| route)
        .collect()
}

/// Rows whose route is one of the common routes, for cross-peak comparison.
pub fn common_route_comparison(rows: &[RouteSuccess], n: usize) -> Vec<RouteSuccess> {
    let common = common_routes(rows, n);
    rows.iter()
        .filter(|r| common.contains(&r.route))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::expedition;

    #[test]
    fn single_slot_expands_to_one_attempt() {
        let mut rec = expedition("EVER", 1953);
        rec.routes[0] = Some("North Col".into());
        rec.successes[0] = true;
        rec.any_success = true;

        let attempts: Vec<_> = rec.attempts().collect();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].route, "North Col");
        assert!(attempts[0].success);
    }

    #[test]
    fn groups_below_five_attempts_are_dropped() {
        let mut records = Vec::new();
        for i in 0..5 {
            let mut rec = expedition("EVER", 1990 + i);
            rec.routes[0] = Some("S Col-SE Ridge".into());
            rec.successes[0] = i % 2 == 0;
            records.push(rec);
        }
        for i in 0..4 {
            let mut rec = expedition("EVER", 1990 + i);
            rec.routes[1] = Some("N Col-NE Ridge".into());
            records.push(rec);
        }

        let rows = prepare_route_success(&records);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.route, "S Col-SE Ridge");
        assert_eq!(row.total_attempts, 5);
        assert_eq!(row.successful_attempts, 3);
        assert_eq!(row.success_rate, 3.0 / 5.0);
        assert_eq!(row.height_m, Some(8849.0));
    }

    #[test]
    fn rates_are_consistent() {
        let mut records = Vec::new();
        for i in 0..40 {
            let mut rec = expedition(if i % 3 == 0 { "AMAD" } else { "EVER" }, 2000);
            rec.routes[(i % 4) as usize] = Some(format!("Route {}", i % 2));
            rec.successes[(i % 4) as usize] = i % 5 == 0;
            records.push(rec);
        }
        for row in prepare_route_success(&records) {
            assert!(row.successful_attempts <= row.total_attempts);
            assert!(row.total_attempts >= MIN_ROUTE_ATTEMPTS);
            assert_eq!(
                row.success_rate,
                f64::from(row.successful_attempts) / f64::from(row.total_attempts)
            );
        }
    }

    #[test]
    fn unnamed_peaks_are_skipped() {
        let mut records = Vec::new();
        for _ in 0..6 {
            let mut rec = expedition("XXXX", 2001);
            rec.peak = None;
            rec.routes[0] = Some("SW Face".into());
            records.push(rec);
        }
        assert!(prepare_route_success(&records).is_empty());
    }

    #[test]
    fn common_routes_rank_by_peak_count() {
        let row = |peak: &str, route: &str, rate: f64| RouteSuccess {
            peak_id: peak.into(),
            peak_name: peak.into(),
            route: route.into(),
            total_attempts: 10,
            successful_attempts: (rate * 10.0) as u32,
            height_m: None,
            success_rate: rate,
        };
        let rows = vec![
            row("AMAD", "SW Ridge", 0.8),
            row("EVER", "SW Ridge", 0.5),
            row("EVER", "N Col", 0.2),
            row("EVER", "S Col", 0.6),
        ];
        assert_eq!(common_routes(&rows, 2), vec!["SW Ridge", "N Col"]);
        assert_eq!(common_route_comparison(&rows, 1).len(), 2);

        let ever = routes_for_peak(&rows, "EVER");
        let order: Vec<_> = ever.iter().map(|r| r.route.as_str()).collect();
        assert_eq!(order, vec!["S Col", "SW Ridge", "N Col"]);
    }
}
