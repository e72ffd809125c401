use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::data::model::MergedRecord;

/// Duration buckets with fewer expeditions than this are not reported.
pub const MIN_BUCKET_EXPEDITIONS: usize = 3;

/// Peaks need this many expeditions for the cross-peak duration comparison.
pub const MIN_COMPARISON_EXPEDITIONS: usize = 20;

/// Expedition length bucket. Each bucket covers `(lower, upper]` days; the
/// last one takes everything above 90 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DurationBucket {
    #[serde(rename = "1-15")]
    Days1To15,
    #[serde(rename = "16-30")]
    Days16To30,
    #[serde(rename = "31-45")]
    Days31To45,
    #[serde(rename = "46-60")]
    Days46To60,
    #[serde(rename = "61-75")]
    Days61To75,
    #[serde(rename = "76-90")]
    Days76To90,
    #[serde(rename = "90+")]
    Over90,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 7] = [
        DurationBucket::Days1To15,
        DurationBucket::Days16To30,
        DurationBucket::Days31To45,
        DurationBucket::Days46To60,
        DurationBucket::Days61To75,
        DurationBucket::Days76To90,
        DurationBucket::Over90,
    ];

    /// Bucket for a positive number of days; `None` for zero, negative or NaN.
    pub fn for_days(days: f64) -> Option<Self> {
        if days.is_nan() || days <= 0.0 {
            return None;
        }
        let bucket = match days {
            d if d <= 15.0 => DurationBucket::Days1To15,
            d if d <= 30.0 => DurationBucket::Days16To30,
            d if d <= 45.0 => DurationBucket::Days31To45,
            d if d <= 60.0 => DurationBucket::Days46To60,
            d if d <= 75.0 => DurationBucket::Days61To75,
            d if d <= 90.0 => DurationBucket::Days76To90,
            _ => DurationBucket::Over90,
        };
        Some(bucket)
    }

    pub fn label(self) -> &'static str {
        match self {
            DurationBucket::Days1To15 => "1-15",
            DurationBucket::Days16To30 => "16-30",
            DurationBucket::Days31To45 => "31-45",
            DurationBucket::Days46To60 => "46-60",
            DurationBucket::Days61To75 => "61-75",
            DurationBucket::Days76To90 => "76-90",
            DurationBucket::Over90 => "90+",
        }
    }

    /// Position on a categorical axis.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Success rate for one (peak, season, duration bucket).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationSuccess {
    pub peak_id: String,
    pub peak_name: String,
    pub season: String,
    pub bucket: DurationBucket,
    pub total: usize,
    pub successes: usize,
    pub success_rate: f64,
}

/// Mean duration of successful vs. unsuccessful expeditions on one peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationAverage {
    pub peak_id: String,
    pub peak_name: String,
    pub any_success: bool,
    pub avg_duration: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DurationView {
    pub by_bucket: Vec<DurationSuccess>,
    pub averages: Vec<DurationAverage>,
}

impl DurationView {
    /// Bucket rows of one peak, optionally restricted to a season.
    pub fn for_peak(&self, peak_id: &str, season: Option<&str>) -> Vec<&DurationSuccess> {
        self.by_bucket
            .iter()
            .filter(|r| r.peak_id == peak_id)
            .filter(|r| season.map_or(true, |s| r.season == s))
            .collect()
    }
}

#[derive(Default)]
struct DaysTally {
    count: usize,
    successes: usize,
    days: f64,
}

fn average_rows(groups: BTreeMap<(&str, &str, bool), DaysTally>) -> Vec<DurationAverage> {
    groups
        .into_iter()
        .map(|((peak_id, peak_name, any_success), t)| DurationAverage {
            peak_id: peak_id.to_string(),
            peak_name: peak_name.to_string(),
            any_success,
            avg_duration: t.days / t.count as f64,
            count: t.count,
        })
        .collect()
}

/// Success rates by duration bucket and season, plus mean durations split by
/// outcome. Only records with a known positive length take part.
pub fn prepare_duration_data<'a, I>(records: I) -> DurationView
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut buckets: BTreeMap<(&str, &str, &str, DurationBucket), DaysTally> = BTreeMap::new();
    let mut averages: BTreeMap<(&str, &str, bool), DaysTally> = BTreeMap::new();

    for rec in records {
        let Some(days) = rec.positive_days() else {
            continue;
        };
        let Some(name) = rec.peak_name() else {
            continue;
        };

        let avg = averages
            .entry((rec.peak_id.as_str(), name, rec.any_success))
            .or_default();
        avg.count += 1;
        avg.days += days;

        let (Some(season), Some(bucket)) = (rec.season.as_deref(), DurationBucket::for_days(days))
        else {
            continue;
        };
        let tally = buckets
            .entry((rec.peak_id.as_str(), name, season, bucket))
            .or_default();
        tally.count += 1;
        tally.successes += usize::from(rec.any_success);
    }

    let by_bucket: Vec<DurationSuccess> = buckets
        .into_iter()
        .filter(|(_, t)| t.count >= MIN_BUCKET_EXPEDITIONS)
        .map(|((peak_id, peak_name, season, bucket), t)| DurationSuccess {
            peak_id: peak_id.to_string(),
            peak_name: peak_name.to_string(),
            season: season.to_string(),
            bucket,
            total: t.count,
            successes: t.successes,
            success_rate: t.successes as f64 / t.count as f64,
        })
        .collect();

    log::debug!("Duration view: {} bucket rows", by_bucket.len());
    DurationView {
        by_bucket,
        averages: average_rows(averages),
    }
}

#[derive(Default)]
struct OutcomeTally {
    count: usize,
    known: usize,
    days: f64,
}

/// Mean duration by outcome across peaks, for peaks with at least
/// [`MIN_COMPARISON_EXPEDITIONS`] expeditions. `count` covers every
/// expedition of the group; the mean uses only those of known length, and a
/// group with no known length yields no row.
pub fn duration_comparison<'a, I>(records: I) -> Vec<DurationAverage>
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut groups: BTreeMap<(&str, &str, bool), OutcomeTally> = BTreeMap::new();
    let mut per_peak: BTreeMap<&str, usize> = BTreeMap::new();
    for rec in records {
        let Some(name) = rec.peak_name() else {
            continue;
        };
        *per_peak.entry(rec.peak_id.as_str()).or_default() += 1;
        let tally = groups
            .entry((rec.peak_id.as_str(), name, rec.any_success))
            .or_default();
        tally.count += 1;
        if let Some(days) = rec.total_days {
            tally.known += 1;
            tally.days += days;
        }
    }

    groups
        .into_iter()
        .filter(|((peak_id, _, _), t)| {
            t.known > 0 && per_peak[peak_id] >= MIN_COMPARISON_EXPEDITIONS
        })
        .map(|((peak_id, peak_name, any_success), t)| DurationAverage {
            peak_id: peak_id.to_string(),
            peak_name: peak_name.to_string(),
            any_success,
            avg_duration: t.days / t.known as f64,
            count: t.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::expedition;

    fn trip(peak: &str, season: &str, days: f64, success: bool) -> MergedRecord {
        let mut rec = expedition(peak, 2005);
        rec.season = Some(season.into());
        rec.total_days = Some(days);
        rec.any_success = success;
        rec
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(DurationBucket::for_days(10.0), Some(DurationBucket::Days1To15));
        assert_eq!(DurationBucket::for_days(15.0), Some(DurationBucket::Days1To15));
        assert_eq!(DurationBucket::for_days(15.5), Some(DurationBucket::Days16To30));
        assert_eq!(DurationBucket::for_days(90.0), Some(DurationBucket::Days76To90));
        assert_eq!(DurationBucket::for_days(91.0), Some(DurationBucket::Over90));
        assert_eq!(DurationBucket::for_days(400.0), Some(DurationBucket::Over90));
        assert_eq!(DurationBucket::for_days(0.0), None);
        assert_eq!(DurationBucket::for_days(f64::NAN), None);
        assert_eq!(DurationBucket::Days76To90.label(), "76-90");
    }

    #[test]
    fn bucketing_is_total_and_monotonic() {
        let mut previous = DurationBucket::Days1To15;
        for tenth in 1..5000 {
            let days = f64::from(tenth) / 10.0;
            let bucket = DurationBucket::for_days(days).expect("positive days have a bucket");
            assert!(bucket >= previous, "{days} days went back to {bucket}");
            previous = bucket;
        }
        assert_eq!(previous, DurationBucket::Over90);
    }

    #[test]
    fn small_buckets_are_dropped() {
        let records = vec![
            trip("EVER", "Spring", 50.0, true),
            trip("EVER", "Spring", 55.0, false),
            trip("EVER", "Spring", 60.0, true),
            trip("EVER", "Spring", 10.0, false),
            trip("EVER", "Spring", 12.0, false),
            trip("EVER", "Autumn", 0.0, true),
        ];
        let view = prepare_duration_data(&records);

        assert_eq!(view.by_bucket.len(), 1);
        let row = &view.by_bucket[0];
        assert_eq!(row.bucket, DurationBucket::Days46To60);
        assert_eq!(row.total, 3);
        assert_eq!(row.successes, 2);
        assert!((row.success_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn averages_split_by_outcome() {
        let records = vec![
            trip("EVER", "Spring", 50.0, true),
            trip("EVER", "Autumn", 70.0, true),
            trip("EVER", "Spring", 20.0, false),
            trip("EVER", "Spring", -1.0, false),
        ];
        let view = prepare_duration_data(&records);

        assert_eq!(view.averages.len(), 2);
        let failed = &view.averages[0];
        assert!(!failed.any_success);
        assert_eq!(failed.count, 1);
        assert_eq!(failed.avg_duration, 20.0);
        let summited = &view.averages[1];
        assert_eq!(summited.count, 2);
        assert_eq!(summited.avg_duration, 60.0);
    }

    #[test]
    fn comparison_needs_twenty_expeditions() {
        let mut records = Vec::new();
        for i in 0..20 {
            records.push(trip("EVER", "Spring", 40.0 + f64::from(i), i % 2 == 0));
        }
        for _ in 0..19 {
            records.push(trip("AMAD", "Spring", 20.0, true));
        }
        let rows = duration_comparison(&records);
        assert!(rows.iter().all(|r| r.peak_id == "EVER"));
        assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), 20);
    }

    #[test]
    fn comparison_counts_expeditions_of_unknown_length() {
        let mut records = Vec::new();
        for i in 0..20 {
            let mut rec = trip("EVER", "Spring", 30.0, true);
            if i % 2 == 1 {
                rec.total_days = None;
            }
            records.push(rec);
        }
        let rows = duration_comparison(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 20);
        assert_eq!(rows[0].avg_duration, 30.0);
    }

    #[test]
    fn season_filter_on_peak_rows() {
        let mut records = Vec::new();
        for season in ["Spring", "Autumn"] {
            for _ in 0..3 {
                records.push(trip("EVER", season, 30.0, true));
            }
        }
        let view = prepare_duration_data(&records);
        assert_eq!(view.for_peak("EVER", None).len(), 2);
        assert_eq!(view.for_peak("EVER", Some("Autumn")).len(), 1);
        assert!(view.for_peak("AMAD", None).is_empty());
    }
}
