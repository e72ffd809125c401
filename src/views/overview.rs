use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{Coordinates, MergedRecord, PeakInfo};

/// Headline numbers for the selected peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakSummary {
    pub total_expeditions: usize,
    /// 0 when there are no expeditions.
    pub success_rate: f64,
    /// Mean over expeditions with a known length.
    pub avg_duration: Option<f64>,
}

/// Static description of a peak, taken from its first merged record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDetails {
    pub peak_id: String,
    pub info: PeakInfo,
    pub coords: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyTrend {
    pub year: i32,
    pub expeditions: usize,
    pub successes: usize,
    pub success_rate: f64,
}

/// One marker of the peak map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakMapPoint {
    pub peak_id: String,
    pub peak_name: String,
    pub height_m: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
    pub expeditions: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakStats {
    pub peak_id: String,
    pub peak_name: String,
    pub expeditions: usize,
    pub success_rate: f64,
    pub avg_duration: Option<f64>,
    pub height_m: Option<f64>,
}

#[derive(Default)]
struct Tally {
    count: usize,
    successes: usize,
    days_sum: f64,
    days_count: usize,
}

impl Tally {
    fn add(&mut self, rec: &MergedRecord) {
        self.count += 1;
        self.successes += usize::from(rec.any_success);
        if let Some(days) = rec.total_days {
            self.days_sum += days;
            self.days_count += 1;
        }
    }

    fn success_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.successes as f64 / self.count as f64
        }
    }

    fn avg_duration(&self) -> Option<f64> {
        (self.days_count > 0).then(|| self.days_sum / self.days_count as f64)
    }
}

pub fn peak_summary<'a, I>(records: I, peak_id: &str) -> PeakSummary
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut tally = Tally::default();
    for rec in records.into_iter().filter(|r| r.peak_id == peak_id) {
        tally.add(rec);
    }
    PeakSummary {
        total_expeditions: tally.count,
        success_rate: tally.success_rate(),
        avg_duration: tally.avg_duration(),
    }
}

pub fn peak_details(records: &[MergedRecord], peak_id: &str) -> Option<PeakDetails> {
    let rec = records.iter().find(|r| r.peak_id == peak_id)?;
    Some(PeakDetails {
        peak_id: rec.peak_id.clone(),
        info: rec.peak.clone().unwrap_or_default(),
        coords: rec.coords,
    })
}

/// Expeditions and success rate per year, oldest first.
pub fn yearly_trend<'a, I>(records: I) -> Vec<YearlyTrend>
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut years: BTreeMap<i32, Tally> = BTreeMap::new();
    for rec in records {
        years.entry(rec.year).or_default().add(rec);
    }
    years
        .into_iter()
        .map(|(year, t)| YearlyTrend {
            year,
            expeditions: t.count,
            successes: t.successes,
            success_rate: t.success_rate(),
        })
        .collect()
}

/// Peaks with coordinates and a name, with their expedition counts.
pub fn peak_map_points<'a, I>(records: I) -> Vec<PeakMapPoint>
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut peaks: BTreeMap<&str, (&MergedRecord, Tally)> = BTreeMap::new();
    for rec in records {
        if rec.coords.is_none() || rec.peak_name().is_none() {
            continue;
        }
        peaks
            .entry(rec.peak_id.as_str())
            .or_insert_with(|| (rec, Tally::default()))
            .1
            .add(rec);
    }
    peaks
        .into_values()
        .filter_map(|(first, t)| {
            let coords = first.coords?;
            Some(PeakMapPoint {
                peak_id: first.peak_id.clone(),
                peak_name: first.peak_name()?.to_string(),
                height_m: first.height_m(),
                latitude: coords.latitude,
                longitude: coords.longitude,
                expeditions: t.count,
                success_rate: t.success_rate(),
            })
        })
        .collect()
}

/// The `n` peaks with the most expeditions, most first.
pub fn top_peaks_by_expeditions<'a, I>(records: I, n: usize) -> Vec<PeakStats>
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let mut groups: BTreeMap<(&str, &str), (Option<f64>, Tally)> = BTreeMap::new();
    for rec in records {
        let Some(name) = rec.peak_name() else {
            continue;
        };
        let (height, tally) = groups.entry((rec.peak_id.as_str(), name)).or_default();
        if height.is_none() {
            *height = rec.height_m();
        }
        tally.add(rec);
    }
    let mut stats: Vec<PeakStats> = groups
        .into_iter()
        .map(|((peak_id, peak_name), (height_m, t))| PeakStats {
            peak_id: peak_id.to_string(),
            peak_name: peak_name.to_string(),
            expeditions: t.count,
            success_rate: t.success_rate(),
            avg_duration: t.avg_duration(),
            height_m,
        })
        .collect();
    stats.sort_by(|a, b| b.expeditions.cmp(&a.expeditions));
    stats.truncate(n);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::expedition;

    fn outcome(peak: &str, year: i32, success: bool, days: Option<f64>) -> MergedRecord {
        let mut rec = expedition(peak, year);
        rec.any_success = success;
        rec.total_days = days;
        rec
    }

    #[test]
    fn summary_of_selected_peak() {
        let records = vec![
            outcome("EVER", 2000, true, Some(40.0)),
            outcome("EVER", 2001, false, None),
            outcome("EVER", 2002, true, Some(60.0)),
            outcome("AMAD", 2002, true, Some(10.0)),
        ];
        let summary = peak_summary(&records, "EVER");
        assert_eq!(summary.total_expeditions, 3);
        assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(summary.avg_duration, Some(50.0));

        let empty = peak_summary(&records, "LHOT");
        assert_eq!(empty.total_expeditions, 0);
        assert_eq!(empty.success_rate, 0.0);
        assert_eq!(empty.avg_duration, None);
    }

    #[test]
    fn yearly_trend_is_sorted() {
        let records = vec![
            outcome("EVER", 2001, true, None),
            outcome("EVER", 1999, false, None),
            outcome("AMAD", 2001, false, None),
        ];
        let trend = yearly_trend(&records);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].year, 1999);
        assert_eq!(trend[1].expeditions, 2);
        assert_eq!(trend[1].success_rate, 0.5);
    }

    #[test]
    fn map_points_need_coordinates() {
        let mut records = vec![outcome("EVER", 2001, true, None)];
        let mut lost = outcome("XXXX", 2001, true, None);
        lost.coords = None;
        records.push(lost);

        let points = peak_map_points(&records);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].peak_name, "Everest");
        assert_eq!(points[0].expeditions, 1);
    }

    #[test]
    fn peak_ranking_truncates() {
        let mut records = Vec::new();
        for (peak, n) in [("EVER", 5), ("AMAD", 3), ("CHOY", 4)] {
            for _ in 0..n {
                records.push(outcome(peak, 2000, false, Some(30.0)));
            }
        }
        let stats = top_peaks_by_expeditions(&records, 2);
        let ids: Vec<_> = stats.iter().map(|s| s.peak_id.as_str()).collect();
        assert_eq!(ids, vec!["EVER", "CHOY"]);
        assert_eq!(stats[0].avg_duration, Some(30.0));
        assert_eq!(peak_details(&records, "AMAD").map(|d| d.peak_id), Some("AMAD".into()));
    }
}
