use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::data::model::{ranked_counts, MergedRecord};

/// Reasons seen fewer times than this across all records are pooled.
pub const MIN_REASON_OCCURRENCES: usize = 100;

/// Label of the pooled long-tail reasons.
pub const OTHER_REASONS: &str = "Other reasons";

/// Share of one (grouped) termination reason within a peak and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminationShare {
    pub peak_id: String,
    pub peak_name: String,
    pub period: String,
    pub reason: String,
    pub count: usize,
    /// Expeditions of the same peak and period over all reasons.
    pub total: usize,
    pub percentage: f64,
}

/// Share of one grouped reason over all periods of a peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonShare {
    pub peak_id: String,
    pub peak_name: String,
    pub reason: String,
    pub count: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TerminationView {
    /// Reasons kept under their own label, most frequent first.
    pub common_reasons: Vec<String>,
    /// Grouped reasons over all records, most frequent first.
    pub reason_ranking: Vec<(String, usize)>,
    pub evolution: Vec<TerminationShare>,
}

impl TerminationView {
    pub fn for_peak(&self, peak_id: &str) -> Vec<&TerminationShare> {
        self.evolution
            .iter()
            .filter(|r| r.peak_id == peak_id)
            .collect()
    }

    /// Expeditions per grouped reason on one peak, largest first.
    pub fn reason_totals_for_peak(&self, peak_id: &str) -> Vec<(String, usize)> {
        let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
        for row in self.evolution.iter().filter(|r| r.peak_id == peak_id) {
            *totals.entry(row.reason.as_str()).or_default() += row.count;
        }
        let mut out: Vec<(String, usize)> = totals
            .into_iter()
            .map(|(reason, n)| (reason.to_string(), n))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    /// Reason shares per peak over all periods, for the top peaks and the
    /// `n` most frequent grouped reasons.
    pub fn comparison(&self, top_peaks: &[String], n: usize) -> Vec<ReasonShare> {
        let reasons: HashSet<&str> = self
            .reason_ranking
            .iter()
            .take(n)
            .map(|(r, _)| r.as_str())
            .collect();
        let peaks: HashSet<&str> = top_peaks.iter().map(String::as_str).collect();

        let mut counts: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();
        let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
        for row in &self.evolution {
            *counts
                .entry((row.peak_id.as_str(), row.peak_name.as_str(), row.reason.as_str()))
                .or_default() += row.count;
            *totals.entry(row.peak_id.as_str()).or_default() += row.count;
        }

        counts
            .into_iter()
            .filter(|((peak_id, _, reason), _)| peaks.contains(peak_id) && reasons.contains(reason))
            .map(|((peak_id, peak_name, reason), count)| {
                let total = totals[peak_id];
                ReasonShare {
                    peak_id: peak_id.to_string(),
                    peak_name: peak_name.to_string(),
                    reason: reason.to_string(),
                    count,
                    total,
                    percentage: count as f64 / total as f64 * 100.0,
                }
            })
            .collect()
    }
}

/// Termination reason shares per peak and five-year period, with long-tail
/// reasons pooled into [`OTHER_REASONS`].
pub fn prepare_termination_data<'a, I>(records: I) -> TerminationView
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let records: Vec<&MergedRecord> = records
        .into_iter()
        .filter(|r| r.term_reason.is_some())
        .collect();

    let common_reasons: Vec<String> =
        ranked_counts(records.iter().filter_map(|r| r.term_reason.as_deref()))
            .into_iter()
            .filter(|(_, n)| *n >= MIN_REASON_OCCURRENCES)
            .map(|(reason, _)| reason)
            .collect();
    let common: HashSet<&str> = common_reasons.iter().map(String::as_str).collect();
    let grouped = |reason: &'a str| -> &'a str {
        if common.contains(reason) {
            reason
        } else {
            OTHER_REASONS
        }
    };

    let reason_ranking = ranked_counts(
        records
            .iter()
            .filter_map(|r| r.term_reason.as_deref())
            .map(grouped),
    );

    let mut counts: BTreeMap<(&str, &str, &str, &str), usize> = BTreeMap::new();
    for rec in &records {
        let (Some(name), Some(reason)) = (rec.peak_name(), rec.term_reason.as_deref()) else {
            continue;
        };
        *counts
            .entry((rec.peak_id.as_str(), name, rec.period.as_str(), grouped(reason)))
            .or_default() += 1;
    }

    let mut totals: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for ((peak_id, _, period, _), n) in &counts {
        *totals.entry((*peak_id, *period)).or_default() += n;
    }

    let evolution: Vec<TerminationShare> = counts
        .into_iter()
        .map(|((peak_id, peak_name, period, reason), count)| {
            let total = totals[&(peak_id, period)];
            TerminationShare {
                peak_id: peak_id.to_string(),
                peak_name: peak_name.to_string(),
                period: period.to_string(),
                reason: reason.to_string(),
                count,
                total,
                percentage: count as f64 / total as f64 * 100.0,
            }
        })
        .collect();

    log::debug!(
        "Termination view: {} common reasons, {} rows",
        common_reasons.len(),
        evolution.len()
    );
    TerminationView {
        common_reasons,
        reason_ranking,
        evolution,
    }
}
