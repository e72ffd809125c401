use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::data::model::{ranked_counts, MergedRecord};

/// Only this many of the most active host countries are charted per decade.
pub const TOP_COUNTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryDecade {
    pub host: String,
    pub decade: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakCountry {
    pub peak_id: String,
    pub peak_name: String,
    pub host: String,
    pub count: usize,
}

/// Country activity tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CountryView {
    /// Most active hosts overall, most active first.
    pub top_countries: Vec<String>,
    /// Expeditions per (host, decade), restricted to `top_countries`.
    pub by_decade: Vec<CountryDecade>,
    /// Expeditions per (peak, host), largest count first.
    pub by_peak: Vec<PeakCountry>,
}

impl CountryView {
    /// The `n` most frequent hosts of one peak.
    pub fn top_for_peak(&self, peak_id: &str, n: usize) -> Vec<&PeakCountry> {
        self.by_peak
            .iter()
            .filter(|r| r.peak_id == peak_id)
            .take(n)
            .collect()
    }
}

/// Count expeditions per host country and decade, and per peak and host.
pub fn prepare_country_data<'a, I>(records: I) -> CountryView
where
    I: IntoIterator<Item = &'a MergedRecord>,
{
    let records: Vec<&MergedRecord> = records.into_iter().collect();

    let top_countries: Vec<String> =
        ranked_counts(records.iter().filter_map(|r| r.host.as_deref()))
            .into_iter()
            .take(TOP_COUNTRIES)
            .map(|(host, _)| host)
            .collect();
    let top: HashSet<&str> = top_countries.iter().map(String::as_str).collect();

    let mut decade_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut peak_counts: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();

    for rec in &records {
        let Some(host) = rec.host.as_deref() else {
            continue;
        };
        if top.contains(host) {
            *decade_counts.entry((host, rec.decade.as_str())).or_default() += 1;
        }
        if let Some(name) = rec.peak_name() {
            *peak_counts
                .entry((rec.peak_id.as_str(), name, host))
                .or_default() += 1;
        }
    }

    let by_decade = decade_counts
        .into_iter()
        .map(|((host, decade), count)| CountryDecade {
            host: host.to_string(),
            decade: decade.to_string(),
            count,
        })
        .collect();

    let mut by_peak: Vec<PeakCountry> = peak_counts
        .into_iter()
        .map(|((peak_id, peak_name, host), count)| PeakCountry {
            peak_id: peak_id.to_string(),
            peak_name: peak_name.to_string(),
            host: host.to_string(),
            count,
        })
        .collect();
    by_peak.sort_by(|a, b| b.count.cmp(&a.count));

    CountryView {
        top_countries,
        by_decade,
        by_peak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::expedition;

    fn hosted(peak: &str, year: i32, host: &str) -> MergedRecord {
        let mut rec = expedition(peak, year);
        rec.host = Some(host.into());
        rec
    }

    #[test]
    fn counts_by_host_and_decade() {
        let records = vec![
            hosted("EVER", 1953, "UK"),
            hosted("EVER", 1958, "UK"),
            hosted("EVER", 1963, "USA"),
            hosted("AMAD", 1961, "UK"),
            expedition("AMAD", 1962),
        ];
        let view = prepare_country_data(&records);

        assert_eq!(view.top_countries, vec!["UK", "USA"]);
        assert_eq!(
            view.by_decade,
            vec![
                CountryDecade { host: "UK".into(), decade: "1950s".into(), count: 2 },
                CountryDecade { host: "UK".into(), decade: "1960s".into(), count: 1 },
                CountryDecade { host: "USA".into(), decade: "1960s".into(), count: 1 },
            ]
        );
        assert_eq!(view.by_peak[0].host, "UK");
        assert_eq!(view.by_peak[0].peak_id, "EVER");
        assert_eq!(view.by_peak[0].count, 2);
    }

    #[test]
    fn only_ten_hosts_survive() {
        let mut records = Vec::new();
        for (i, host) in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L"]
            .iter()
            .enumerate()
        {
            for _ in 0..(20 - i) {
                records.push(hosted("EVER", 2000, host));
            }
        }
        let view = prepare_country_data(&records);
        assert_eq!(view.top_countries.len(), TOP_COUNTRIES);
        assert!(!view.top_countries.contains(&"K".to_string()));
        assert!(view.by_decade.iter().all(|r| r.host != "L"));
        // The per-peak breakdown is not restricted to the top hosts.
        assert_eq!(view.by_peak.len(), 12);
        assert!(view.by_peak.windows(2).all(|w| w[0].count >= w[1].count));
        assert_eq!(view.top_for_peak("EVER", 3).len(), 3);
    }
}
