//! Headless rendering of the dashboard views as text tables or JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use crate::data::filter::{select, year_filtered_indices, FilterState, SeasonFilter};
use crate::pipeline::Dataset;
use crate::views::countries::PeakCountry;
use crate::views::duration::{DurationAverage, DurationSuccess};
use crate::views::overview::{
    peak_details, peak_summary, top_peaks_by_expeditions, yearly_trend, PeakDetails, PeakStats,
    PeakSummary, YearlyTrend,
};
use crate::views::routes::{common_route_comparison, routes_for_peak, RouteSuccess};
use crate::views::termination::{ReasonShare, TerminationShare};

/// How many peaks the cross-peak overview lists.
const OVERVIEW_PEAKS: usize = 20;
/// How many routes the cross-peak route comparison keeps.
const COMMON_ROUTES: usize = 10;
/// How many hosts are listed for the selected peak.
const PEAK_COUNTRIES: usize = 10;
/// How many grouped reasons the cross-peak termination comparison keeps.
const COMPARED_REASONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// What the user selected on the command line.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub peak: Option<String>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub season: Option<String>,
}

/// All views for one selection, as presented in the dashboard tabs.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub peak_id: String,
    pub year_range: (i32, i32),
    pub season: String,
    pub details: Option<PeakDetails>,
    pub summary: PeakSummary,
    pub yearly: Vec<YearlyTrend>,
    pub top_peaks: Vec<PeakStats>,
    pub routes: Vec<RouteSuccess>,
    pub common_routes: Vec<RouteSuccess>,
    pub countries: Vec<PeakCountry>,
    pub duration: Vec<DurationSuccess>,
    pub duration_comparison: Vec<DurationAverage>,
    pub termination: Vec<TerminationShare>,
    pub termination_comparison: Vec<ReasonShare>,
}

impl Report {
    /// Apply `selection` to the dataset and collect every view.
    pub fn build(dataset: &Dataset, selection: &Selection) -> Report {
        let records = &dataset.merged.records;
        let mut filters = FilterState::full(records);
        if let Some(from) = selection.from_year {
            filters.year_range.0 = from;
        }
        if let Some(to) = selection.to_year {
            filters.year_range.1 = to;
        }
        if let Some(season) = &selection.season {
            filters.season = SeasonFilter::from_label(season);
        }

        let peak_id = selection
            .peak
            .clone()
            .or_else(|| dataset.merged.top_peaks.first().cloned())
            .or_else(|| records.first().map(|r| r.peak_id.clone()))
            .unwrap_or_default();

        let by_year = select(records, &year_filtered_indices(records, &filters));
        let views = &dataset.views;
        let season = match &filters.season {
            SeasonFilter::All => None,
            SeasonFilter::Only(s) => Some(s.as_str()),
        };

        Report {
            details: peak_details(records, &peak_id),
            summary: peak_summary(by_year.iter().copied(), &peak_id),
            yearly: yearly_trend(by_year.iter().copied()),
            top_peaks: top_peaks_by_expeditions(by_year.iter().copied(), OVERVIEW_PEAKS),
            routes: routes_for_peak(&views.route_success, &peak_id),
            common_routes: common_route_comparison(&views.route_success, COMMON_ROUTES),
            countries: views
                .countries
                .top_for_peak(&peak_id, PEAK_COUNTRIES)
                .into_iter()
                .cloned()
                .collect(),
            duration: views
                .duration
                .for_peak(&peak_id, season)
                .into_iter()
                .cloned()
                .collect(),
            duration_comparison: views.duration_comparison.clone(),
            termination: views.termination.for_peak(&peak_id).into_iter().cloned().collect(),
            termination_comparison: views
                .termination
                .comparison(&dataset.merged.top_peaks, COMPARED_REASONS),
            season: filters.season.to_string(),
            year_range: filters.year_range,
            peak_id,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("serializing report to JSON")
            }
            OutputFormat::Table => self.render_tables(),
        }
    }

    fn render_tables(&self) -> Result<String> {
        let mut out = String::new();
        let name = self
            .details
            .as_ref()
            .and_then(|d| d.info.name.clone())
            .unwrap_or_else(|| self.peak_id.clone());

        out.push_str(&format!(
            "Peak: {} ({})  years {}-{}  season {}\n",
            name, self.peak_id, self.year_range.0, self.year_range.1, self.season
        ));
        if let Some(details) = &self.details {
            let info = &details.info;
            out.push_str(&format!(
                "Height: {}  Region: {}  Range: {}",
                info.height_m.map_or("?".into(), |h| format!("{h:.0} m")),
                info.region.as_deref().unwrap_or("?"),
                info.himal.as_deref().unwrap_or("?"),
            ));
            if let Some(c) = details.coords {
                out.push_str(&format!("  Coordinates: {:.4}, {:.4}", c.latitude, c.longitude));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "Expeditions: {}  Success rate: {:.1}%  Average duration: {}\n",
            self.summary.total_expeditions,
            self.summary.success_rate * 100.0,
            self.summary
                .avg_duration
                .map_or("n/a".into(), |d| format!("{d:.1} days")),
        ));

        section(
            &mut out,
            "Top peaks by expeditions",
            peak_stats_batch(&self.top_peaks)?,
            self.top_peaks.is_empty(),
        )?;
        section(
            &mut out,
            "Success rate by route",
            route_batch(&self.routes)?,
            self.routes.is_empty(),
        )?;
        section(
            &mut out,
            "Route comparison across peaks",
            route_batch(&self.common_routes)?,
            self.common_routes.is_empty(),
        )?;
        section(
            &mut out,
            "Leading host countries",
            country_batch(&self.countries)?,
            self.countries.is_empty(),
        )?;
        section(
            &mut out,
            "Success rate by duration",
            duration_batch(&self.duration)?,
            self.duration.is_empty(),
        )?;
        section(
            &mut out,
            "Duration by outcome across peaks",
            duration_avg_batch(&self.duration_comparison)?,
            self.duration_comparison.is_empty(),
        )?;
        section(
            &mut out,
            "Termination reasons by period",
            termination_batch(&self.termination)?,
            self.termination.is_empty(),
        )?;
        section(
            &mut out,
            "Termination reasons across peaks",
            reason_share_batch(&self.termination_comparison)?,
            self.termination_comparison.is_empty(),
        )?;
        Ok(out)
    }
}

fn section(out: &mut String, title: &str, batch: RecordBatch, empty: bool) -> Result<()> {
    out.push_str(&format!("\n== {title} ==\n"));
    if empty {
        out.push_str("No data available with the current filters.\n");
        return Ok(());
    }
    let table = pretty_format_batches(&[batch]).context("formatting table")?;
    out.push_str(&table.to_string());
    out.push('\n');
    Ok(())
}

// ---------------------------------------------------------------------------
// Row → RecordBatch conversion
// ---------------------------------------------------------------------------

fn strings<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn counts(values: impl Iterator<Item = usize>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values.map(|v| v as u64)))
}

fn floats(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(values.collect::<Float64Array>())
}

fn flags(values: impl Iterator<Item = bool>) -> ArrayRef {
    Arc::new(values.map(Some).collect::<BooleanArray>())
}

fn one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Rates in [0, 1] shown as percentages.
fn percents(values: impl Iterator<Item = f64>) -> ArrayRef {
    floats(values.map(|v| Some(one_decimal(v * 100.0))))
}

fn batch(columns: Vec<(&str, ArrayRef)>) -> Result<RecordBatch> {
    RecordBatch::try_from_iter(columns).context("building report table")
}

fn peak_stats_batch(rows: &[PeakStats]) -> Result<RecordBatch> {
    batch(vec![
        ("peak", strings(rows.iter().map(|r| r.peak_name.as_str()))),
        ("height_m", floats(rows.iter().map(|r| r.height_m))),
        ("expeditions", counts(rows.iter().map(|r| r.expeditions))),
        ("success_%", percents(rows.iter().map(|r| r.success_rate))),
        ("avg_days", floats(rows.iter().map(|r| r.avg_duration.map(one_decimal)))),
    ])
}

fn route_batch(rows: &[RouteSuccess]) -> Result<RecordBatch> {
    batch(vec![
        ("peak", strings(rows.iter().map(|r| r.peak_name.as_str()))),
        ("route", strings(rows.iter().map(|r| r.route.as_str()))),
        ("total_attempts", counts(rows.iter().map(|r| r.total_attempts as usize))),
        ("successful_attempts", counts(rows.iter().map(|r| r.successful_attempts as usize))),
        ("success_%", percents(rows.iter().map(|r| r.success_rate))),
    ])
}

fn country_batch(rows: &[PeakCountry]) -> Result<RecordBatch> {
    batch(vec![
        ("host", strings(rows.iter().map(|r| r.host.as_str()))),
        ("expeditions", counts(rows.iter().map(|r| r.count))),
    ])
}

fn duration_batch(rows: &[DurationSuccess]) -> Result<RecordBatch> {
    batch(vec![
        ("season", strings(rows.iter().map(|r| r.season.as_str()))),
        ("duration", strings(rows.iter().map(|r| r.bucket.label()))),
        ("total", counts(rows.iter().map(|r| r.total))),
        ("successes", counts(rows.iter().map(|r| r.successes))),
        ("success_%", percents(rows.iter().map(|r| r.success_rate))),
    ])
}

fn duration_avg_batch(rows: &[DurationAverage]) -> Result<RecordBatch> {
    batch(vec![
        ("peak", strings(rows.iter().map(|r| r.peak_name.as_str()))),
        ("success", flags(rows.iter().map(|r| r.any_success))),
        ("avg_days", floats(rows.iter().map(|r| Some(one_decimal(r.avg_duration))))),
        ("expeditions", counts(rows.iter().map(|r| r.count))),
    ])
}

fn termination_batch(rows: &[TerminationShare]) -> Result<RecordBatch> {
    batch(vec![
        ("period", strings(rows.iter().map(|r| r.period.as_str()))),
        ("reason", strings(rows.iter().map(|r| r.reason.as_str()))),
        ("count", counts(rows.iter().map(|r| r.count))),
        ("total", counts(rows.iter().map(|r| r.total))),
        ("percent", floats(rows.iter().map(|r| Some(one_decimal(r.percentage))))),
    ])
}

fn reason_share_batch(rows: &[ReasonShare]) -> Result<RecordBatch> {
    batch(vec![
        ("peak", strings(rows.iter().map(|r| r.peak_name.as_str()))),
        ("reason", strings(rows.iter().map(|r| r.reason.as_str()))),
        ("count", counts(rows.iter().map(|r| r.count))),
        ("percent", floats(rows.iter().map(|r| Some(one_decimal(r.percentage))))),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MergedData;
    use crate::views::test_support::expedition;
    use crate::views::Views;

    fn dataset() -> Dataset {
        let mut records = Vec::new();
        for i in 0..12 {
            let mut rec = expedition("EVER", 1990 + i);
            rec.routes[0] = Some("S Col-SE Ridge".into());
            rec.successes[0] = i % 2 == 0;
            rec.any_success = i % 2 == 0;
            rec.host = Some("Nepal".into());
            rec.total_days = Some(40.0 + f64::from(i));
            rec.term_reason = Some("Bad weather".into());
            records.push(rec);
        }
        let views = Views::prepare(&records);
        Dataset {
            merged: MergedData {
                records,
                top_peaks: vec!["EVER".into()],
            },
            views,
        }
    }

    #[test]
    fn report_defaults_to_first_top_peak() {
        let report = Report::build(&dataset(), &Selection::default());
        assert_eq!(report.peak_id, "EVER");
        assert_eq!(report.year_range, (1990, 2001));
        assert_eq!(report.season, "All");
        assert_eq!(report.summary.total_expeditions, 12);
        assert_eq!(report.routes.len(), 1);
        assert_eq!(report.countries[0].count, 12);
    }

    #[test]
    fn year_range_narrows_filtered_views() {
        let selection = Selection {
            from_year: Some(1995),
            to_year: Some(1996),
            season: Some("Autumn".into()),
            ..Selection::default()
        };
        let report = Report::build(&dataset(), &selection);
        assert_eq!(report.summary.total_expeditions, 2);
        assert_eq!(report.yearly.len(), 2);
        assert!(report.duration.is_empty());
        // Cached views are not narrowed by the year range.
        assert_eq!(report.routes[0].total_attempts, 12);
        assert_eq!(report.countries[0].count, 12);
    }

    #[test]
    fn season_only_narrows_duration_views() {
        let dataset = dataset();
        let all = Report::build(&dataset, &Selection::default());
        let autumn = Report::build(
            &dataset,
            &Selection {
                season: Some("Autumn".into()),
                ..Selection::default()
            },
        );
        assert_eq!(autumn.season, "Autumn");
        assert_eq!(autumn.yearly, all.yearly);
        assert_eq!(autumn.yearly.len(), 12);
        assert_eq!(autumn.summary, all.summary);
        assert_eq!(autumn.top_peaks, all.top_peaks);
        assert!(autumn.duration.is_empty());
        assert!(!all.duration.is_empty());
    }

    #[test]
    fn peak_hosts_ignore_the_year_range() {
        let selection = Selection {
            from_year: Some(1990),
            to_year: Some(1990),
            ..Selection::default()
        };
        let report = Report::build(&dataset(), &selection);
        assert_eq!(report.summary.total_expeditions, 1);
        assert_eq!(report.countries.len(), 1);
        assert_eq!(report.countries[0].host, "Nepal");
        assert_eq!(report.countries[0].count, 12);
        assert_eq!(report.duration_comparison, dataset().views.duration_comparison);
    }

    #[test]
    fn renders_tables_and_json() {
        let report = Report::build(&dataset(), &Selection::default());
        let text = report.render(OutputFormat::Table).expect("tables");
        assert!(text.contains("Everest"));
        assert!(text.contains("S Col-SE Ridge"));

        let json = report.render(OutputFormat::Json).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["peak_id"], "EVER");
        assert_eq!(value["duration"][0]["bucket"], "31-45");
    }
}
