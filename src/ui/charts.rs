use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, Points};

use himalaya_dash::views::duration::DurationBucket;
use himalaya_dash::views::overview::{peak_map_points, top_peaks_by_expeditions, yearly_trend, YearlyTrend};
use himalaya_dash::views::routes::{common_route_comparison, routes_for_peak};
use himalaya_dash::views::termination::TerminationShare;
use himalaya_dash::Dataset;

use crate::color::{outcome_color, success_color};
use crate::state::{AppState, Tab};

/// Peaks in the cross-peak expedition ranking.
const TOP_PEAKS_SHOWN: usize = 20;
/// Routes in the cross-peak route comparison.
const COMMON_ROUTES_SHOWN: usize = 10;
/// Host countries listed for the selected peak.
const PEAK_COUNTRIES_SHOWN: usize = 10;
/// Grouped reasons in the cross-peak termination comparison.
const COMPARED_REASONS: usize = 5;
/// Histogram bin width for expedition durations, in days.
const DURATION_BIN_DAYS: f64 = 5.0;

const CHART_HEIGHT: f32 = 280.0;
const EXPEDITION_BLUE: Color32 = Color32::from_rgb(0x46, 0x82, 0xb4);
const RATE_ORANGE: Color32 = Color32::from_rgb(0xff, 0xa5, 0x00);

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the charts of the active tab.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    let Some(ds) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a data folder to explore expeditions  (File → Open data folder…)");
        });
        return;
    };
    let Some(peak) = state.selected_peak.as_deref() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No peak has enough expeditions to chart.");
        });
        return;
    };
    let name = state.selected_peak_name();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.active_tab {
            Tab::Overview => overview_tab(ui, state, peak, &name),
            Tab::Routes => routes_tab(ui, ds, peak, &name),
            Tab::Countries => countries_tab(ui, state, ds, peak, &name),
            Tab::Duration => duration_tab(ui, state, ds, peak, &name),
            Tab::Termination => termination_tab(ui, state, ds, peak, &name),
        });
}

fn no_data(ui: &mut Ui, what: &str, name: &str) {
    ui.label(
        RichText::new(format!(
            "No {what} data available for {name} with the current filters."
        ))
        .italics(),
    );
}

/// Axis labels for charts whose categories sit at integer positions.
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let idx = mark.value.round();
        if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }
}

fn percent_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    format!("{:.0}%", mark.value * 100.0)
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

fn overview_tab(ui: &mut Ui, state: &AppState, peak: &str, name: &str) {
    let in_range = state.year_records();

    ui.heading("Peak Map");
    let points = peak_map_points(in_range.iter().copied());
    if points.is_empty() {
        ui.label("No peaks with coordinates in the current filter.");
    } else {
        let max_count = points.iter().map(|p| p.expeditions).max().unwrap_or(1) as f32;
        Plot::new("peak_map")
            .height(CHART_HEIGHT + 80.0)
            .data_aspect(1.0)
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .show(ui, |plot_ui| {
                for p in &points {
                    let radius = 2.0 + 10.0 * (p.expeditions as f32 / max_count).sqrt();
                    let color = if p.peak_id == peak {
                        Color32::WHITE
                    } else {
                        success_color(p.success_rate)
                    };
                    plot_ui.points(
                        Points::new(vec![[p.longitude, p.latitude]])
                            .radius(radius)
                            .color(color)
                            .name(format!(
                                "{} ({} expeditions, {:.1}% success)",
                                p.peak_name,
                                p.expeditions,
                                p.success_rate * 100.0
                            )),
                    );
                }
            });
    }

    ui.heading("Historical Trends");
    trend_plots(ui, "overall", "All peaks", &yearly_trend(in_range.iter().copied()));
    let peak_trend = yearly_trend(in_range.iter().copied().filter(|r| r.peak_id == peak));
    if peak_trend.is_empty() {
        no_data(ui, "yearly", name);
    } else {
        trend_plots(ui, "peak", name, &peak_trend);
    }

    ui.heading("Comparative Statistics Across Peaks");
    let stats = top_peaks_by_expeditions(in_range.iter().copied(), TOP_PEAKS_SHOWN);
    if stats.is_empty() {
        ui.label("No peaks in the current filter.");
        return;
    }
    let bars: Vec<Bar> = stats
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Bar::new(i as f64, s.expeditions as f64)
                .name(format!(
                    "{}: {} expeditions, {:.1}% success, {}",
                    s.peak_name,
                    s.expeditions,
                    s.success_rate * 100.0,
                    s.avg_duration
                        .map(|d| format!("{d:.1} days on average"))
                        .unwrap_or_else(|| "duration unknown".into())
                ))
                .fill(success_color(s.success_rate))
        })
        .collect();
    let labels = stats.iter().map(|s| s.peak_name.clone()).collect();
    Plot::new("top_peaks")
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(labels))
        .y_axis_label("Expeditions")
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).width(0.7)));
}

/// Expeditions and success rate per year, as two stacked plots.
fn trend_plots(ui: &mut Ui, id: &str, title: &str, rows: &[YearlyTrend]) {
    ui.label(RichText::new(format!("{title} by year")).strong());
    let expeditions: Vec<[f64; 2]> = rows
        .iter()
        .map(|r| [f64::from(r.year), r.expeditions as f64])
        .collect();
    let rates: Vec<[f64; 2]> = rows
        .iter()
        .map(|r| [f64::from(r.year), r.success_rate])
        .collect();

    Plot::new(format!("{id}_expeditions"))
        .height(CHART_HEIGHT / 2.0)
        .y_axis_label("Expeditions")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(expeditions).color(EXPEDITION_BLUE).name("Expeditions"));
        });
    Plot::new(format!("{id}_rates"))
        .height(CHART_HEIGHT / 2.0)
        .include_y(0.0)
        .include_y(1.0)
        .y_axis_formatter(percent_axis)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(rates).color(RATE_ORANGE).name("Success rate"));
        });
}

// ---------------------------------------------------------------------------
// Routes & Success
// ---------------------------------------------------------------------------

fn routes_tab(ui: &mut Ui, ds: &Dataset, peak: &str, name: &str) {
    ui.heading(format!("Route Success Rates for {name}"));
    let routes = routes_for_peak(&ds.views.route_success, peak);
    if routes.is_empty() {
        no_data(ui, "route", name);
    } else {
        let n = routes.len();
        let bars: Vec<Bar> = routes
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Bar::new((n - 1 - i) as f64, r.success_rate)
                    .name(format!(
                        "{}: {}/{} attempts",
                        r.route, r.successful_attempts, r.total_attempts
                    ))
                    .fill(success_color(r.success_rate))
            })
            .collect();
        let labels = routes.iter().rev().map(|r| r.route.clone()).collect();
        Plot::new("route_success")
            .height((n as f32 * 24.0).max(CHART_HEIGHT / 2.0))
            .include_x(0.0)
            .include_x(1.0)
            .x_axis_formatter(percent_axis)
            .y_axis_formatter(category_axis(labels))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).horizontal().width(0.7))
            });

        ui.push_id("route_table", |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::remainder().at_least(160.0))
                .columns(Column::auto(), 3)
                .header(20.0, |mut header| {
                    for title in ["Route", "Attempts", "Successes", "Success rate"] {
                        header.col(|ui| {
                            ui.strong(title);
                        });
                    }
                })
                .body(|mut body| {
                    for r in &routes {
                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(&r.route);
                            });
                            row.col(|ui| {
                                ui.label(r.total_attempts.to_string());
                            });
                            row.col(|ui| {
                                ui.label(r.successful_attempts.to_string());
                            });
                            row.col(|ui| {
                                ui.label(format!("{:.1}%", r.success_rate * 100.0));
                            });
                        });
                    }
                });
        });
    }

    ui.add_space(8.0);
    ui.heading("Comparison of Common Routes Across Peaks");
    let comparison = common_route_comparison(&ds.views.route_success, COMMON_ROUTES_SHOWN);
    if comparison.is_empty() {
        ui.label("Not enough route data for a cross-peak comparison.");
        return;
    }
    let mut peaks: Vec<&str> = comparison.iter().map(|r| r.peak_name.as_str()).collect();
    peaks.sort_unstable();
    peaks.dedup();
    let route_index: BTreeMap<&str, usize> = comparison
        .iter()
        .map(|r| r.route.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(i, r)| (r, i))
        .collect();
    // Routes share each peak's slot side by side.
    let slot = 0.8 / route_index.len().max(1) as f64;
    let mut by_route: BTreeMap<&str, Vec<Bar>> = BTreeMap::new();
    for r in &comparison {
        let Ok(p) = peaks.binary_search(&r.peak_name.as_str()) else {
            continue;
        };
        let x = p as f64 - 0.4 + slot * (route_index[r.route.as_str()] as f64 + 0.5);
        by_route.entry(r.route.as_str()).or_default().push(
            Bar::new(x, r.success_rate)
                .width(slot * 0.9)
                .name(format!("{} on {}: {} attempts", r.route, r.peak_name, r.total_attempts)),
        );
    }
    let colors = crate::color::generate_palette(by_route.len());
    let labels = peaks.iter().map(|p| p.to_string()).collect();
    Plot::new("common_routes")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .include_y(0.0)
        .include_y(1.0)
        .x_axis_formatter(category_axis(labels))
        .y_axis_formatter(percent_axis)
        .show(ui, |plot_ui| {
            for ((route, bars), color) in by_route.into_iter().zip(colors) {
                plot_ui.bar_chart(BarChart::new(bars).name(route).color(color));
            }
        });
}

// ---------------------------------------------------------------------------
// Countries
// ---------------------------------------------------------------------------

fn countries_tab(ui: &mut Ui, state: &AppState, ds: &Dataset, peak: &str, name: &str) {
    let view = &state.filtered_countries;

    ui.heading("Expeditions Led by Countries Over Time");
    if view.by_decade.is_empty() {
        ui.label("No host country data in the current year range.");
    } else {
        let decades: Vec<String> = view
            .by_decade
            .iter()
            .map(|r| r.decade.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut charts: Vec<BarChart> = Vec::new();
        for host in &view.top_countries {
            let bars: Vec<Bar> = view
                .by_decade
                .iter()
                .filter(|r| &r.host == host)
                .filter_map(|r| {
                    let x = decades.iter().position(|d| *d == r.decade)?;
                    Some(Bar::new(x as f64, r.count as f64).name(format!(
                        "{host}, {}: {} expeditions",
                        r.decade, r.count
                    )))
                })
                .collect();
            let color = state
                .country_colors
                .as_ref()
                .map_or(Color32::GRAY, |cm| cm.color_for(host));
            let mut chart = BarChart::new(bars).name(host).color(color).width(0.7);
            {
                let below: Vec<&BarChart> = charts.iter().collect();
                chart = chart.stack_on(&below);
            }
            charts.push(chart);
        }

        Plot::new("countries_by_decade")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .x_axis_formatter(category_axis(decades))
            .y_axis_label("Expeditions")
            .show(ui, |plot_ui| {
                for chart in charts {
                    plot_ui.bar_chart(chart);
                }
            });
    }

    ui.heading(format!("Top {PEAK_COUNTRIES_SHOWN} Countries Leading Expeditions to {name}"));
    let hosts = ds.views.countries.top_for_peak(peak, PEAK_COUNTRIES_SHOWN);
    if hosts.is_empty() {
        no_data(ui, "country", name);
        return;
    }
    let n = hosts.len();
    let bars: Vec<Bar> = hosts
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let color = state
                .country_colors
                .as_ref()
                .map_or(EXPEDITION_BLUE, |cm| cm.color_for(&r.host));
            Bar::new((n - 1 - i) as f64, r.count as f64)
                .name(format!("{}: {} expeditions", r.host, r.count))
                .fill(color)
        })
        .collect();
    let labels = hosts.iter().rev().map(|r| r.host.clone()).collect();
    Plot::new("peak_countries")
        .height(CHART_HEIGHT)
        .x_axis_label("Expeditions")
        .y_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().width(0.7))
        });
}

// ---------------------------------------------------------------------------
// Duration & Success
// ---------------------------------------------------------------------------

fn duration_tab(ui: &mut Ui, state: &AppState, ds: &Dataset, peak: &str, name: &str) {
    ui.heading(format!("Success Rate by Expedition Duration for {name}"));
    let rows = ds.views.duration.for_peak(peak, state.season());
    if rows.is_empty() {
        no_data(ui, "duration", name);
    } else {
        let mut by_season: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
        for r in &rows {
            by_season
                .entry(r.season.as_str())
                .or_default()
                .push([r.bucket.index() as f64, r.success_rate]);
        }
        let labels = DurationBucket::ALL.iter().map(|b| b.label().to_string()).collect();
        Plot::new("duration_success")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .include_y(0.0)
            .include_y(1.0)
            .x_axis_formatter(category_axis(labels))
            .y_axis_formatter(percent_axis)
            .show(ui, |plot_ui| {
                for (season, mut points) in by_season {
                    points.sort_by(|a, b| a[0].total_cmp(&b[0]));
                    let color = state
                        .season_colors
                        .as_ref()
                        .map_or(RATE_ORANGE, |cm| cm.color_for(season));
                    plot_ui.points(Points::new(points.clone()).radius(4.0).color(color));
                    plot_ui.line(Line::new(points).name(season).color(color).width(2.0));
                }
            });

        duration_histogram(ui, state, peak, name);
    }

    ui.heading("Duration and Success Rate Comparison Across Peaks");
    let comparison = &ds.views.duration_comparison;
    if comparison.is_empty() {
        ui.label("Not enough data available for cross-peak duration comparison.");
        return;
    }
    let mut peaks: Vec<&str> = comparison.iter().map(|r| r.peak_name.as_str()).collect();
    peaks.sort_unstable();
    peaks.dedup();
    let max_count = comparison.iter().map(|r| r.count).max().unwrap_or(1) as f32;
    let labels = peaks.iter().map(|p| p.to_string()).collect();
    Plot::new("duration_comparison")
        .height((peaks.len() as f32 * 22.0).max(CHART_HEIGHT))
        .legend(Legend::default())
        .x_axis_label("Average duration (days)")
        .y_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            for r in comparison {
                let Ok(y) = peaks.binary_search(&r.peak_name.as_str()) else {
                    continue;
                };
                let outcome = if r.any_success { "Success" } else { "No success" };
                plot_ui.points(
                    Points::new(vec![[r.avg_duration, y as f64]])
                        .radius(3.0 + 8.0 * (r.count as f32 / max_count).sqrt())
                        .color(outcome_color(r.any_success))
                        .name(outcome),
                );
            }
        });
}

/// Distribution of expedition lengths on the selected peak, split by outcome.
fn duration_histogram(ui: &mut Ui, state: &AppState, peak: &str, name: &str) {
    let mut bins: [BTreeMap<i64, usize>; 2] = Default::default();
    for rec in state
        .visible_records()
        .into_iter()
        .filter(|r| r.peak_id == peak)
    {
        if let Some(days) = rec.positive_days() {
            let bin = (days / DURATION_BIN_DAYS).floor() as i64;
            *bins[usize::from(rec.any_success)].entry(bin).or_default() += 1;
        }
    }
    if bins.iter().all(BTreeMap::is_empty) {
        return;
    }

    ui.label(RichText::new(format!("Distribution of Expedition Durations for {name}")).strong());
    let [failed, succeeded] = bins;
    let to_bars = |bins: BTreeMap<i64, usize>| -> Vec<Bar> {
        bins.into_iter()
            .map(|(bin, n)| {
                let lo = bin as f64 * DURATION_BIN_DAYS;
                Bar::new(lo + DURATION_BIN_DAYS / 2.0, n as f64)
                    .width(DURATION_BIN_DAYS * 0.95)
                    .name(format!("{lo:.0}-{:.0} days: {n}", lo + DURATION_BIN_DAYS))
            })
            .collect()
    };
    let success_chart = BarChart::new(to_bars(succeeded))
        .name("Success")
        .color(outcome_color(true));
    let failure_chart = BarChart::new(to_bars(failed))
        .name("No success")
        .color(outcome_color(false))
        .stack_on(&[&success_chart]);

    Plot::new("duration_histogram")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Expedition duration (days)")
        .y_axis_label("Expeditions")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(success_chart);
            plot_ui.bar_chart(failure_chart);
        });
}

// ---------------------------------------------------------------------------
// Termination Reasons
// ---------------------------------------------------------------------------

fn termination_tab(ui: &mut Ui, state: &AppState, ds: &Dataset, peak: &str, name: &str) {
    let view = &ds.views.termination;
    let reason_color = |reason: &str| {
        state
            .reason_colors
            .as_ref()
            .map_or(Color32::GRAY, |cm| cm.color_for(reason))
    };

    ui.heading(format!("Evolution of Termination Reasons for {name}"));
    let rows = view.for_peak(peak);
    if rows.is_empty() {
        no_data(ui, "termination", name);
    } else {
        let periods: Vec<String> = rows
            .iter()
            .map(|r| r.period.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut by_reason: BTreeMap<&str, Vec<&TerminationShare>> = BTreeMap::new();
        for r in &rows {
            by_reason.entry(r.reason.as_str()).or_default().push(*r);
        }

        let mut charts: Vec<BarChart> = Vec::new();
        for (&reason, shares) in &by_reason {
            let bars: Vec<Bar> = shares
                .iter()
                .filter_map(|s| {
                    let x = periods.iter().position(|p| *p == s.period)?;
                    Some(Bar::new(x as f64, s.percentage).name(format!(
                        "{}, {}: {:.1}% ({} of {})",
                        reason, s.period, s.percentage, s.count, s.total
                    )))
                })
                .collect();
            let mut chart = BarChart::new(bars)
                .name(reason)
                .color(reason_color(reason))
                .width(0.8);
            {
                let below: Vec<&BarChart> = charts.iter().collect();
                chart = chart.stack_on(&below);
            }
            charts.push(chart);
        }
        Plot::new("termination_share")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .include_y(100.0)
            .x_axis_formatter(category_axis(periods.clone()))
            .y_axis_label("Share of expeditions (%)")
            .show(ui, |plot_ui| {
                for chart in charts {
                    plot_ui.bar_chart(chart);
                }
            });

        ui.label(RichText::new("Trend of Specific Termination Reasons").strong());
        Plot::new("termination_trend")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .x_axis_formatter(category_axis(periods.clone()))
            .y_axis_label("Share of expeditions (%)")
            .show(ui, |plot_ui| {
                for (&reason, shares) in &by_reason {
                    let points: Vec<[f64; 2]> = shares
                        .iter()
                        .filter_map(|s| {
                            let x = periods.iter().position(|p| *p == s.period)?;
                            Some([x as f64, s.percentage])
                        })
                        .collect();
                    plot_ui.line(
                        Line::new(points)
                            .name(reason)
                            .color(reason_color(reason))
                            .width(3.0),
                    );
                }
            });

        ui.label(RichText::new(format!("Total Termination Reasons for {name}")).strong());
        let totals = view.reason_totals_for_peak(peak);
        let n = totals.len();
        let bars: Vec<Bar> = totals
            .iter()
            .enumerate()
            .map(|(i, (reason, count))| {
                Bar::new((n - 1 - i) as f64, *count as f64)
                    .name(format!("{reason}: {count} expeditions"))
                    .fill(reason_color(reason.as_str()))
            })
            .collect();
        let labels = totals.iter().rev().map(|(r, _)| r.clone()).collect();
        Plot::new("termination_totals")
            .height(CHART_HEIGHT)
            .x_axis_label("Expeditions")
            .y_axis_formatter(category_axis(labels))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).horizontal().width(0.7))
            });
    }

    ui.heading("Comparison of Termination Reasons Across Top Peaks");
    let comparison = view.comparison(&ds.merged.top_peaks, COMPARED_REASONS);
    if comparison.is_empty() {
        ui.label("Not enough termination data for a cross-peak comparison.");
        return;
    }
    let mut peaks: Vec<&str> = comparison.iter().map(|r| r.peak_name.as_str()).collect();
    peaks.sort_unstable();
    peaks.dedup();
    let mut by_reason: BTreeMap<&str, Vec<Bar>> = BTreeMap::new();
    for r in &comparison {
        let Ok(x) = peaks.binary_search(&r.peak_name.as_str()) else {
            continue;
        };
        by_reason.entry(r.reason.as_str()).or_default().push(
            Bar::new(x as f64, r.percentage)
                .name(format!("{} on {}: {:.1}%", r.reason, r.peak_name, r.percentage)),
        );
    }
    let mut charts: Vec<BarChart> = Vec::new();
    for (reason, bars) in by_reason {
        let mut chart = BarChart::new(bars)
            .name(reason)
            .color(reason_color(reason))
            .width(0.7);
        {
            let below: Vec<&BarChart> = charts.iter().collect();
            chart = chart.stack_on(&below);
        }
        charts.push(chart);
    }
    let labels = peaks.iter().map(|p| p.to_string()).collect();
    Plot::new("termination_comparison")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_formatter(category_axis(labels))
        .y_axis_label("Share of expeditions (%)")
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}
