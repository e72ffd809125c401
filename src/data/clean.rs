//! Cleaning and joining of the raw input tables.

use std::collections::HashMap;

use super::model::{
    is_missing_token, ranked_counts, CellValue, Coordinates, MergedData, MergedRecord, PeakInfo,
    RawInputs, RawTable, ROUTE_SLOTS,
};
use crate::error::{DashError, Result};

/// A peak needs this many expeditions to appear in the peak selector.
pub const TOP_PEAK_MIN_EXPEDITIONS: usize = 30;

/// Decade label, e.g. 1953 → `"1950s"`.
pub fn decade_label(year: i32) -> String {
    format!("{}s", i64::from(year).div_euclid(10) * 10)
}

/// Five-year period label, e.g. 1953 → `"1950-1954"`.
pub fn period_label(year: i32) -> String {
    let start = i64::from(year).div_euclid(5) * 5;
    format!("{}-{}", start, start + 4)
}

/// Resolved column positions of the expedition table.
struct ExpeditionColumns {
    exp_id: usize,
    peak_id: usize,
    year: usize,
    season: usize,
    routes: [usize; ROUTE_SLOTS],
    successes: [usize; ROUTE_SLOTS],
    total_days: usize,
    host: usize,
    term_reason: usize,
}

fn column(table: &RawTable, table_name: &str, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| DashError::MissingColumn {
            table: table_name.to_string(),
            column: name.to_string(),
        })
}

impl ExpeditionColumns {
    fn resolve(table: &RawTable) -> Result<Self> {
        let col = |name: &str| column(table, "expeditions", name);
        let mut routes = [0; ROUTE_SLOTS];
        let mut successes = [0; ROUTE_SLOTS];
        for slot in 0..ROUTE_SLOTS {
            routes[slot] = col(&format!("ROUTE{}", slot + 1))?;
            successes[slot] = col(&format!("SUCCESS{}", slot + 1))?;
        }
        Ok(ExpeditionColumns {
            exp_id: col("EXPID")?,
            peak_id: col("PEAKID")?,
            year: col("YEAR")?,
            season: col("SEASON_FACTOR")?,
            routes,
            successes,
            total_days: col("TOTDAYS")?,
            host: col("HOST_FACTOR")?,
            term_reason: col("TERMREASON_FACTOR")?,
        })
    }
}

/// Route labels: the `NA` sentinel and blank text mean "no route".
fn route_value(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Text(s) if s.trim().is_empty() || is_missing_token(s) => None,
        other => other.as_text(),
    }
}

/// Numeric years only; fractional years are floored.
fn year_value(cell: &CellValue) -> Option<i32> {
    let y = cell.as_f64()?.floor();
    (y >= f64::from(i32::MIN) && y <= f64::from(i32::MAX)).then_some(y as i32)
}

/// Index the peaks table by id. The first row wins on duplicate ids.
fn index_peaks(peaks: &RawTable) -> Result<HashMap<String, PeakInfo>> {
    let id = column(peaks, "peaks", "PEAKID")?;
    let name = column(peaks, "peaks", "PKNAME")?;
    let height = column(peaks, "peaks", "HEIGHTM")?;
    let himal = column(peaks, "peaks", "HIMAL_FACTOR")?;
    let region = column(peaks, "peaks", "REGION_FACTOR")?;

    let mut index = HashMap::with_capacity(peaks.len());
    for row in 0..peaks.len() {
        let Some(peak_id) = peaks.cell(row, id).as_text() else {
            continue;
        };
        if index.contains_key(&peak_id) {
            log::warn!("Duplicate peak id {peak_id} in peaks table; keeping the first row");
            continue;
        }
        index.insert(
            peak_id,
            PeakInfo {
                name: peaks.cell(row, name).as_text(),
                height_m: peaks.cell(row, height).as_f64(),
                himal: peaks.cell(row, himal).as_text(),
                region: peaks.cell(row, region).as_text(),
            },
        );
    }
    Ok(index)
}

/// Index the coordinates table by id. Rows without both numbers are skipped.
fn index_coordinates(coords: &RawTable) -> Result<HashMap<String, Coordinates>> {
    let id = column(coords, "coordinates", "PEAKID")?;
    let lat = column(coords, "coordinates", "LATITUDE")?;
    let lon = column(coords, "coordinates", "LONGITUDE")?;

    let mut index = HashMap::with_capacity(coords.len());
    for row in 0..coords.len() {
        let Some(peak_id) = coords.cell(row, id).as_text() else {
            continue;
        };
        let (Some(latitude), Some(longitude)) =
            (coords.cell(row, lat).as_f64(), coords.cell(row, lon).as_f64())
        else {
            continue;
        };
        if index.contains_key(&peak_id) {
            log::warn!("Duplicate peak id {peak_id} in coordinates table; keeping the first row");
            continue;
        }
        index.insert(
            peak_id,
            Coordinates {
                latitude,
                longitude,
            },
        );
    }
    Ok(index)
}

/// Clean the expedition table, join peak metadata and coordinates, and find
/// the top peaks.
///
/// Records without a peak id or a numeric year are dropped; every other
/// coercion failure becomes a missing value on the record.
pub fn clean_and_merge(inputs: &RawInputs) -> Result<MergedData> {
    let exped = &inputs.expeditions;
    let cols = ExpeditionColumns::resolve(exped)?;
    let peaks = index_peaks(&inputs.peaks)?;
    let coords = index_coordinates(&inputs.coordinates)?;

    let mut records = Vec::with_capacity(exped.len());
    let mut dropped = 0usize;

    for row in 0..exped.len() {
        let cell = |col: usize| exped.cell(row, col);

        let routes: [Option<String>; ROUTE_SLOTS] =
            std::array::from_fn(|slot| route_value(cell(cols.routes[slot])));
        let successes: [bool; ROUTE_SLOTS] =
            std::array::from_fn(|slot| cell(cols.successes[slot]).as_flag());
        let total_days = cell(cols.total_days).as_f64();

        let (Some(peak_id), Some(year)) = (cell(cols.peak_id).as_text(), year_value(cell(cols.year)))
        else {
            dropped += 1;
            continue;
        };

        let any_success = successes.iter().any(|&s| s);

        records.push(MergedRecord {
            exp_id: cell(cols.exp_id).as_text(),
            year,
            season: cell(cols.season).as_text(),
            routes,
            successes,
            total_days,
            host: cell(cols.host).as_text(),
            term_reason: cell(cols.term_reason).as_text(),
            any_success,
            peak: peaks.get(&peak_id).cloned(),
            coords: coords.get(&peak_id).copied(),
            decade: decade_label(year),
            period: period_label(year),
            peak_id,
        });
    }

    if dropped > 0 {
        log::warn!("Dropped {dropped} expeditions without a peak id or numeric year");
    }

    let top_peaks = top_peaks(&records);
    log::info!(
        "Merged {} expeditions; {} peaks have at least {} expeditions",
        records.len(),
        top_peaks.len(),
        TOP_PEAK_MIN_EXPEDITIONS
    );

    Ok(MergedData { records, top_peaks })
}

/// Peak ids with at least [`TOP_PEAK_MIN_EXPEDITIONS`] records, most frequent first.
pub fn top_peaks(records: &[MergedRecord]) -> Vec<String> {
    ranked_counts(records.iter().map(|r| r.peak_id.as_str()))
        .into_iter()
        .filter(|(_, n)| *n >= TOP_PEAK_MIN_EXPEDITIONS)
        .map(|(id, _)| id)
        .collect()
}
