use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{CellValue, RawInputs, RawTable};
use crate::error::{DashError, Result};

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "input_data";

pub const EXPEDITIONS_FILE: &str = "exped_tidy.csv";
pub const PEAKS_FILE: &str = "peaks_tidy.csv";
pub const COORDINATES_FILE: &str = "unique_peaks_coords.csv";

/// Columns the cleaning stage reads from each table.
pub const EXPEDITION_COLUMNS: &[&str] = &[
    "EXPID",
    "PEAKID",
    "YEAR",
    "SEASON_FACTOR",
    "ROUTE1",
    "ROUTE2",
    "ROUTE3",
    "ROUTE4",
    "SUCCESS1",
    "SUCCESS2",
    "SUCCESS3",
    "SUCCESS4",
    "TOTDAYS",
    "HOST_FACTOR",
    "TERMREASON_FACTOR",
];
pub const PEAK_COLUMNS: &[&str] = &["PEAKID", "PKNAME", "HEIGHTM", "HIMAL_FACTOR", "REGION_FACTOR"];
pub const COORDINATE_COLUMNS: &[&str] = &["PEAKID", "LATITUDE", "LONGITUDE"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the three dashboard tables from `dir`.
pub fn load_inputs(dir: &Path) -> Result<RawInputs> {
    let expeditions = load_required(dir, EXPEDITIONS_FILE, EXPEDITION_COLUMNS)?;
    let peaks = load_required(dir, PEAKS_FILE, PEAK_COLUMNS)?;
    let coordinates = load_required(dir, COORDINATES_FILE, COORDINATE_COLUMNS)?;

    log::info!(
        "Loaded {} expeditions, {} peaks, {} coordinate rows from {}",
        expeditions.len(),
        peaks.len(),
        coordinates.len(),
        dir.display()
    );

    Ok(RawInputs {
        expeditions,
        peaks,
        coordinates,
    })
}

fn load_required(dir: &Path, file: &str, required: &[&str]) -> Result<RawTable> {
    let table = load_table(&dir.join(file))?;
    for column in required {
        if table.column_index(column).is_none() {
            return Err(DashError::MissingColumn {
                table: file.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(table)
}

/// Load a single table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one record per line
/// * `.parquet` – flat columns of strings, ints, floats or bools
pub fn load_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        _ => Err(DashError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Memoized loading
// ---------------------------------------------------------------------------

/// Keeps loaded inputs per data directory so repeated loads share one table.
#[derive(Debug, Default)]
pub struct InputCache {
    loaded: HashMap<PathBuf, Arc<RawInputs>>,
}

impl InputCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached inputs for `dir`, reading the files on first use.
    pub fn load(&mut self, dir: &Path) -> Result<Arc<RawInputs>> {
        if let Some(inputs) = self.loaded.get(dir) {
            log::debug!("Input cache hit for {}", dir.display());
            return Ok(Arc::clone(inputs));
        }
        let inputs = Arc::new(load_inputs(dir)?);
        self.loaded.insert(dir.to_path_buf(), Arc::clone(&inputs));
        Ok(inputs)
    }

    /// Forget `dir` so the next `load` rereads its files.
    pub fn invalidate(&mut self, dir: &Path) {
        self.loaded.remove(dir);
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| DashError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DashError::parse(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(DashError::parse(path, "missing header row"));
    }

    let mut table = RawTable::new(headers);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DashError::parse(path, format!("row {row_no}: {e}")))?;
        table
            .rows
            .push(record.iter().map(CellValue::from_token).collect());
    }

    Ok(table)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas (`df.to_parquet()`) or Polars.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).map_err(|source| DashError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| DashError::parse(path, e))?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().map_err(|e| DashError::parse(path, e))?;

    let mut table = RawTable::new(columns);
    for batch_result in reader {
        let batch = batch_result.map_err(|e| DashError::parse(path, e))?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col.as_ref(), row))
                .collect();
            table.rows.push(cells);
        }
    }

    Ok(table)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &dyn Array, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| CellValue::Text(a.value(row).to_string()))
            .unwrap_or(CellValue::Null),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row))))
            .unwrap_or(CellValue::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(f64::from(a.value(row))))
            .unwrap_or(CellValue::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row)))
            .unwrap_or(CellValue::Null),
        // Dictionary-encoded factors and anything else go through Arrow's formatter.
        _ => match array_value_to_string(col, row) {
            Ok(s) => CellValue::from_token(&s),
            Err(_) => CellValue::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(name)).expect("create fixture");
        f.write_all(body.as_bytes()).expect("write fixture");
    }

    fn write_minimal_inputs(dir: &Path) {
        write(
            dir,
            EXPEDITIONS_FILE,
            "EXPID,PEAKID,YEAR,SEASON_FACTOR,ROUTE1,ROUTE2,ROUTE3,ROUTE4,SUCCESS1,SUCCESS2,SUCCESS3,SUCCESS4,TOTDAYS,HOST_FACTOR,TERMREASON_FACTOR\n\
             E1,EVER,1953,Spring,S Col-SE Ridge,NA,NA,NA,TRUE,FALSE,FALSE,FALSE,60,Nepal,Success (main peak)\n",
        );
        write(
            dir,
            PEAKS_FILE,
            "PEAKID,PKNAME,HEIGHTM,HIMAL_FACTOR,REGION_FACTOR\nEVER,Everest,8849,Khumbu,Khumbu-Rolwaling-Makalu\n",
        );
        write(dir, COORDINATES_FILE, "PEAKID,LATITUDE,LONGITUDE\nEVER,27.98,86.92\n");
    }

    #[test]
    fn csv_cells_are_typed() {
        let dir = TempDir::new().expect("temp dir");
        write_minimal_inputs(dir.path());

        let table = load_table(&dir.path().join(EXPEDITIONS_FILE)).expect("load csv");
        assert_eq!(table.len(), 1);
        let year = table.column_index("YEAR").unwrap();
        let route2 = table.column_index("ROUTE2").unwrap();
        let success1 = table.column_index("SUCCESS1").unwrap();
        assert_eq!(table.cell(0, year), &CellValue::Integer(1953));
        assert_eq!(table.cell(0, route2), &CellValue::Null);
        assert_eq!(table.cell(0, success1), &CellValue::Bool(true));
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let dir = TempDir::new().expect("temp dir");
        let err = load_inputs(dir.path()).unwrap_err();
        assert!(matches!(err, DashError::FileAccess { .. }), "{err}");
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        write_minimal_inputs(dir.path());
        write(dir.path(), COORDINATES_FILE, "PEAKID,LATITUDE\nEVER,27.98\n");

        let err = load_inputs(dir.path()).unwrap_err();
        match err {
            DashError::MissingColumn { table, column } => {
                assert_eq!(table, COORDINATES_FILE);
                assert_eq!(column, "LONGITUDE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let dir = TempDir::new().expect("temp dir");
        write(dir.path(), "bad.csv", "A,B\n1,2\n3\n");
        let err = load_table(&dir.path().join("bad.csv")).unwrap_err();
        assert!(matches!(err, DashError::Parse { .. }), "{err}");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_table(Path::new("peaks.xlsx")).unwrap_err();
        assert!(matches!(err, DashError::UnsupportedFormat { .. }));
    }

    #[test]
    fn cache_returns_the_same_tables() {
        let dir = TempDir::new().expect("temp dir");
        write_minimal_inputs(dir.path());

        let mut cache = InputCache::new();
        let first = cache.load(dir.path()).expect("first load");
        let second = cache.load(dir.path()).expect("second load");
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate(dir.path());
        let third = cache.load(dir.path()).expect("reload");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }
}
