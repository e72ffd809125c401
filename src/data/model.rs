use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a raw input table
// ---------------------------------------------------------------------------

/// Tokens a data-frame CSV reader treats as "not available".
const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>",
    "#N/A", "#NA",
];

/// Whether a raw text token stands for a missing value.
pub fn is_missing_token(s: &str) -> bool {
    NA_TOKENS.contains(&s.trim())
}

/// A dynamically-typed cell as read from a CSV or Parquet file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord/Hash so raw tables can be fingerprinted and sorted --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn rank(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Infer a cell from raw CSV text.
    pub fn from_token(s: &str) -> CellValue {
        if is_missing_token(s) {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        CellValue::Text(s.to_string())
    }

    /// Numeric coercion: anything that is not a finite number becomes `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Truthiness of a success flag. Missing values count as `false`.
    pub fn as_flag(&self) -> bool {
        match self {
            CellValue::Bool(b) => *b,
            CellValue::Integer(i) => *i != 0,
            CellValue::Float(f) => *f != 0.0 && !f.is_nan(),
            CellValue::Text(s) => {
                let s = s.trim();
                !(s.is_empty()
                    || is_missing_token(s)
                    || s.eq_ignore_ascii_case("false")
                    || s.eq_ignore_ascii_case("f")
                    || s.eq_ignore_ascii_case("no")
                    || s == "0")
            }
            CellValue::Null => false,
        }
    }

    /// Text form used for identifiers and category labels.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Float(f) if f.is_nan() => None,
            CellValue::Text(s) if is_missing_token(s) => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – one input file, columns inferred from the header
// ---------------------------------------------------------------------------

/// A loaded table: ordered column names plus rows of cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        RawTable {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, col), treating short rows as null-padded.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL)
    }
}

/// The three input tables of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawInputs {
    pub expeditions: RawTable,
    pub peaks: RawTable,
    pub coordinates: RawTable,
}

// ---------------------------------------------------------------------------
// Cleaned and merged records
// ---------------------------------------------------------------------------

/// Number of (route, success) slots carried by each expedition row.
pub const ROUTE_SLOTS: usize = 4;

/// Peak metadata joined onto an expedition.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PeakInfo {
    pub name: Option<String>,
    pub height_m: Option<f64>,
    pub himal: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One route slot of an expedition, in relational form.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt<'a> {
    pub slot: usize,
    pub route: &'a str,
    pub success: bool,
}

/// An expedition after cleaning, joined with its peak and coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub exp_id: Option<String>,
    pub peak_id: String,
    pub year: i32,
    pub season: Option<String>,
    pub routes: [Option<String>; ROUTE_SLOTS],
    pub successes: [bool; ROUTE_SLOTS],
    pub total_days: Option<f64>,
    pub host: Option<String>,
    pub term_reason: Option<String>,
    pub any_success: bool,
    /// `None` when the peak id has no row in the peaks table.
    pub peak: Option<PeakInfo>,
    pub coords: Option<Coordinates>,
    pub decade: String,
    pub period: String,
}

impl MergedRecord {
    pub fn peak_name(&self) -> Option<&str> {
        self.peak.as_ref().and_then(|p| p.name.as_deref())
    }

    pub fn height_m(&self) -> Option<f64> {
        self.peak.as_ref().and_then(|p| p.height_m)
    }

    /// Route slots that carry a route, with their success flag.
    pub fn attempts(&self) -> impl Iterator<Item = Attempt<'_>> + '_ {
        self.routes
            .iter()
            .zip(self.successes.iter())
            .enumerate()
            .filter_map(|(i, (route, &success))| {
                route.as_deref().map(|route| Attempt {
                    slot: i + 1,
                    route,
                    success,
                })
            })
    }

    /// Known, strictly positive expedition length in days.
    pub fn positive_days(&self) -> Option<f64> {
        self.total_days.filter(|d| *d > 0.0)
    }
}

/// Output of the cleaning stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedData {
    pub records: Vec<MergedRecord>,
    /// Peak ids with enough expeditions for the peak selector, most frequent first.
    pub top_peaks: Vec<String>,
}

impl MergedData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Name of a peak as shown in the selector: `"{id} - {name}"`.
    pub fn peak_label(&self, peak_id: &str) -> String {
        let name = self
            .records
            .iter()
            .find(|r| r.peak_id == peak_id)
            .and_then(|r| r.peak_name());
        match name {
            Some(name) => format!("{peak_id} - {name}"),
            None => peak_id.to_string(),
        }
    }
}

/// Count occurrences and rank them: count descending, then key ascending.
pub fn ranked_counts<'a, I>(keys: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for k in keys {
        *counts.entry(k).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    // BTreeMap iteration is key-ascending, so a stable sort keeps that for ties.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_inference_matches_csv_conventions() {
        assert_eq!(CellValue::from_token("NA"), CellValue::Null);
        assert_eq!(CellValue::from_token(""), CellValue::Null);
        assert_eq!(CellValue::from_token("1953"), CellValue::Integer(1953));
        assert_eq!(CellValue::from_token("27.98"), CellValue::Float(27.98));
        assert_eq!(CellValue::from_token("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::from_token("False"), CellValue::Bool(false));
        assert_eq!(
            CellValue::from_token("S Col-SE Ridge"),
            CellValue::Text("S Col-SE Ridge".into())
        );
    }

    #[test]
    fn numeric_coercion_never_fails() {
        assert_eq!(CellValue::Text(" 42 ".into()).as_f64(), Some(42.0));
        assert_eq!(CellValue::Text("unknown".into()).as_f64(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn flags_default_to_false() {
        assert!(!CellValue::Null.as_flag());
        assert!(!CellValue::Text("FALSE".into()).as_flag());
        assert!(CellValue::Bool(true).as_flag());
        assert!(CellValue::Integer(1).as_flag());
    }

    #[test]
    fn ranked_counts_breaks_ties_by_name() {
        let ranked = ranked_counts(["b", "a", "c", "c", "b"]);
        assert_eq!(
            ranked,
            vec![("b".into(), 2), ("c".into(), 2), ("a".into(), 1)]
        );
    }

    #[test]
    fn attempts_skip_empty_slots() {
        let rec = MergedRecord {
            exp_id: Some("EVER53101".into()),
            peak_id: "EVER".into(),
            year: 1953,
            season: Some("Spring".into()),
            routes: [Some("S Col-SE Ridge".into()), None, Some("W Ridge".into()), None],
            successes: [true, false, false, false],
            total_days: Some(60.0),
            host: Some("Nepal".into()),
            term_reason: None,
            any_success: true,
            peak: None,
            coords: None,
            decade: "1950s".into(),
            period: "1950-1954".into(),
        };
        let slots: Vec<_> = rec.attempts().map(|a| (a.slot, a.route, a.success)).collect();
        assert_eq!(
            slots,
            vec![(1, "S Col-SE Ridge", true), (3, "W Ridge", false)]
        );
    }
}
