use std::path::PathBuf;
use std::sync::Arc;

use himalaya_dash::data::filter::{
    filtered_indices, observed_seasons, select, year_bounds, year_filtered_indices, FilterState,
    SeasonFilter,
};
use himalaya_dash::data::model::MergedRecord;
use himalaya_dash::views::countries::{prepare_country_data, CountryView};
use himalaya_dash::{Dataset, Pipeline};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Routes,
    Countries,
    Duration,
    Termination,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::Routes,
        Tab::Countries,
        Tab::Duration,
        Tab::Termination,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Routes => "Routes & Success",
            Tab::Countries => "Countries",
            Tab::Duration => "Duration & Success",
            Tab::Termination => "Termination Reasons",
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Directory holding the three input tables.
    pub data_dir: PathBuf,

    pipeline: Pipeline,

    /// Processed tables and cached views (None until loaded).
    pub dataset: Option<Arc<Dataset>>,

    /// Top peaks with their selector labels.
    pub peak_options: Vec<(String, String)>,

    /// Seasons offered by the season selector (without "All").
    pub seasons: Vec<String>,

    /// Smallest and largest year in the data.
    pub year_limits: (i32, i32),

    pub selected_peak: Option<String>,

    /// Year range and season selection.
    pub filters: FilterState,

    /// Indices of records inside the year range (cached).
    pub year_indices: Vec<usize>,

    /// Indices of records inside the year range and season (cached).
    pub visible_indices: Vec<usize>,

    /// Country view recomputed on the year-filtered records.
    pub filtered_countries: CountryView,

    pub country_colors: Option<ColorMap>,
    pub reason_colors: Option<ColorMap>,
    pub season_colors: Option<ColorMap>,

    pub active_tab: Tab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, pipeline: Pipeline) -> Self {
        Self {
            data_dir,
            pipeline,
            dataset: None,
            peak_options: Vec::new(),
            seasons: Vec::new(),
            year_limits: (0, 0),
            selected_peak: None,
            filters: FilterState {
                year_range: (0, 0),
                season: SeasonFilter::All,
            },
            year_indices: Vec::new(),
            visible_indices: Vec::new(),
            filtered_countries: CountryView::default(),
            country_colors: None,
            reason_colors: None,
            season_colors: None,
            active_tab: Tab::default(),
            status_message: None,
        }
    }

    /// Load `data_dir` through the pipeline. Errors leave the current dataset
    /// untouched.
    pub fn load(&mut self) -> himalaya_dash::Result<()> {
        let dataset = self.pipeline.open(&self.data_dir)?;
        self.set_dataset(dataset);
        Ok(())
    }

    /// Reread the files of `data_dir`, reporting failures in the status line.
    pub fn reload(&mut self) {
        match self.pipeline.reload(&self.data_dir) {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to reload {}: {e}", self.data_dir.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Switch to another data directory.
    pub fn open_dir(&mut self, dir: PathBuf) {
        let previous = std::mem::replace(&mut self.data_dir, dir);
        if let Err(e) = self.load() {
            log::error!("Failed to load {}: {e}", self.data_dir.display());
            self.status_message = Some(format!("Error: {e}"));
            self.data_dir = previous;
        }
    }

    /// Ingest a processed dataset, initialise selectors, filters and colours.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        let merged = &dataset.merged;
        log::info!(
            "Dashboard ready: {} expeditions, {} top peaks",
            merged.len(),
            merged.top_peaks.len()
        );

        self.peak_options = merged
            .top_peaks
            .iter()
            .map(|id| (id.clone(), merged.peak_label(id)))
            .collect();
        self.seasons = observed_seasons(&merged.records);
        self.year_limits = year_bounds(&merged.records).unwrap_or((0, 0));
        self.filters = FilterState::full(&merged.records);

        // Keep the selected peak across reloads when it still qualifies.
        let keep = self
            .selected_peak
            .as_ref()
            .is_some_and(|p| merged.top_peaks.contains(p));
        if !keep {
            self.selected_peak = merged.top_peaks.first().cloned();
        }

        self.reason_colors = Some(ColorMap::new(
            &dataset
                .views
                .termination
                .reason_ranking
                .iter()
                .map(|(r, _)| r.as_str())
                .collect::<Vec<_>>(),
        ));
        self.season_colors = Some(ColorMap::new(&self.seasons));

        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the filtered indices and filtered views after a change.
    pub fn refilter(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let records = &ds.merged.records;
        self.year_indices = year_filtered_indices(records, &self.filters);
        self.visible_indices = filtered_indices(records, &self.filters);
        self.filtered_countries = prepare_country_data(select(records, &self.year_indices));
        self.country_colors = Some(ColorMap::new(&self.filtered_countries.top_countries));
    }

    pub fn select_peak(&mut self, peak_id: String) {
        self.selected_peak = Some(peak_id);
    }

    /// Set the year range; the bounds are clamped to the data and ordered.
    pub fn set_year_range(&mut self, from: i32, to: i32) {
        let (min, max) = self.year_limits;
        let from = from.clamp(min, max);
        let to = to.clamp(min, max);
        self.filters.year_range = (from.min(to), from.max(to));
        self.refilter();
    }

    pub fn set_season(&mut self, season: SeasonFilter) {
        self.filters.season = season;
        self.refilter();
    }

    /// Selected season, or `None` for "All".
    pub fn season(&self) -> Option<&str> {
        match &self.filters.season {
            SeasonFilter::All => None,
            SeasonFilter::Only(s) => Some(s),
        }
    }

    /// Records inside the year range.
    pub fn year_records(&self) -> Vec<&MergedRecord> {
        match &self.dataset {
            Some(ds) => select(&ds.merged.records, &self.year_indices),
            None => Vec::new(),
        }
    }

    /// Records inside the year range and season.
    pub fn visible_records(&self) -> Vec<&MergedRecord> {
        match &self.dataset {
            Some(ds) => select(&ds.merged.records, &self.visible_indices),
            None => Vec::new(),
        }
    }

    /// Display name of the selected peak.
    pub fn selected_peak_name(&self) -> String {
        let Some(peak) = &self.selected_peak else {
            return String::new();
        };
        self.dataset
            .as_ref()
            .and_then(|ds| ds.merged.records.iter().find(|r| &r.peak_id == peak))
            .and_then(|r| r.peak_name())
            .map(str::to_string)
            .unwrap_or_else(|| peak.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use himalaya_dash::data::model::{CellValue, RawInputs, RawTable};

    fn table(columns: &[&str], rows: Vec<Vec<String>>) -> RawTable {
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| CellValue::from_token(c)).collect())
                .collect(),
        }
    }

    fn dataset() -> Arc<Dataset> {
        let mut rows = Vec::new();
        for i in 0..40 {
            let (peak, season) = if i < 32 { ("EVER", "Spring") } else { ("AMAD", "Autumn") };
            let year = 1980 + i;
            rows.push(
                [
                    format!("E{i}"),
                    peak.into(),
                    year.to_string(),
                    season.into(),
                    "S Col".into(),
                    String::new(),
                    String::new(),
                    String::new(),
                    (i % 2 == 0).to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    "45".into(),
                    if i % 3 == 0 { "Nepal" } else { "USA" }.into(),
                    "Bad weather".into(),
                ]
                .to_vec(),
            );
        }
        let inputs = RawInputs {
            expeditions: table(himalaya_dash::data::loader::EXPEDITION_COLUMNS, rows),
            peaks: table(
                himalaya_dash::data::loader::PEAK_COLUMNS,
                vec![
                    vec!["EVER".into(), "Everest".into(), "8849".into(), "Khumbu".into(), "Khumbu".into()],
                    vec!["AMAD".into(), "Ama Dablam".into(), "6814".into(), "Khumbu".into(), "Khumbu".into()],
                ],
            ),
            coordinates: table(himalaya_dash::data::loader::COORDINATE_COLUMNS, Vec::new()),
        };
        Arc::new(Dataset::build(&inputs).expect("dataset"))
    }

    fn state() -> AppState {
        let mut state = AppState::new(PathBuf::from("input_data"), Pipeline::new());
        state.set_dataset(dataset());
        state
    }

    #[test]
    fn dataset_initialises_selectors() {
        let state = state();
        assert_eq!(state.selected_peak.as_deref(), Some("EVER"));
        assert_eq!(state.peak_options, vec![("EVER".to_string(), "EVER - Everest".to_string())]);
        assert_eq!(state.seasons, vec!["Autumn", "Spring"]);
        assert_eq!(state.year_limits, (1980, 2019));
        assert_eq!(state.visible_indices.len(), 40);
        assert_eq!(state.selected_peak_name(), "Everest");
    }

    #[test]
    fn filters_narrow_visible_records() {
        let mut state = state();
        state.set_year_range(2015, 1990);
        assert_eq!(state.filters.year_range, (1990, 2015));
        assert_eq!(state.year_indices.len(), 26);

        state.set_season(SeasonFilter::Only("Autumn".into()));
        assert!(state.visible_records().iter().all(|r| r.season.as_deref() == Some("Autumn")));
        assert_eq!(state.visible_indices.len(), 4);
        assert_eq!(state.season(), Some("Autumn"));
        // The season selector only narrows the duration views.
        assert_eq!(state.year_records().len(), 26);

        state.set_year_range(1000, 3000);
        assert_eq!(state.filters.year_range, (1980, 2019));
    }

    #[test]
    fn filtered_countries_follow_the_year_range() {
        let mut state = state();
        let all: usize = state.filtered_countries.by_decade.iter().map(|r| r.count).sum();
        assert_eq!(all, 40);

        state.set_year_range(1980, 1989);
        let decade: usize = state.filtered_countries.by_decade.iter().map(|r| r.count).sum();
        assert_eq!(decade, 10);
        assert!(state.country_colors.is_some());
    }
}
