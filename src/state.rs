use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::charts::{dashboard_charts, BackendKind, ChartBackend};
use crate::config::RuntimeConfig;
use crate::data::columns::{resolve_salary_column, COMPANY_SIZE, EXPERIENCE_LEVEL, JOB_TITLE};
use crate::data::filter::{apply, FilteredView, Predicate};
use crate::data::loader::{resolve_active, DataSource, LoadedDataset, Upload};
use crate::data::model::{Dataset, Value};
use crate::error::LoadError;
use crate::predictor::{train_baseline, TrainOutcome};
use crate::report::export_eda_report;

pub const PREVIEW_ROWS: usize = 50;
/// How many job titles the single-select offers.
pub const JOB_TITLE_CHOICES: usize = 50;
pub const DOWNLOAD_NAME: &str = "data_used.csv";

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// The two multiselect filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiFilter {
    ExperienceLevel,
    CompanySize,
}

impl MultiFilter {
    pub fn column(self) -> &'static str {
        match self {
            MultiFilter::ExperienceLevel => EXPERIENCE_LEVEL,
            MultiFilter::CompanySize => COMPANY_SIZE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MultiFilter::ExperienceLevel => "Experience level",
            MultiFilter::CompanySize => "Company size",
        }
    }
}

/// Values each filter widget offers, in first-seen order. Empty when the
/// column is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub experience_level: Vec<Value>,
    pub company_size: Vec<Value>,
    pub job_titles: Vec<Value>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let unique = |name: &str| {
            dataset
                .column(name)
                .map(|col| col.unique_values())
                .unwrap_or_default()
        };
        let mut job_titles = unique(JOB_TITLE);
        job_titles.truncate(JOB_TITLE_CHOICES);
        FilterOptions {
            experience_level: unique(EXPERIENCE_LEVEL),
            company_size: unique(COMPANY_SIZE),
            job_titles,
        }
    }

    pub fn values(&self, filter: MultiFilter) -> &[Value] {
        match filter {
            MultiFilter::ExperienceLevel => &self.experience_level,
            MultiFilter::CompanySize => &self.company_size,
        }
    }
}

/// Current filter widget values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub experience_level: BTreeSet<Value>,
    pub company_size: BTreeSet<Value>,
    /// `None` is the "(none)" choice.
    pub job_title: Option<Value>,
}

impl FilterSelection {
    pub fn selected(&self, filter: MultiFilter) -> &BTreeSet<Value> {
        match filter {
            MultiFilter::ExperienceLevel => &self.experience_level,
            MultiFilter::CompanySize => &self.company_size,
        }
    }

    fn selected_mut(&mut self, filter: MultiFilter) -> &mut BTreeSet<Value> {
        match filter {
            MultiFilter::ExperienceLevel => &mut self.experience_level,
            MultiFilter::CompanySize => &mut self.company_size,
        }
    }

    /// Predicates for the current widget values. A multiselect with nothing
    /// selected applies no predicate.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        for filter in [MultiFilter::ExperienceLevel, MultiFilter::CompanySize] {
            let values = self.selected(filter);
            if !values.is_empty() {
                predicates.push(Predicate::In {
                    column: filter.column().to_string(),
                    values: values.clone(),
                });
            }
        }
        if let Some(title) = &self.job_title {
            predicates.push(Predicate::Equals {
                column: JOB_TITLE.to_string(),
                value: title.clone(),
            });
        }
        predicates
    }
}

// ---------------------------------------------------------------------------
// Static chart cache
// ---------------------------------------------------------------------------

/// One dashboard chart rendered by the static backend.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub id: &'static str,
    pub heading: &'static str,
    /// Unique per filter generation so the image loader never serves a
    /// stale texture.
    pub uri: String,
    pub png: Result<Arc<[u8]>, String>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
pub struct AppState {
    pub config: RuntimeConfig,

    /// Active dataset (None when nothing could be loaded).
    pub loaded: Option<LoadedDataset>,

    /// Resolved salary column of the active dataset.
    pub salary_column: Option<&'static str>,

    pub options: FilterOptions,
    pub filters: FilterSelection,

    /// Rows passing the current filters.
    pub visible_rows: Vec<usize>,

    /// Bumped whenever `visible_rows` is recomputed.
    pub generation: u64,

    pub train_outcome: Option<TrainOutcome>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Result of the last report export.
    pub report_message: Option<String>,

    static_cache: Option<(u64, Vec<RenderedChart>)>,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            loaded: None,
            salary_column: None,
            options: FilterOptions::default(),
            filters: FilterSelection::default(),
            visible_rows: Vec::new(),
            generation: 0,
            train_outcome: None,
            status_message: None,
            report_message: None,
            static_cache: None,
        }
    }

    /// Load the upload if given and parseable, otherwise the default path.
    pub fn load_active(&mut self, upload: Option<Upload>) {
        let had_upload = upload.is_some();
        match resolve_active(upload, &self.config.settings.data_path) {
            Ok(loaded) => {
                let fell_back = had_upload && !matches!(loaded.source, DataSource::Upload { .. });
                self.set_loaded(loaded);
                if fell_back {
                    self.status_message =
                        Some("Could not parse the upload; showing the default dataset".into());
                }
            }
            Err(e) => {
                log::error!("Failed to load data: {e}");
                self.status_message = Some(format!("Could not load data: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset, reset filters and derived results.
    pub fn set_loaded(&mut self, loaded: LoadedDataset) {
        self.options = FilterOptions::from_dataset(&loaded.dataset);
        self.filters = FilterSelection::default();
        self.salary_column = resolve_salary_column(&loaded.dataset.column_names());
        if self.salary_column.is_none() {
            log::warn!("No salary column found; salary charts are skipped");
        }
        self.loaded = Some(loaded);
        self.train_outcome = None;
        self.status_message = None;
        self.refilter();
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.loaded.as_ref().map(|l| &l.dataset)
    }

    /// The filtered view for the current selection.
    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.dataset()
            .map(|ds| FilteredView::from_rows(ds, self.visible_rows.clone()))
    }

    /// Recompute `visible_rows` after a filter change.
    pub fn refilter(&mut self) {
        self.visible_rows = self
            .dataset()
            .map(|ds| apply(ds, &self.filters.predicates()).rows().to_vec())
            .unwrap_or_default();
        self.generation += 1;
    }

    /// Toggle a single value in a multiselect.
    pub fn toggle_filter_value(&mut self, filter: MultiFilter, value: &Value) {
        let selected = self.filters.selected_mut(filter);
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Empty a multiselect, which removes its filter.
    pub fn clear_filter(&mut self, filter: MultiFilter) {
        let selected = self.filters.selected_mut(filter);
        if !selected.is_empty() {
            selected.clear();
            self.refilter();
        }
    }

    pub fn set_job_title(&mut self, title: Option<Value>) {
        if self.filters.job_title != title {
            self.filters.job_title = title;
            self.refilter();
        }
    }

    /// Row indices shown in the preview table.
    pub fn preview_rows(&self) -> &[usize] {
        &self.visible_rows[..self.visible_rows.len().min(PREVIEW_ROWS)]
    }

    /// Bytes offered as [`DOWNLOAD_NAME`]: the whole active dataset.
    pub fn download_csv(&self) -> Option<Result<Cow<'_, [u8]>, LoadError>> {
        self.loaded.as_ref().map(LoadedDataset::csv_bytes)
    }

    /// The EDA report PDF, when one has been written.
    pub fn report_pdf(&self) -> Option<PathBuf> {
        let path = self.config.report_pdf();
        path.is_file().then_some(path)
    }

    /// Export the EDA report for the unfiltered dataset.
    pub fn generate_report(&mut self) {
        let Some(ds) = self.dataset() else {
            return;
        };
        let backend = self.config.raster_backend();
        let message = match export_eda_report(ds, self.config.output_dir(), &backend) {
            Ok(summary) => match summary.pdf {
                Some(pdf) => format!("EDA report written to {} ({} pages)", pdf.display(), summary.pages),
                None => format!("No charts in {}; no PDF written", self.config.output_dir().display()),
            },
            Err(e) => {
                log::error!("EDA export failed: {e}");
                format!("Error: {e}")
            }
        };
        self.report_message = Some(message);
    }

    /// Train the baseline on the unfiltered dataset.
    pub fn train(&mut self) {
        let Some(ds) = self.dataset() else {
            return;
        };
        let outcome = match self.salary_column {
            Some(salary) => train_baseline(ds, salary),
            None => TrainOutcome::Failed {
                message: "no salary column".into(),
            },
        };
        self.train_outcome = Some(outcome);
    }

    /// Dashboard charts drawn by the static backend, rendered at most once
    /// per filter generation.
    pub fn static_charts(&mut self) -> &[RenderedChart] {
        let fresh = matches!(&self.static_cache, Some((generation, _)) if *generation == self.generation);
        if !fresh {
            let rendered = self.render_static();
            self.static_cache = Some((self.generation, rendered));
        }
        match &self.static_cache {
            Some((_, charts)) => charts.as_slice(),
            None => &[],
        }
    }

    fn render_static(&self) -> Vec<RenderedChart> {
        let Some(view) = self.view() else {
            return Vec::new();
        };
        let mut backend = self.config.raster_backend();
        dashboard_charts(&view, self.salary_column, BackendKind::Static)
            .into_iter()
            .map(|named| RenderedChart {
                id: named.id,
                heading: named.heading,
                uri: format!("bytes://{}-{}.png", named.id, self.generation),
                png: backend
                    .draw(&named.chart)
                    .map(|img| Arc::from(img.png))
                    .map_err(|e| {
                        log::error!("Rendering {} failed: {e}", named.id);
                        e.to_string()
                    }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Capabilities, Settings};
    use crate::data::loader::parse_csv;

    const SAMPLE: &str = "\
experience_level,company_size,job_title,salary_in_usd
SE,L,Data Scientist,150
MI,M,Data Engineer,100
EN,S,Data Scientist,60
SE,M,ML Engineer,170
";

    fn state_with(dir: &std::path::Path) -> AppState {
        let default = dir.join("cleaned_data.csv");
        std::fs::write(&default, SAMPLE).unwrap();
        let settings = Settings {
            data_path: default,
            output_dir: dir.join("outputs"),
            ..Settings::default()
        };
        let capabilities = Capabilities::resolve(&settings, false, false);
        let mut state = AppState::new(RuntimeConfig {
            settings,
            capabilities,
        });
        state.load_active(None);
        state
    }

    #[test]
    fn loading_shows_every_row_unfiltered() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path());
        assert_eq!(state.visible_rows, vec![0, 1, 2, 3]);
        assert_eq!(state.salary_column, Some("salary_in_usd"));
        assert_eq!(state.options.experience_level.len(), 3);
        assert_eq!(state.filters, FilterSelection::default());
    }

    #[test]
    fn rows_with_missing_filter_columns_stay_visible_until_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with(dir.path());
        state.load_active(Some(Upload {
            name: "nulls.csv".into(),
            bytes: b"experience_level,company_size,salary_in_usd\nSE,L,100\nMI,,90\n,M,80\n".to_vec(),
        }));
        assert_eq!(state.visible_rows, vec![0, 1, 2]);

        state.toggle_filter_value(MultiFilter::CompanySize, &Value::Text("M".into()));
        assert_eq!(state.visible_rows, vec![2]);

        state.clear_filter(MultiFilter::CompanySize);
        assert_eq!(state.visible_rows, vec![0, 1, 2]);
    }

    #[test]
    fn toggling_filters_recomputes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with(dir.path());
        let before = state.generation;

        state.toggle_filter_value(MultiFilter::ExperienceLevel, &Value::Text("SE".into()));
        assert_eq!(state.visible_rows, vec![0, 3]);
        assert!(state.generation > before);

        state.set_job_title(Some(Value::Text("Data Scientist".into())));
        assert_eq!(state.visible_rows, vec![0]);

        state.set_job_title(None);
        state.toggle_filter_value(MultiFilter::ExperienceLevel, &Value::Text("SE".into()));
        assert_eq!(state.visible_rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_multiselect_applies_no_filter() {
        let selection = FilterSelection::default();
        assert!(selection.predicates().is_empty());
    }

    #[test]
    fn static_charts_are_cached_per_generation() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with(dir.path());

        let first: Vec<String> = state.static_charts().iter().map(|c| c.uri.clone()).collect();
        assert_eq!(first.len(), 3);
        let again: Vec<String> = state.static_charts().iter().map(|c| c.uri.clone()).collect();
        assert_eq!(first, again);

        state.toggle_filter_value(MultiFilter::CompanySize, &Value::Text("L".into()));
        let after: Vec<String> = state.static_charts().iter().map(|c| c.uri.clone()).collect();
        assert_ne!(first, after);
        assert!(state.static_charts().iter().all(|c| c.png.is_ok()));
    }

    #[test]
    fn download_parses_back_to_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path());
        let bytes = state.download_csv().unwrap().unwrap();
        assert_eq!(&parse_csv(&bytes).unwrap(), state.dataset().unwrap());
    }

    #[test]
    fn report_and_training_from_the_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with(dir.path());
        assert_eq!(state.report_pdf(), None);

        state.generate_report();
        assert!(state.report_pdf().is_some());
        assert!(state.report_message.as_deref().unwrap().starts_with("EDA report written"));

        state.train();
        assert!(matches!(state.train_outcome, Some(TrainOutcome::Trained(_))));
    }

    #[test]
    fn unparseable_upload_falls_back_with_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_with(dir.path());
        state.load_active(Some(Upload {
            name: "broken.csv".into(),
            bytes: b"a\n1,2\n".to_vec(),
        }));
        assert_eq!(state.dataset().unwrap().len(), 4);
        assert!(state.status_message.is_some());
    }
}
