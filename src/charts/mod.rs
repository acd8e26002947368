//! Chart data and the backends that draw it.
//!
//! Every chart is first reduced to plain data ([`Histogram`], [`BoxPlot`],
//! [`BarChart`]) from a [`FilteredView`] or a column. A [`ChartBackend`] then
//! draws that data: the interactive `egui_plot` backend inside the dashboard
//! or the static [`raster::RasterBackend`] that produces PNG bytes.

pub mod raster;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::data::columns::{EXPERIENCE_LEVEL, JOB_TITLE};
use crate::data::filter::FilteredView;
use crate::data::model::{Column, Dataset, Value};
use crate::data::stats::{self, group_means, value_counts};
use crate::error::{RenderError, ReportError};
use raster::RasterImage;

pub const HISTOGRAM_BINS: usize = 30;
pub const TOP_JOB_TITLES: usize = 10;
pub const REPORT_TOP_CATEGORIES: usize = 20;

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Which family of backend draws charts for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Zoomable plots drawn by the dashboard.
    Interactive,
    /// PNG images.
    Static,
}

impl BackendKind {
    /// Box-plot group order each backend uses.
    pub fn group_order(self) -> GroupOrder {
        match self {
            BackendKind::Static => GroupOrder::FirstSeen,
            BackendKind::Interactive => GroupOrder::Sorted,
        }
    }
}

/// Draws chart data. `Output` is whatever the backend produces per chart:
/// nothing for on-screen plots, an encoded image for raster output.
pub trait ChartBackend {
    type Output;

    fn kind(&self) -> BackendKind;

    fn histogram(&mut self, chart: &Histogram) -> Result<Self::Output, RenderError>;

    fn box_plot(&mut self, chart: &BoxPlot) -> Result<Self::Output, RenderError>;

    fn bars(&mut self, chart: &BarChart) -> Result<Self::Output, RenderError>;

    fn draw(&mut self, chart: &Chart) -> Result<Self::Output, RenderError> {
        match chart {
            Chart::Histogram(h) => self.histogram(h),
            Chart::Box(b) => self.box_plot(b),
            Chart::Bars(b) => self.bars(b),
        }
    }
}

/// A rendered image tagged with the file name it is saved under.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub file_name: String,
    pub image: RasterImage,
}

impl ChartArtifact {
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.image.png).map_err(ReportError::io(&path))?;
        log::debug!("Saved {}", path.display());
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Histogram(Histogram),
    Box(BoxPlot),
    Bars(BarChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Histogram(h) => &h.title,
            Chart::Box(b) => &b.title,
            Chart::Bars(b) => &b.title,
        }
    }
}

/// Equal-width bins over the value range. `edges` has one more entry than
/// `counts`; every bin is half-open except the last.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bin `values` into `bins` buckets. Non-finite values are ignored. A
    /// single repeated value is centred in `[v - 0.5, v + 0.5]`; no values
    /// give the range `[0, 1]`.
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let (mut lo, mut hi) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if finite.is_empty() {
            (lo, hi) = (0.0, 1.0);
        } else if lo == hi {
            (lo, hi) = (lo - 0.5, hi + 0.5);
        }

        let width = (hi - lo) / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| lo + width * i as f64).collect();
        edges.push(hi);

        let mut counts = vec![0u64; bins];
        for v in finite {
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Histogram {
            title: String::new(),
            x_label: String::new(),
            y_label: "Count".into(),
            edges,
            counts,
        }
    }

    pub fn titled(mut self, title: impl Into<String>, x_label: impl Into<String>) -> Self {
        self.title = title.into();
        self.x_label = x_label.into();
        self
    }

    pub fn range(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Five-number summary with 1.5·IQR whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` when there are no values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = stats::sorted(values);
        let q1 = stats::quantile(&sorted, 0.25)?;
        let median = stats::quantile(&sorted, 0.5)?;
        let q3 = stats::quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = || sorted.iter().copied().filter(|v| *v >= lo_fence && *v <= hi_fence);
        let lower_whisker = inside().next().unwrap_or(q1);
        let upper_whisker = inside().last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < lo_fence || *v > hi_fence)
            .collect();

        Some(BoxStats {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
            outliers,
        })
    }

    /// Smallest and largest drawn value, outliers included.
    pub fn extent(&self) -> (f64, f64) {
        self.outliers.iter().fold(
            (self.lower_whisker, self.upper_whisker),
            |(lo, hi), &v| (lo.min(v), hi.max(v)),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub stats: BoxStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    /// Order in which group values first appear in the data.
    FirstSeen,
    /// Ascending by group value.
    Sorted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub groups: Vec<BoxGroup>,
}

impl BoxPlot {
    /// One box per distinct non-null `group_column` value, over the numeric
    /// cells of `value_column`. `None` if either column is absent.
    pub fn grouped(
        view: &FilteredView<'_>,
        value_column: &str,
        group_column: &str,
        order: GroupOrder,
    ) -> Option<Self> {
        let groups_col = view.column(group_column)?;
        let values_col = view.column(value_column)?;

        let mut order_seen: Vec<&Value> = Vec::new();
        let mut buckets: HashMap<&Value, Vec<f64>> = HashMap::new();
        for &row in view.rows() {
            let group = &groups_col.cells[row];
            let Some(v) = values_col.cells[row].as_f64() else {
                continue;
            };
            if group.is_null() {
                continue;
            }
            buckets
                .entry(group)
                .or_insert_with(|| {
                    order_seen.push(group);
                    Vec::new()
                })
                .push(v);
        }

        if order == GroupOrder::Sorted {
            order_seen.sort();
        }

        let groups = order_seen
            .into_iter()
            .filter_map(|g| {
                let stats = BoxStats::from_values(buckets.get(g)?)?;
                Some(BoxGroup {
                    label: g.to_string(),
                    stats,
                })
            })
            .collect();

        Some(BoxPlot {
            title: String::new(),
            x_label: group_column.to_string(),
            y_label: value_column.to_string(),
            groups,
        })
    }

    /// Smallest and largest drawn value across all groups.
    pub fn extent(&self) -> Option<(f64, f64)> {
        self.groups
            .iter()
            .map(|g| g.stats.extent())
            .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// Bars in drawing order: left to right, or bottom to top when horizontal.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub value_label: String,
    pub orientation: Orientation,
    pub rotate_labels: bool,
    pub bars: Vec<Bar>,
}

impl BarChart {
    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|b| b.value).fold(0.0, f64::max)
    }
}

fn top_counts<'v>(cells: impl IntoIterator<Item = &'v Value>, n: usize) -> Vec<Bar> {
    value_counts(cells)
        .into_iter()
        .take(n)
        .map(|(v, count)| Bar {
            label: v.to_string(),
            value: count as f64,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dashboard charts
// ---------------------------------------------------------------------------

/// 30-bin histogram of the salary column within the view.
pub fn salary_histogram(view: &FilteredView<'_>, salary_column: &str) -> Histogram {
    Histogram::from_values(&view.numeric_values(salary_column), HISTOGRAM_BINS)
        .titled("Salary Distribution (USD)", "Salary (USD)")
}

/// Salary boxes per experience level; `None` without an experience column.
pub fn salary_by_experience(
    view: &FilteredView<'_>,
    salary_column: &str,
    order: GroupOrder,
) -> Option<BoxPlot> {
    let mut plot = BoxPlot::grouped(view, salary_column, EXPERIENCE_LEVEL, order)?;
    plot.title = "Salary by Experience Level".into();
    plot.y_label = "Salary (USD)".into();
    Some(plot)
}

/// The ten most frequent job titles, reversed so the most frequent is
/// drawn last (at the top of a horizontal chart).
pub fn top_job_titles(view: &FilteredView<'_>) -> Option<BarChart> {
    let cells = view.cells(JOB_TITLE)?;
    let mut bars = top_counts(cells, TOP_JOB_TITLES);
    bars.reverse();
    Some(BarChart {
        title: "Top 10 Job Titles (by count)".into(),
        value_label: "Count".into(),
        orientation: Orientation::Horizontal,
        rotate_labels: false,
        bars,
    })
}

/// A chart the dashboard shows, with a stable id and section heading.
#[derive(Debug, Clone)]
pub struct NamedChart {
    pub id: &'static str,
    pub heading: &'static str,
    pub chart: Chart,
}

/// Every dashboard chart that applies to the view. Salary charts need a
/// resolved salary column; the box plot also needs `experience_level`;
/// the bar chart needs `job_title`.
pub fn dashboard_charts(
    view: &FilteredView<'_>,
    salary_column: Option<&str>,
    kind: BackendKind,
) -> Vec<NamedChart> {
    let mut charts = Vec::new();
    if let Some(salary) = salary_column {
        charts.push(NamedChart {
            id: "salary_distribution",
            heading: "Salary Distribution",
            chart: Chart::Histogram(salary_histogram(view, salary)),
        });
        if let Some(plot) = salary_by_experience(view, salary, kind.group_order()) {
            charts.push(NamedChart {
                id: "salary_by_experience",
                heading: "Salary by Experience Level",
                chart: Chart::Box(plot),
            });
        }
    }
    if let Some(bars) = top_job_titles(view) {
        charts.push(NamedChart {
            id: "top_job_titles",
            heading: "Top 10 Job Titles (by count)",
            chart: Chart::Bars(bars),
        });
    }
    charts
}

// ---------------------------------------------------------------------------
// Report charts
// ---------------------------------------------------------------------------

/// 30-bin histogram of one numeric column.
pub fn column_distribution(column: &Column) -> Histogram {
    Histogram::from_values(&column.numeric_values(), HISTOGRAM_BINS)
        .titled(format!("Distribution of {}", column.name), column.name.clone())
}

/// Top-20 value counts of one categorical column, labels rotated.
pub fn column_countplot(column: &Column) -> BarChart {
    BarChart {
        title: format!("Count of {}", column.name),
        value_label: "Count".into(),
        orientation: Orientation::Vertical,
        rotate_labels: true,
        bars: top_counts(&column.cells, REPORT_TOP_CATEGORIES),
    }
}

/// Mean salary per experience level, levels sorted.
pub fn mean_salary_by_experience(dataset: &Dataset, salary_column: &str) -> Option<BarChart> {
    dataset.column(EXPERIENCE_LEVEL)?;
    let bars = group_means(dataset, EXPERIENCE_LEVEL, salary_column)
        .into_iter()
        .map(|(level, mean)| Bar {
            label: level.to_string(),
            value: mean,
        })
        .collect();
    Some(BarChart {
        title: "Average Salary by Experience Level".into(),
        value_label: "Salary".into(),
        orientation: Orientation::Vertical,
        rotate_labels: false,
        bars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    fn labels(chart: &BarChart) -> Vec<&str> {
        chart.bars.iter().map(|b| b.label.as_str()).collect()
    }

    #[test]
    fn identical_values_still_make_thirty_bins() {
        let h = Histogram::from_values(&[5.0; 12], HISTOGRAM_BINS);
        assert_eq!(h.counts.len(), 30);
        assert_eq!(h.edges.len(), 31);
        assert_eq!(h.range(), (4.5, 5.5));
        assert_eq!(h.counts.iter().sum::<u64>(), 12);
    }

    #[test]
    fn empty_histogram_uses_unit_range() {
        let h = Histogram::from_values(&[], HISTOGRAM_BINS);
        assert_eq!(h.counts, vec![0; 30]);
        assert_eq!(h.range(), (0.0, 1.0));
    }

    #[test]
    fn maximum_lands_in_last_bin() {
        let h = Histogram::from_values(&[0.0, 1.0, 2.0, 3.0], 3);
        assert_eq!(h.counts, vec![1, 1, 2]);
    }

    #[test]
    fn top_titles_reverse_counts_and_keep_tie_order() {
        let mut csv = String::from("job_title\n");
        for (title, n) in [("A", 5), ("B", 5), ("C", 3)] {
            for _ in 0..n {
                csv.push_str(title);
                csv.push('\n');
            }
        }
        let ds = parse_csv(csv.as_bytes()).unwrap();
        let chart = top_job_titles(&FilteredView::all(&ds)).unwrap();
        assert_eq!(labels(&chart), ["C", "B", "A"]);
        assert_eq!(chart.bars[2].value, 5.0);
        assert_eq!(chart.orientation, Orientation::Horizontal);
    }

    #[test]
    fn top_titles_keep_only_ten() {
        let mut csv = String::from("job_title\n");
        for i in 0..15 {
            csv.push_str(&format!("T{i}\n"));
        }
        let ds = parse_csv(csv.as_bytes()).unwrap();
        let chart = top_job_titles(&FilteredView::all(&ds)).unwrap();
        assert_eq!(chart.bars.len(), 10);
        assert_eq!(chart.bars.last().unwrap().label, "T0");
    }

    #[test]
    fn box_groups_follow_requested_order() {
        let ds = parse_csv(
            b"experience_level,salary_in_usd\nSE,100\nEN,40\nMI,70\nSE,120\nEN,\n",
        )
        .unwrap();
        let view = FilteredView::all(&ds);

        let seen = salary_by_experience(&view, "salary_in_usd", GroupOrder::FirstSeen).unwrap();
        let names: Vec<&str> = seen.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(names, ["SE", "EN", "MI"]);

        let sorted = salary_by_experience(&view, "salary_in_usd", GroupOrder::Sorted).unwrap();
        let names: Vec<&str> = sorted.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(names, ["EN", "MI", "SE"]);
        assert_eq!(sorted.groups[2].stats.median, 110.0);
    }

    #[test]
    fn box_stats_flag_outliers() {
        let stats = BoxStats::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.upper_whisker, 4.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.extent(), (1.0, 100.0));
    }

    #[test]
    fn dashboard_skips_salary_charts_without_salary_column() {
        let ds = parse_csv(b"job_title,experience_level\nA,SE\n").unwrap();
        let charts = dashboard_charts(&FilteredView::all(&ds), None, BackendKind::Static);
        let ids: Vec<&str> = charts.iter().map(|c| c.id).collect();
        assert_eq!(ids, ["top_job_titles"]);
    }

    #[test]
    fn countplot_keeps_twenty_categories() {
        let mut csv = String::from("company_location\n");
        for i in 0..25 {
            for _ in 0..(25 - i) {
                csv.push_str(&format!("L{i}\n"));
            }
        }
        let ds = parse_csv(csv.as_bytes()).unwrap();
        let chart = column_countplot(ds.column("company_location").unwrap());
        assert_eq!(chart.bars.len(), 20);
        assert_eq!(chart.bars[0].label, "L0");
        assert!(chart.rotate_labels);
    }
}
