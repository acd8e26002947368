use eframe::egui::{self, Color32, Stroke, Ui};
use egui_plot::{
    Bar as PlotBar, BarChart as PlotBarChart, BoxElem, BoxPlot as PlotBoxPlot, BoxSpread, GridMark,
    Plot, PlotPoints, Points,
};

use crate::charts::raster::category_label;
use crate::charts::{
    dashboard_charts, BackendKind, BarChart, BoxPlot, ChartBackend, Histogram, Orientation,
};
use crate::color::{ColorMap, Rgb, SERIES_FILL};
use crate::error::RenderError;
use crate::state::AppState;

const PLOT_HEIGHT: f32 = 320.0;

fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}

fn tick_formatter(labels: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| category_label(&labels, mark.value)
}

// ---------------------------------------------------------------------------
// Interactive backend
// ---------------------------------------------------------------------------

/// Draws charts as zoomable `egui_plot` plots into a `Ui`.
pub struct EguiBackend<'a> {
    ui: &'a mut Ui,
}

impl<'a> EguiBackend<'a> {
    pub fn new(ui: &'a mut Ui) -> Self {
        EguiBackend { ui }
    }
}

impl ChartBackend for EguiBackend<'_> {
    type Output = ();

    fn kind(&self) -> BackendKind {
        BackendKind::Interactive
    }

    fn histogram(&mut self, chart: &Histogram) -> Result<(), RenderError> {
        let bars: Vec<PlotBar> = chart
            .counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let (lo, hi) = (chart.edges[i], chart.edges[i + 1]);
                PlotBar::new((lo + hi) / 2.0, count as f64)
                    .width(hi - lo)
                    .stroke(Stroke::new(1.0, Color32::WHITE))
            })
            .collect();

        Plot::new(("histogram", &chart.title))
            .height(PLOT_HEIGHT)
            .x_axis_label(chart.x_label.as_str())
            .y_axis_label(chart.y_label.as_str())
            .allow_scroll(false)
            .show(&mut *self.ui, |plot_ui| {
                plot_ui.bar_chart(
                    PlotBarChart::new(bars)
                        .color(color32(SERIES_FILL))
                        .name(chart.title.as_str()),
                );
            });
        Ok(())
    }

    fn box_plot(&mut self, chart: &BoxPlot) -> Result<(), RenderError> {
        let labels: Vec<String> = chart.groups.iter().map(|g| g.label.clone()).collect();
        let colors = ColorMap::new(labels.iter().map(String::as_str));

        let elems: Vec<BoxElem> = chart
            .groups
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let s = &group.stats;
                let color = color32(colors.color_for(&group.label));
                BoxElem::new(
                    i as f64,
                    BoxSpread::new(s.lower_whisker, s.q1, s.median, s.q3, s.upper_whisker),
                )
                .name(group.label.as_str())
                .box_width(0.6)
                .whisker_width(0.3)
                .fill(color.gamma_multiply(0.5))
                .stroke(Stroke::new(1.5, color))
            })
            .collect();

        let outliers: PlotPoints = chart
            .groups
            .iter()
            .enumerate()
            .flat_map(|(i, g)| g.stats.outliers.iter().map(move |&v| [i as f64, v]))
            .collect();

        Plot::new(("box", &chart.title))
            .height(PLOT_HEIGHT)
            .x_axis_label(chart.x_label.as_str())
            .y_axis_label(chart.y_label.as_str())
            .x_axis_formatter(tick_formatter(labels))
            .allow_scroll(false)
            .show(&mut *self.ui, |plot_ui| {
                plot_ui.box_plot(PlotBoxPlot::new(elems).name(chart.title.as_str()));
                plot_ui.points(Points::new(outliers).radius(3.0).color(Color32::GRAY));
            });
        Ok(())
    }

    fn bars(&mut self, chart: &BarChart) -> Result<(), RenderError> {
        let labels: Vec<String> = chart.bars.iter().map(|b| b.label.clone()).collect();
        let bars: Vec<PlotBar> = chart
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| PlotBar::new(i as f64, bar.value).name(bar.label.as_str()).width(0.8))
            .collect();

        let mut series = PlotBarChart::new(bars)
            .color(color32(SERIES_FILL))
            .name(chart.title.as_str());
        let plot = Plot::new(("bars", &chart.title))
            .height(PLOT_HEIGHT)
            .allow_scroll(false);
        let plot = match chart.orientation {
            Orientation::Horizontal => {
                series = series.horizontal();
                plot.x_axis_label(chart.value_label.as_str())
                    .y_axis_formatter(tick_formatter(labels))
                    .y_axis_min_width(160.0)
            }
            Orientation::Vertical => plot
                .y_axis_label(chart.value_label.as_str())
                .x_axis_formatter(tick_formatter(labels)),
        };

        plot.show(&mut *self.ui, |plot_ui| plot_ui.bar_chart(series));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Charts section (central panel)
// ---------------------------------------------------------------------------

/// Render the dashboard charts with the probed backend.
pub fn charts_section(ui: &mut Ui, state: &mut AppState) {
    if state.salary_column.is_none() {
        ui.label("No salary column found (expected salary_in_usd or salary).");
    }

    match state.config.capabilities.charts {
        BackendKind::Interactive => {
            let Some(view) = state.view() else {
                return;
            };
            let charts = dashboard_charts(&view, state.salary_column, BackendKind::Interactive);
            let mut backend = EguiBackend::new(ui);
            for named in &charts {
                backend.ui.heading(named.heading);
                if let Err(e) = backend.draw(&named.chart) {
                    backend.ui.colored_label(Color32::RED, e.to_string());
                }
                backend.ui.add_space(8.0);
            }
        }
        BackendKind::Static => {
            let width = ui.available_width();
            for chart in state.static_charts() {
                ui.heading(chart.heading);
                match &chart.png {
                    Ok(png) => {
                        ui.add(egui::Image::from_bytes(chart.uri.clone(), png.clone()).max_width(width));
                    }
                    Err(e) => {
                        ui.colored_label(Color32::RED, e);
                    }
                }
                ui.add_space(8.0);
            }
        }
    }
}
