use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, FontTransform};

use super::{BackendKind, BarChart, BoxPlot, ChartBackend, Histogram, Orientation};
use crate::color::{ColorMap, Rgb, SERIES_FILL};
use crate::error::RenderError;

/// Figure size for single-variable charts.
pub const DEFAULT_SIZE: (u32, u32) = (800, 500);
/// Figure size for category bar charts in the report.
pub const WIDE_SIZE: (u32, u32) = (1000, 500);

/// Places a TrueType font is commonly installed.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Register a font for chart text. Tries `preferred` first, then the usual
/// system locations. Returns whether text can be drawn; the first call
/// decides for the whole process.
pub fn install_font(preferred: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            // plotters keeps registered fonts for the life of the process.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match plotters::style::register_font("sans-serif", FontStyle::Normal, bytes) {
                Ok(()) => {
                    log::info!("Chart font: {}", path.display());
                    return true;
                }
                Err(_) => log::warn!("{} is not a usable TrueType font", path.display()),
            }
        }
        log::warn!("No TrueType font found; static charts are drawn without text");
        false
    })
}

/// An encoded PNG and its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Encode a packed RGB buffer as PNG.
pub fn encode_png(width: u32, height: u32, rgb: Vec<u8>) -> Result<RasterImage, RenderError> {
    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or(RenderError::Buffer { width, height })?;
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)?;
    Ok(RasterImage {
        width,
        height,
        png: png.into_inner(),
    })
}

fn draw_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Draw(e.to_string())
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

/// Tick label for category index `x`; blank between categories.
pub(crate) fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Static backend
// ---------------------------------------------------------------------------

/// Draws charts into an in-memory bitmap and encodes them as PNG.
#[derive(Debug, Clone)]
pub struct RasterBackend {
    size: (u32, u32),
    labels: bool,
}

impl RasterBackend {
    /// `labels` says whether a font is available for titles and ticks.
    pub fn new(labels: bool) -> Self {
        RasterBackend {
            size: DEFAULT_SIZE,
            labels,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    fn render<F>(&self, draw: F) -> Result<RasterImage, RenderError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), RenderError>,
    {
        let (width, height) = self.size;
        let mut buf = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            draw(&root)?;
            root.present().map_err(draw_err)?;
        }
        encode_png(width, height, buf)
    }
}

impl ChartBackend for RasterBackend {
    type Output = RasterImage;

    fn kind(&self) -> BackendKind {
        BackendKind::Static
    }

    fn histogram(&mut self, chart: &Histogram) -> Result<RasterImage, RenderError> {
        let (lo, hi) = chart.range();
        let y_max = (chart.max_count() as f64 * 1.05).max(1.0);
        let labels = self.labels;

        self.render(|root| {
            let mut builder = ChartBuilder::on(root);
            builder.margin(15);
            if labels {
                builder
                    .caption(&chart.title, ("sans-serif", 22))
                    .x_label_area_size(40)
                    .y_label_area_size(60);
            }
            let mut ctx = builder
                .build_cartesian_2d(lo..hi, 0f64..y_max)
                .map_err(draw_err)?;
            if labels {
                ctx.configure_mesh()
                    .disable_x_mesh()
                    .x_desc(chart.x_label.as_str())
                    .y_desc(chart.y_label.as_str())
                    .draw()
                    .map_err(draw_err)?;
            }

            let fill = rgb(SERIES_FILL).filled();
            ctx.draw_series(chart.counts.iter().enumerate().map(|(i, &count)| {
                Rectangle::new(
                    [(chart.edges[i], 0.0), (chart.edges[i + 1], count as f64)],
                    fill,
                )
            }))
            .map_err(draw_err)?;
            ctx.draw_series(chart.counts.iter().enumerate().map(|(i, &count)| {
                Rectangle::new(
                    [(chart.edges[i], 0.0), (chart.edges[i + 1], count as f64)],
                    WHITE.stroke_width(1),
                )
            }))
            .map_err(draw_err)?;
            Ok(())
        })
    }

    fn box_plot(&mut self, chart: &BoxPlot) -> Result<RasterImage, RenderError> {
        let n = chart.groups.len().max(1);
        let (lo, hi) = chart.extent().unwrap_or((0.0, 1.0));
        let pad = ((hi - lo) * 0.05).max(0.5);
        let names: Vec<String> = chart.groups.iter().map(|g| g.label.clone()).collect();
        let colors = ColorMap::new(names.iter().map(String::as_str));
        let labels = self.labels;

        self.render(|root| {
            let mut builder = ChartBuilder::on(root);
            builder.margin(15);
            if labels {
                builder
                    .caption(&chart.title, ("sans-serif", 22))
                    .x_label_area_size(40)
                    .y_label_area_size(70);
            }
            let mut ctx = builder
                .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), (lo - pad)..(hi + pad))
                .map_err(draw_err)?;
            if labels {
                let fmt = |x: &f64| category_label(&names, *x);
                ctx.configure_mesh()
                    .disable_x_mesh()
                    .x_labels(n)
                    .x_label_formatter(&fmt)
                    .x_desc(chart.x_label.as_str())
                    .y_desc(chart.y_label.as_str())
                    .draw()
                    .map_err(draw_err)?;
            }

            for (i, group) in chart.groups.iter().enumerate() {
                let x = i as f64;
                let s = &group.stats;
                let color = rgb(colors.color_for(&group.label));

                ctx.draw_series([
                    Rectangle::new([(x - 0.3, s.q1), (x + 0.3, s.q3)], color.mix(0.5).filled()),
                    Rectangle::new([(x - 0.3, s.q1), (x + 0.3, s.q3)], color.stroke_width(2)),
                ])
                .map_err(draw_err)?;

                ctx.draw_series([
                    PathElement::new(vec![(x - 0.3, s.median), (x + 0.3, s.median)], BLACK.stroke_width(2)),
                    PathElement::new(vec![(x, s.q3), (x, s.upper_whisker)], BLACK.stroke_width(1)),
                    PathElement::new(vec![(x, s.q1), (x, s.lower_whisker)], BLACK.stroke_width(1)),
                    PathElement::new(
                        vec![(x - 0.15, s.upper_whisker), (x + 0.15, s.upper_whisker)],
                        BLACK.stroke_width(1),
                    ),
                    PathElement::new(
                        vec![(x - 0.15, s.lower_whisker), (x + 0.15, s.lower_whisker)],
                        BLACK.stroke_width(1),
                    ),
                ])
                .map_err(draw_err)?;

                ctx.draw_series(
                    s.outliers
                        .iter()
                        .map(|&v| Circle::new((x, v), 3, BLACK.stroke_width(1))),
                )
                .map_err(draw_err)?;
            }
            Ok(())
        })
    }

    fn bars(&mut self, chart: &BarChart) -> Result<RasterImage, RenderError> {
        let n = chart.bars.len().max(1);
        let v_max = (chart.max_value() * 1.05).max(1.0);
        let names: Vec<String> = chart.bars.iter().map(|b| b.label.clone()).collect();
        let labels = self.labels;
        let fill = rgb(SERIES_FILL).filled();
        let categories = -0.5f64..(n as f64 - 0.5);

        self.render(|root| {
            let mut builder = ChartBuilder::on(root);
            builder.margin(15);
            if labels {
                builder.caption(&chart.title, ("sans-serif", 22));
                match (chart.orientation, chart.rotate_labels) {
                    (Orientation::Horizontal, _) => builder.x_label_area_size(40).y_label_area_size(200),
                    (Orientation::Vertical, true) => builder.x_label_area_size(160).y_label_area_size(60),
                    (Orientation::Vertical, false) => builder.x_label_area_size(40).y_label_area_size(60),
                };
            }
            let fmt = |x: &f64| category_label(&names, *x);

            match chart.orientation {
                Orientation::Vertical => {
                    let mut ctx = builder
                        .build_cartesian_2d(categories.clone(), 0f64..v_max)
                        .map_err(draw_err)?;
                    if labels {
                        let mut mesh = ctx.configure_mesh();
                        mesh.disable_x_mesh()
                            .x_labels(n)
                            .x_label_formatter(&fmt)
                            .y_desc(chart.value_label.as_str());
                        if chart.rotate_labels {
                            mesh.x_label_style(
                                ("sans-serif", 12).into_font().transform(FontTransform::Rotate90),
                            );
                        }
                        mesh.draw().map_err(draw_err)?;
                    }
                    ctx.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
                        let x = i as f64;
                        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, bar.value)], fill)
                    }))
                    .map_err(draw_err)?;
                }
                Orientation::Horizontal => {
                    let mut ctx = builder
                        .build_cartesian_2d(0f64..v_max, categories.clone())
                        .map_err(draw_err)?;
                    if labels {
                        ctx.configure_mesh()
                            .disable_y_mesh()
                            .y_labels(n)
                            .y_label_formatter(&fmt)
                            .x_desc(chart.value_label.as_str())
                            .draw()
                            .map_err(draw_err)?;
                    }
                    ctx.draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
                        let y = i as f64;
                        Rectangle::new([(0.0, y - 0.4), (bar.value, y + 0.4)], fill)
                    }))
                    .map_err(draw_err)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{Bar, BoxStats, BoxGroup, HISTOGRAM_BINS};

    fn decode(img: &RasterImage) -> image::DynamicImage {
        image::load_from_memory(&img.png).unwrap()
    }

    #[test]
    fn histogram_renders_png_of_requested_size() {
        let h = Histogram::from_values(&[3.0; 8], HISTOGRAM_BINS).titled("t", "x");
        let img = RasterBackend::new(false).histogram(&h).unwrap();
        assert_eq!((img.width, img.height), DEFAULT_SIZE);
        let decoded = decode(&img);
        assert_eq!((decoded.width(), decoded.height()), DEFAULT_SIZE);
    }

    #[test]
    fn wide_bars_render() {
        let chart = BarChart {
            title: "Count of job_title".into(),
            value_label: "Count".into(),
            orientation: Orientation::Vertical,
            rotate_labels: true,
            bars: vec![
                Bar { label: "A".into(), value: 3.0 },
                Bar { label: "B".into(), value: 1.0 },
            ],
        };
        let mut backend = RasterBackend::new(false).with_size(WIDE_SIZE.0, WIDE_SIZE.1);
        let img = backend.bars(&chart).unwrap();
        assert_eq!(decode(&img).width(), WIDE_SIZE.0);
    }

    #[test]
    fn empty_charts_still_render() {
        let bars = BarChart {
            title: String::new(),
            value_label: String::new(),
            orientation: Orientation::Horizontal,
            rotate_labels: false,
            bars: Vec::new(),
        };
        assert!(RasterBackend::new(false).bars(&bars).is_ok());

        let boxes = BoxPlot {
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            groups: vec![BoxGroup {
                label: "SE".into(),
                stats: BoxStats::from_values(&[7.0]).unwrap(),
            }],
        };
        assert!(RasterBackend::new(false).box_plot(&boxes).is_ok());
    }

    #[test]
    fn category_labels_only_on_integers() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&labels, 1.0), "b");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 5.0), "");
    }
}
