//! The salary summary report: title, `describe()` table and the mean
//! salary per experience level.

use std::path::{Path, PathBuf};

use lopdf::content::Operation;
use serde::Serialize;

use super::pdf::{image_ops, text_ops, EmbeddedImage, Font, PdfWriter, A4, MM};
use crate::charts::raster::RasterBackend;
use crate::charts::{mean_salary_by_experience, ChartArtifact, ChartBackend};
use crate::data::columns::resolve_salary_column;
use crate::data::model::Dataset;
use crate::data::stats::describe;
use crate::error::ReportError;

pub const SUMMARY_DIR: &str = "output";
pub const DEFAULT_INPUT: &str = "dataset/data.csv";
pub const PLOT_FILE: &str = "salary_plot.png";
pub const REPORT_FILE: &str = "Job_Salaries_Report.pdf";
pub const TITLE: &str = "Data Science Job Salaries Report";

/// Plot figure size in pixels.
const PLOT_SIZE: (u32, u32) = (600, 400);
const MARGIN: f64 = 10.0 * MM;
const LINE: f64 = 10.0 * MM;
const MONO_LINE: f64 = 5.0 * MM;
const PLOT_WIDTH: f64 = 150.0 * MM;
const MONO_SIZE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    /// Absent when the dataset has no salary or experience column.
    pub plot: Option<PathBuf>,
    pub pdf: PathBuf,
    pub pages: usize,
}

/// Top-down page layout that starts a new A4 page when content would run
/// past the bottom margin.
struct Flow<'w> {
    writer: &'w mut PdfWriter,
    ops: Vec<Operation>,
    images: Vec<EmbeddedImage>,
    y: f64,
}

impl<'w> Flow<'w> {
    fn new(writer: &'w mut PdfWriter) -> Self {
        Flow {
            writer,
            ops: Vec::new(),
            images: Vec::new(),
            y: A4.1 - MARGIN,
        }
    }

    fn reserve(&mut self, height: f64) -> Result<(), ReportError> {
        if self.y - height < MARGIN && !self.ops.is_empty() {
            self.break_page()?;
        }
        Ok(())
    }

    fn break_page(&mut self) -> Result<(), ReportError> {
        let ops = std::mem::take(&mut self.ops);
        let images = std::mem::take(&mut self.images);
        self.writer.add_page(A4, ops, &images.iter().collect::<Vec<_>>())?;
        self.y = A4.1 - MARGIN;
        Ok(())
    }

    fn line(&mut self, font: Font, size: f64, height: f64, text: &str, centered: bool) -> Result<(), ReportError> {
        self.reserve(height)?;
        let x = if centered {
            ((A4.0 - font.text_width(text, size)) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };
        // Baseline sits near the bottom of the cell.
        let baseline = self.y - height + (height - size) / 2.0 + size * 0.2;
        self.ops.extend(text_ops(font, size, x, baseline, text));
        self.y -= height;
        Ok(())
    }

    fn gap(&mut self, height: f64) {
        self.y -= height;
    }

    fn image(&mut self, image: EmbeddedImage, width: f64) -> Result<(), ReportError> {
        let height = width * image.height as f64 / image.width.max(1) as f64;
        self.reserve(height)?;
        self.ops.extend(image_ops(&image, MARGIN, self.y - height, width, height));
        self.images.push(image);
        self.y -= height;
        Ok(())
    }

    fn finish(mut self) -> Result<(), ReportError> {
        if !self.ops.is_empty() {
            self.break_page()?;
        }
        Ok(())
    }
}

/// Split `line` into pieces of at most `width` characters.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width.max(1)).map(|c| c.iter().collect()).collect()
}

/// Write [`PLOT_FILE`] and [`REPORT_FILE`] into `out_dir`.
pub fn write_summary_report(
    dataset: &Dataset,
    out_dir: &Path,
    backend: &RasterBackend,
) -> Result<SummaryReport, ReportError> {
    std::fs::create_dir_all(out_dir).map_err(ReportError::io(out_dir))?;

    let plot = match resolve_salary_column(&dataset.column_names())
        .and_then(|salary| mean_salary_by_experience(dataset, salary))
    {
        Some(chart) => {
            let mut backend = backend.clone().with_size(PLOT_SIZE.0, PLOT_SIZE.1);
            let artifact = ChartArtifact {
                file_name: PLOT_FILE.to_string(),
                image: backend.bars(&chart)?,
            };
            Some((artifact.save(out_dir)?, artifact.image.png))
        }
        None => {
            log::warn!("No salary or experience_level column; summary has no plot");
            None
        }
    };

    let mut writer = PdfWriter::new();
    let mut flow = Flow::new(&mut writer);
    flow.line(Font::Bold, 16.0, LINE, TITLE, true)?;
    flow.gap(LINE);
    flow.line(Font::Regular, 12.0, LINE, "Summary Statistics:", false)?;
    let per_line = ((A4.0 - 2.0 * MARGIN) / Font::Mono.text_width("0", MONO_SIZE)) as usize;
    for row in describe(dataset).to_string().lines() {
        for chunk in wrap(row, per_line) {
            flow.line(Font::Mono, MONO_SIZE, MONO_LINE, &chunk, false)?;
        }
    }
    flow.gap(LINE);
    flow.line(Font::Regular, 12.0, LINE, "Plots:", false)?;
    if let Some((path, png)) = &plot {
        let image = flow.writer.embed_png(png).map_err(|source| ReportError::Image {
            path: path.clone(),
            source,
        })?;
        flow.image(image, PLOT_WIDTH)?;
    }
    flow.finish()?;

    let pdf = out_dir.join(REPORT_FILE);
    let pages = writer.save(&pdf)?;
    Ok(SummaryReport {
        plot: plot.map(|(path, _)| path),
        pdf,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    #[test]
    fn writes_plot_and_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let ds = parse_csv(b"experience_level,salary_in_usd\nSE,100\nEN,50\nSE,120\n").unwrap();
        let report = write_summary_report(&ds, dir.path(), &RasterBackend::new(false)).unwrap();

        assert_eq!(report.plot, Some(dir.path().join(PLOT_FILE)));
        assert!(report.pdf.exists());
        let doc = lopdf::Document::load(&report.pdf).unwrap();
        assert_eq!(doc.get_pages().len(), report.pages);
    }

    #[test]
    fn long_statistics_break_pages() {
        let dir = tempfile::tempdir().unwrap();
        let header: Vec<String> = (0..400).map(|i| format!("c{i}")).collect();
        let values = vec!["x"; 400];
        let csv = format!("{}\n{}\n", header.join(","), values.join(","));
        let ds = parse_csv(csv.as_bytes()).unwrap();

        let report = write_summary_report(&ds, dir.path(), &RasterBackend::new(false)).unwrap();
        assert_eq!(report.plot, None);
        assert!(report.pages >= 2);
    }

    #[test]
    fn wrap_splits_on_width() {
        assert_eq!(wrap("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap("", 4), vec![""]);
    }
}
