//! Static report output.
//!
//! ```text
//! Dataset ──► one PNG per column ──► every *.png in the dir ──► EDA_report.pdf
//! ```
//!
//! The PDF is rebuilt from whatever PNGs the directory holds, so leftovers
//! from earlier runs are included. Nothing is cleaned up.

pub mod pdf;
pub mod summary;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::charts::raster::{RasterBackend, DEFAULT_SIZE, WIDE_SIZE};
use crate::charts::{column_countplot, column_distribution, ChartArtifact, ChartBackend};
use crate::data::model::{ColumnKind, Dataset};
use crate::error::ReportError;
use pdf::PdfWriter;

pub const REPORT_FILE: &str = "EDA_report.pdf";

/// What an export run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Images written by this run, in column order.
    pub images: Vec<PathBuf>,
    /// The PDF, unless the directory held no PNGs.
    pub pdf: Option<PathBuf>,
    pub pages: usize,
}

/// Render one chart per numeric and categorical column of `dataset` into
/// `out_dir`, then bundle every PNG there into [`REPORT_FILE`].
pub fn export_eda_report(
    dataset: &Dataset,
    out_dir: &Path,
    backend: &RasterBackend,
) -> Result<ExportSummary, ReportError> {
    std::fs::create_dir_all(out_dir).map_err(ReportError::io(out_dir))?;

    let mut images = Vec::new();

    let mut narrow = backend.clone().with_size(DEFAULT_SIZE.0, DEFAULT_SIZE.1);
    for column in dataset.columns_of_kind(ColumnKind::Numeric) {
        let artifact = ChartArtifact {
            file_name: format!("{}_distribution.png", file_stem(&column.name)),
            image: narrow.histogram(&column_distribution(column))?,
        };
        images.push(artifact.save(out_dir)?);
    }

    let mut wide = backend.clone().with_size(WIDE_SIZE.0, WIDE_SIZE.1);
    for column in dataset.columns_of_kind(ColumnKind::Categorical) {
        let artifact = ChartArtifact {
            file_name: format!("{}_countplot.png", file_stem(&column.name)),
            image: wide.bars(&column_countplot(column))?,
        };
        images.push(artifact.save(out_dir)?);
    }
    log::info!("Wrote {} chart images to {}", images.len(), out_dir.display());

    let pngs = collect_pngs(out_dir)?;
    if pngs.is_empty() {
        log::warn!("No PNG files in {}; skipping PDF", out_dir.display());
        return Ok(ExportSummary {
            images,
            pdf: None,
            pages: 0,
        });
    }

    let pdf_path = out_dir.join(REPORT_FILE);
    let pages = bundle_pngs(&pngs, &pdf_path)?;
    Ok(ExportSummary {
        images,
        pdf: Some(pdf_path),
        pages,
    })
}

/// Column names may contain path separators.
fn file_stem(column: &str) -> String {
    column.replace(['/', '\\'], "_")
}

/// Every `*.png` (any case) directly inside `dir`, sorted by file name.
pub fn collect_pngs(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let mut pngs: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(ReportError::io(dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    pngs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pngs)
}

/// One page per image, in the given order. Returns the page count.
pub fn bundle_pngs(pngs: &[PathBuf], pdf_path: &Path) -> Result<usize, ReportError> {
    let mut writer = PdfWriter::new();
    for path in pngs {
        let bytes = std::fs::read(path).map_err(ReportError::io(path))?;
        let image = writer.embed_png(&bytes).map_err(|source| ReportError::Image {
            path: path.clone(),
            source,
        })?;
        writer.add_image_page(&image)?;
    }
    writer.save(pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    fn sample() -> Dataset {
        parse_csv(
            b"salary_in_usd,experience_level,remote\n\
              100,SE,true\n\
              80,MI,false\n\
              60,EN,true\n",
        )
        .unwrap()
    }

    #[test]
    fn one_image_per_numeric_and_categorical_column() {
        let dir = tempfile::tempdir().unwrap();
        let summary = export_eda_report(&sample(), dir.path(), &RasterBackend::new(false)).unwrap();

        let names: Vec<String> = summary
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // The boolean column gets no chart.
        assert_eq!(
            names,
            vec!["salary_in_usd_distribution.png", "experience_level_countplot.png"]
        );
        assert_eq!(summary.pages, 2);
        assert!(dir.path().join(REPORT_FILE).exists());
    }

    #[test]
    fn no_pngs_means_no_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let ds = parse_csv(b"flag\ntrue\nfalse\n").unwrap();
        let summary = export_eda_report(&ds, dir.path(), &RasterBackend::new(false)).unwrap();
        assert_eq!(summary.pdf, None);
        assert!(!dir.path().join(REPORT_FILE).exists());
    }

    #[test]
    fn png_collection_is_case_insensitive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.png", "c.txt", "A.Png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = collect_pngs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.Png", "a.png", "b.PNG"]);
    }

    #[test]
    fn corrupt_png_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"nope").unwrap();
        let err = bundle_pngs(&[bad.clone()], &dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, ReportError::Image { path, .. } if path == bad));
    }

    #[test]
    fn separators_in_column_names_stay_in_dir() {
        assert_eq!(file_stem("a/b\\c"), "a_b_c");
    }
}
