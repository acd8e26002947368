//! Error types shared across the pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a dataset from a byte stream or file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read parquet: {0}")]
    Parquet(String),

    #[error("no columns to parse from input")]
    Empty,

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Invalid(String),
}

/// Failure while drawing or encoding a static chart.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("bitmap buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },
}

/// Failure while writing chart images or assembling a PDF.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("cannot decode chart image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ReportError {
        let path = path.into();
        move |source| ReportError::Io { path, source }
    }
}
