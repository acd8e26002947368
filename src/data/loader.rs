use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Dataset, Value};
use crate::error::LoadError;

/// Where the active dataset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Bytes handed in by the user (dashboard upload).
    Upload { name: String },
    /// A file on disk, usually the default dataset path.
    File(PathBuf),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Upload { name } => format!("uploaded file {name}"),
            DataSource::File(path) => path.display().to_string(),
        }
    }
}

/// An uploaded CSV stream.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A parsed dataset together with the untouched bytes it was parsed from.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub raw: Vec<u8>,
    pub source: DataSource,
}

impl LoadedDataset {
    /// The dataset as CSV: the original bytes when it was read from CSV,
    /// otherwise a fresh serialisation.
    pub fn csv_bytes(&self) -> Result<Cow<'_, [u8]>, LoadError> {
        let is_csv = match &self.source {
            DataSource::Upload { .. } => true,
            DataSource::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(true, |e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("txt")),
        };
        if is_csv {
            Ok(Cow::Borrowed(&self.raw))
        } else {
            write_csv(&self.dataset).map(Cow::Owned)
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Pick the active dataset: the upload when present and parseable,
/// otherwise the default path.
pub fn resolve_active(upload: Option<Upload>, default_path: &Path) -> Result<LoadedDataset, LoadError> {
    if let Some(upload) = upload {
        match load_upload(upload) {
            Ok(loaded) => return Ok(loaded),
            Err(e) => log::warn!("Uploaded file could not be parsed, using default dataset: {e}"),
        }
    }
    load_file(default_path)
}

/// Parse an uploaded CSV stream.
pub fn load_upload(upload: Upload) -> Result<LoadedDataset, LoadError> {
    let dataset = parse_csv(&upload.bytes)?;
    log::info!(
        "Loaded {} rows from upload {} with columns {:?}",
        dataset.len(),
        upload.name,
        dataset.column_names()
    );
    Ok(LoadedDataset {
        dataset,
        raw: upload.bytes,
        source: DataSource::Upload { name: upload.name },
    })
}

/// Load a dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one record per row (the default)
/// * `.json`    – `[{ "job_title": "...", "salary": 1, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path) -> Result<LoadedDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv")
        .to_ascii_lowercase();

    let raw = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let dataset = match ext.as_str() {
        "csv" | "txt" => parse_csv(&raw)?,
        "json" => parse_json(&raw)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };

    log::info!(
        "Loaded {} rows from {} with columns {:?}",
        dataset.len(),
        path.display(),
        dataset.column_names()
    );

    Ok(LoadedDataset {
        dataset,
        raw,
        source: DataSource::File(path.to_path_buf()),
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse CSV text with a header row.
///
/// Short rows are padded with nulls; a row longer than the header is an
/// error. Repeated header names get a `.N` suffix.
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = dedupe_headers(reader.headers()?.iter());
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(LoadError::Empty);
    }

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() > headers.len() {
            return Err(LoadError::Invalid(format!(
                "CSV row {}: expected {} fields, saw {}",
                row_no + 1,
                headers.len(),
                record.len()
            )));
        }
        for (col_idx, raw) in raw_columns.iter_mut().enumerate() {
            raw.push(record.get(col_idx).unwrap_or("").to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| {
            let cells = raw.iter().map(|s| Value::parse(s)).collect();
            Column::from_cells(name, cells, Some(raw))
        })
        .collect();

    Ok(Dataset::from_columns(columns))
}

/// Serialise a dataset as CSV with a header row. Nulls become empty fields.
pub fn write_csv(dataset: &Dataset) -> Result<Vec<u8>, LoadError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.column_names())?;
    for row in 0..dataset.len() {
        writer.write_record(dataset.columns().iter().map(|col| csv_field(&col.cells[row])))?;
    }
    writer
        .into_inner()
        .map_err(|e| LoadError::Invalid(format!("cannot finish CSV: {e}")))
}

/// A cell as written to CSV. Whole floats keep a `.0` so they read back as
/// floats.
fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{v:.1}"),
        other => other.to_string(),
    }
}

fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    names
        .map(|name| {
            let count = seen.entry(name.to_string()).or_insert(0);
            let out = if *count == 0 {
                name.to_string()
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            out
        })
        .collect()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "experience_level": "SE", "job_title": "Data Scientist", "salary_in_usd": 120000 },
///   ...
/// ]
/// ```
fn parse_json(bytes: &[u8]) -> Result<Dataset, LoadError> {
    let root: JsonValue = serde_json::from_slice(bytes)?;

    let records = root
        .as_array()
        .ok_or_else(|| LoadError::Invalid("expected top-level JSON array".into()))?;

    let mut names: Vec<String> = Vec::new();
    let mut cells: HashMap<String, Vec<Value>> = HashMap::new();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoadError::Invalid(format!("row {i} is not a JSON object")))?;

        for (key, val) in obj {
            let column = cells.entry(key.clone()).or_insert_with(|| {
                names.push(key.clone());
                Vec::new()
            });
            column.resize(i, Value::Null);
            column.push(json_to_value(val));
        }
    }

    if names.is_empty() {
        return Err(LoadError::Empty);
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let mut column = cells.remove(&name).unwrap_or_default();
            column.resize(records.len(), Value::Null);
            Column::from_cells(name, column, None)
        })
        .collect();

    Ok(Dataset::from_columns(columns))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns, as written by
/// `df.to_parquet()` or the `generate_sample` binary.
fn load_parquet(path: &Path) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(parquet_err)?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().map_err(parquet_err)?;

    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result.map_err(parquet_err)?;
        for (col_idx, column) in cells.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            column.extend((0..batch.num_rows()).map(|row| extract_value(array, row)));
        }
    }

    if names.is_empty() {
        return Err(LoadError::Empty);
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, column)| Column::from_cells(name, column, None))
        .collect();

    Ok(Dataset::from_columns(columns))
}

fn parquet_err(e: impl std::fmt::Display) -> LoadError {
    LoadError::Parquet(e.to_string())
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(Value::Null, |s| Value::Text(s.value(row).to_string())),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(Value::Null, |a| Value::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(Value::Null, |a| Value::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(Value::Null, |a| Value::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(Value::Null, |a| Value::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map_or(Value::Null, |a| Value::Bool(a.value(row))),
        other => Value::Text(format!("{other:?}")),
    }
}
