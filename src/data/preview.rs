use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use super::filter::FilteredView;
use super::model::Value;

/// Render the first `n` rows of a view as a boxed text table.
pub fn preview_table(view: &FilteredView<'_>, n: usize) -> Result<String, ArrowError> {
    let rows: Vec<usize> = view.rows().iter().take(n).copied().collect();
    let dataset = view.dataset();

    let fields: Vec<Field> = dataset
        .columns()
        .iter()
        .map(|c| Field::new(c.name.as_str(), DataType::Utf8, true))
        .collect();

    let arrays: Vec<ArrayRef> = dataset
        .columns()
        .iter()
        .map(|c| {
            let cells: StringArray = rows
                .iter()
                .map(|&r| match &c.cells[r] {
                    Value::Null => None,
                    v => Some(v.to_string()),
                })
                .collect();
            Arc::new(cells) as ArrayRef
        })
        .collect();

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}
