use std::collections::BTreeSet;

use super::model::{Column, Dataset, Value};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A single row predicate over one named column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Cell value is one of `values`. An empty set matches nothing.
    In {
        column: String,
        values: BTreeSet<Value>,
    },
    /// Cell value equals `value`.
    Equals { column: String, value: Value },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::In { column, .. } | Predicate::Equals { column, .. } => column,
        }
    }

    /// Null cells never match.
    pub fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() {
            return false;
        }
        match self {
            Predicate::In { values, .. } => values.contains(cell),
            Predicate::Equals { value, .. } => value == cell,
        }
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// A row subset of a [`Dataset`]. Shares the dataset's columns.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// The whole dataset, unfiltered.
    pub fn all(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            rows: (0..dataset.len()).collect(),
        }
    }

    /// Rebuild a view from previously computed row indices.
    pub fn from_rows(dataset: &'a Dataset, rows: Vec<usize>) -> Self {
        FilteredView { dataset, rows }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Indices into the dataset, ascending.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&'a str> {
        self.dataset.column_names()
    }

    pub fn column(&self, name: &str) -> Option<&'a Column> {
        self.dataset.column(name)
    }

    /// Cells of a column restricted to the visible rows.
    pub fn cells(&self, name: &str) -> Option<impl Iterator<Item = &'a Value> + '_> {
        let column = self.dataset.column(name)?;
        Some(self.rows.iter().map(move |&r| &column.cells[r]))
    }

    /// Non-null numeric cells of a column within the view.
    pub fn numeric_values(&self, name: &str) -> Vec<f64> {
        self.cells(name)
            .map(|cells| cells.filter_map(Value::as_f64).collect())
            .unwrap_or_default()
    }
}

/// Apply all predicates (logical AND). Predicates on absent columns are
/// skipped; an empty predicate list yields every row.
pub fn apply<'a>(dataset: &'a Dataset, predicates: &[Predicate]) -> FilteredView<'a> {
    let active: Vec<(&Predicate, &Column)> = predicates
        .iter()
        .filter_map(|p| match dataset.column(p.column()) {
            Some(col) => Some((p, col)),
            None => {
                log::debug!("Skipping filter on missing column {}", p.column());
                None
            }
        })
        .collect();

    let rows = (0..dataset.len())
        .filter(|&row| active.iter().all(|(p, col)| p.matches(&col.cells[row])))
        .collect();

    FilteredView { dataset, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    fn dataset() -> Dataset {
        parse_csv(
            b"experience_level,company_size,job_title,salary\n\
              SE,L,Data Scientist,100\n\
              MI,M,Data Engineer,80\n\
              SE,M,Data Engineer,90\n\
              EN,,Data Scientist,50\n",
        )
        .unwrap()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn no_predicates_returns_everything() {
        let ds = dataset();
        assert_eq!(apply(&ds, &[]).rows(), &[0, 1, 2, 3]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let ds = dataset();
        let preds = vec![
            Predicate::In {
                column: "experience_level".into(),
                values: [text("SE"), text("MI")].into_iter().collect(),
            },
            Predicate::Equals {
                column: "job_title".into(),
                value: text("Data Engineer"),
            },
        ];
        assert_eq!(apply(&ds, &preds).rows(), &[1, 2]);
    }

    #[test]
    fn missing_column_is_ignored() {
        let ds = dataset();
        let preds = vec![Predicate::Equals {
            column: "job_type".into(),
            value: text("FT"),
        }];
        assert_eq!(apply(&ds, &preds).len(), 4);
    }

    #[test]
    fn null_cells_never_match() {
        let ds = dataset();
        let preds = vec![Predicate::In {
            column: "company_size".into(),
            values: [text("M"), text("L")].into_iter().collect(),
        }];
        assert_eq!(apply(&ds, &preds).rows(), &[0, 1, 2]);
    }

    #[test]
    fn empty_membership_set_matches_nothing() {
        let ds = dataset();
        let preds = vec![Predicate::In {
            column: "company_size".into(),
            values: BTreeSet::new(),
        }];
        assert!(apply(&ds, &preds).is_empty());
    }

    #[test]
    fn view_exposes_filtered_numbers() {
        let ds = dataset();
        let preds = vec![Predicate::Equals {
            column: "experience_level".into(),
            value: text("SE"),
        }];
        let view = apply(&ds, &preds);
        assert_eq!(view.numeric_values("salary"), vec![100.0, 90.0]);
        assert_eq!(view.column_names(), ds.column_names());
    }
}
