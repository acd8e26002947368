use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the Pandas dtypes a CSV read
/// produces. Ordered and hashable so it can key filter sets and group maps.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            // Mixed numeric columns sort by magnitude, integers first on ties.
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

/// Tokens a CSV reader treats as missing.
const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

impl Value {
    /// Guess the type of a raw CSV field.
    pub fn parse(s: &str) -> Value {
        if NULL_TOKENS.contains(&s) {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
            return Value::Bool(s.eq_ignore_ascii_case("true"));
        }
        Value::Text(s.to_string())
    }

    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Inferred storage class of a column, the equivalent of the
/// `int64`/`float64`, `bool` and `object` dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Categorical,
}

/// One named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Value>,
}

impl Column {
    /// Infer the kind from the cells and normalise them to it.
    ///
    /// All-null columns count as numeric. In a categorical column every
    /// non-null cell becomes `Text`, using `raw` for the original spelling.
    pub fn from_cells(name: impl Into<String>, cells: Vec<Value>, raw: Option<Vec<String>>) -> Self {
        let non_null = || cells.iter().filter(|v| !v.is_null());
        let kind = if non_null().all(|v| v.as_f64().is_some()) {
            ColumnKind::Numeric
        } else if non_null().all(|v| matches!(v, Value::Bool(_))) {
            ColumnKind::Boolean
        } else {
            ColumnKind::Categorical
        };

        let cells = if kind == ColumnKind::Categorical {
            cells
                .into_iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Value::Null => Value::Null,
                    Value::Text(s) => Value::Text(s),
                    other => {
                        let text = raw
                            .as_ref()
                            .and_then(|r| r.get(i).cloned())
                            .unwrap_or_else(|| other.to_string());
                        Value::Text(text)
                    }
                })
                .collect()
        } else {
            cells
        };

        Column {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Distinct non-null values in first-seen order.
    pub fn unique_values(&self) -> Vec<Value> {
        let mut seen = HashSet::new();
        self.cells
            .iter()
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert((*v).clone()))
            .cloned()
            .collect()
    }

    /// Non-null numeric cells.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.cells.iter().filter_map(Value::as_f64).collect()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table. Columns share a row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Build from columns. Shorter columns are padded with nulls.
    pub fn from_columns(mut columns: Vec<Column>) -> Self {
        let rows = columns.iter().map(Column::len).max().unwrap_or(0);
        for col in &mut columns {
            col.cells.resize(rows, Value::Null);
        }
        Dataset { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look a column up by name. Optional columns are handled by the caller
    /// branching on the result.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn columns_of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.kind == kind)
    }

    /// Cell at (row, column), `None` when either is out of range.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column)?.cells.get(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_guesses_types() {
        assert_eq!(Value::parse("42"), Value::Integer(42));
        assert_eq!(Value::parse("4.5"), Value::Float(4.5));
        assert_eq!(Value::parse("TRUE"), Value::Bool(true));
        assert_eq!(Value::parse("NA"), Value::Null);
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("SE"), Value::Text("SE".into()));
    }

    #[test]
    fn mixed_column_becomes_categorical_text() {
        let raw = vec!["007".to_string(), "abc".to_string(), String::new()];
        let cells = raw.iter().map(|s| Value::parse(s)).collect();
        let col = Column::from_cells("code", cells, Some(raw));
        assert_eq!(col.kind, ColumnKind::Categorical);
        assert_eq!(
            col.cells,
            vec![Value::Text("007".into()), Value::Text("abc".into()), Value::Null]
        );
    }

    #[test]
    fn numeric_column_mixes_ints_and_floats() {
        let col = Column::from_cells(
            "salary",
            vec![Value::Integer(1), Value::Null, Value::Float(2.5)],
            None,
        );
        assert_eq!(col.kind, ColumnKind::Numeric);
        assert_eq!(col.numeric_values(), vec![1.0, 2.5]);
    }

    #[test]
    fn unique_values_keep_first_seen_order() {
        let col = Column::from_cells(
            "experience_level",
            ["SE", "MI", "SE", "EN", "MI"]
                .iter()
                .map(|s| Value::Text(s.to_string()))
                .collect(),
            None,
        );
        let names: Vec<String> = col.unique_values().iter().map(|v| v.to_string()).collect();
        assert_eq!(names, ["SE", "MI", "EN"]);
    }

    #[test]
    fn optional_column_lookup() {
        let ds = Dataset::from_columns(vec![Column::from_cells(
            "salary",
            vec![Value::Integer(10)],
            None,
        )]);
        assert!(ds.column("salary").is_some());
        assert!(ds.column("job_type").is_none());
        assert_eq!(ds.cell(0, "salary"), Some(&Value::Integer(10)));
    }
}
