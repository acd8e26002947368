use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::model::{ColumnKind, Dataset, Value};

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

/// Quantile of an ascending slice using linear interpolation between the
/// two nearest ranks. `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(&sorted(values), 0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n − 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Frequency of each non-null value, most frequent first. Ties keep the
/// order in which values were first encountered.
pub fn value_counts<'v>(cells: impl IntoIterator<Item = &'v Value>) -> Vec<(Value, usize)> {
    let mut index: HashMap<&Value, usize> = HashMap::new();
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for cell in cells.into_iter().filter(|v| !v.is_null()) {
        match index.get(cell) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(cell, counts.len());
                counts.push((cell.clone(), 1));
            }
        }
    }
    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Mean of `value_column` per distinct `group_column` value, groups sorted.
/// Rows where either cell is missing are dropped.
pub fn group_means(dataset: &Dataset, group_column: &str, value_column: &str) -> Vec<(Value, f64)> {
    let (Some(groups), Some(values)) = (dataset.column(group_column), dataset.column(value_column))
    else {
        return Vec::new();
    };
    let mut acc: BTreeMap<&Value, (f64, usize)> = BTreeMap::new();
    for (g, v) in groups.cells.iter().zip(&values.cells) {
        if g.is_null() {
            continue;
        }
        if let Some(x) = v.as_f64() {
            let entry = acc.entry(g).or_insert((0.0, 0));
            entry.0 += x;
            entry.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(g, (sum, n))| (g.clone(), sum / n as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// describe()
// ---------------------------------------------------------------------------

/// Count / mean / spread / quartiles of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Count / distinct / mode of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
}

/// Summary statistics table. Numeric columns are summarised when present;
/// otherwise categorical ones are.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "columns", rename_all = "lowercase")]
pub enum Describe {
    Numeric(Vec<NumericSummary>),
    Categorical(Vec<CategorySummary>),
}

pub fn describe(dataset: &Dataset) -> Describe {
    let numeric: Vec<NumericSummary> = dataset
        .columns_of_kind(ColumnKind::Numeric)
        .map(|col| {
            let values = sorted(&col.numeric_values());
            NumericSummary {
                column: col.name.clone(),
                count: values.len(),
                mean: mean(&values),
                std: std_dev(&values),
                min: values.first().copied(),
                q25: quantile(&values, 0.25),
                q50: quantile(&values, 0.5),
                q75: quantile(&values, 0.75),
                max: values.last().copied(),
            }
        })
        .collect();

    if !numeric.is_empty() {
        return Describe::Numeric(numeric);
    }

    Describe::Categorical(
        dataset
            .columns()
            .iter()
            .map(|col| {
                let counts = value_counts(&col.cells);
                CategorySummary {
                    column: col.name.clone(),
                    count: counts.iter().map(|(_, n)| n).sum(),
                    unique: counts.len(),
                    top: counts.first().map(|(v, _)| v.to_string()),
                    freq: counts.first().map_or(0, |(_, n)| *n),
                }
            })
            .collect(),
    )
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = |v: Option<f64>| v.map_or_else(|| "NaN".to_string(), |x| format!("{x:.6}"));

        let (labels, columns): (Vec<&str>, Vec<(String, Vec<String>)>) = match self {
            Describe::Numeric(cols) => (
                vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"],
                cols.iter()
                    .map(|c| {
                        let cells = vec![
                            format!("{:.6}", c.count as f64),
                            num(c.mean),
                            num(c.std),
                            num(c.min),
                            num(c.q25),
                            num(c.q50),
                            num(c.q75),
                            num(c.max),
                        ];
                        (c.column.clone(), cells)
                    })
                    .collect(),
            ),
            Describe::Categorical(cols) => (
                vec!["count", "unique", "top", "freq"],
                cols.iter()
                    .map(|c| {
                        let cells = vec![
                            c.count.to_string(),
                            c.unique.to_string(),
                            c.top.clone().unwrap_or_else(|| "NaN".into()),
                            c.freq.to_string(),
                        ];
                        (c.column.clone(), cells)
                    })
                    .collect(),
            ),
        };

        let label_width = labels.iter().map(|l| l.len()).max().unwrap_or(0);
        let widths: Vec<usize> = columns
            .iter()
            .map(|(name, cells)| cells.iter().map(String::len).chain([name.len()]).max().unwrap_or(0))
            .collect();

        write!(f, "{:label_width$}", "")?;
        for ((name, _), w) in columns.iter().zip(widths.iter().copied()) {
            write!(f, "  {name:>w$}")?;
        }
        writeln!(f)?;
        for (row, label) in labels.iter().enumerate() {
            write!(f, "{label:<label_width$}")?;
            for ((_, cells), w) in columns.iter().zip(widths.iter().copied()) {
                write!(f, "  {:>w$}", cells[row])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn value_counts_ties_keep_first_seen() {
        let cells: Vec<Value> = ["B", "A", "C", "A", "B", "C", "A", "B"]
            .iter()
            .map(|s| Value::Text(s.to_string()))
            .collect();
        let counts: Vec<(String, usize)> = value_counts(&cells)
            .into_iter()
            .map(|(v, n)| (v.to_string(), n))
            .collect();
        assert_eq!(
            counts,
            vec![("B".into(), 3), ("A".into(), 3), ("C".into(), 2)]
        );
    }

    #[test]
    fn group_means_are_sorted_by_group() {
        let ds = parse_csv(b"experience_level,salary\nSE,100\nEN,40\nSE,80\nMI,\nEN,60\n").unwrap();
        let means: Vec<(String, f64)> = group_means(&ds, "experience_level", "salary")
            .into_iter()
            .map(|(g, m)| (g.to_string(), m))
            .collect();
        assert_eq!(means, vec![("EN".into(), 50.0), ("SE".into(), 90.0)]);
    }

    #[test]
    fn describe_numeric_columns() {
        let ds = parse_csv(b"job_title,salary\nA,1\nB,2\nC,3\nD,\n").unwrap();
        let Describe::Numeric(cols) = describe(&ds) else {
            panic!("expected numeric summary");
        };
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].count, 3);
        assert_eq!(cols[0].mean, Some(2.0));
        assert_eq!(cols[0].std, Some(1.0));
        let text = describe(&ds).to_string();
        assert!(text.contains("salary"));
        assert!(text.lines().any(|l| l.starts_with("75%")));
    }

    #[test]
    fn describe_falls_back_to_categories() {
        let ds = parse_csv(b"job_title\nA\nB\nA\n").unwrap();
        let Describe::Categorical(cols) = describe(&ds) else {
            panic!("expected categorical summary");
        };
        assert_eq!(cols[0].unique, 2);
        assert_eq!(cols[0].top.as_deref(), Some("A"));
        assert_eq!(cols[0].freq, 2);
    }
}
