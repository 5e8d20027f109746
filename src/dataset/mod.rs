//! Tabular dataset loading and cleaning.
//!
//! A [`Dataset`] is an ordered set of named columns sharing one length, with
//! one designated label column. Columns are typed at load time by scanning
//! cell text: integer, float, or categorical. Missing values are empty cells.
//!
//! Cleaning policy is label-only: rows with a missing label are dropped,
//! rows with missing feature values are kept (they surface as NaN in the
//! feature matrix).

use crate::error::{DetectarError, Result};
use crate::primitives::{Matrix, Vector};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Runtime-inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    /// All present cells parse as integers.
    Integer,
    /// All present cells parse as floating-point numbers.
    Float,
    /// At least one present cell is non-numeric.
    Categorical,
}

/// Column storage: numeric columns keep parsed values, categorical columns
/// keep raw text. `None` marks a missing cell.
#[derive(Debug, Clone)]
enum ColumnValues {
    Numeric(Vec<Option<f32>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    fn missing_count(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    fn filter_rows(&self, keep: &[bool]) -> ColumnValues {
        match self {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(
                v.iter()
                    .zip(keep.iter())
                    .filter(|(_, &k)| k)
                    .map(|(c, _)| *c)
                    .collect(),
            ),
            ColumnValues::Text(v) => ColumnValues::Text(
                v.iter()
                    .zip(keep.iter())
                    .filter(|(_, &k)| k)
                    .map(|(c, _)| c.clone())
                    .collect(),
            ),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone)]
struct Column {
    name: String,
    dtype: ColumnType,
    values: ColumnValues,
}

/// Per-column missing-value counts, reported before cleaning.
///
/// Observability value only; correctness never depends on it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MissingReport {
    /// (column name, missing cell count) in column order.
    pub counts: Vec<(String, usize)>,
}

impl MissingReport {
    /// Total missing cells across all columns.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// Missing count for a single column, if present.
    #[must_use]
    pub fn for_column(&self, name: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }
}

impl fmt::Display for MissingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "missing values per column:")?;
        for (name, count) in &self.counts {
            writeln!(f, "  {name}: {count}")?;
        }
        Ok(())
    }
}

/// A table of typed columns with one designated label column.
///
/// Immutable once constructed; cleaning returns a new `Dataset` so callers
/// can retain the raw data.
///
/// # Examples
///
/// ```
/// use detectar::dataset::Dataset;
///
/// let ds = Dataset::from_columns(
///     vec![
///         ("amount".to_string(), vec![Some(10.0), Some(250.0)]),
///         ("Target".to_string(), vec![Some(0.0), Some(1.0)]),
///     ],
///     "Target",
/// )
/// .expect("columns share one length");
/// assert_eq!(ds.n_rows(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    label: String,
    n_rows: usize,
}

impl Dataset {
    /// Builds a dataset from named numeric columns.
    ///
    /// Column type is inferred: `Integer` when every present value is
    /// integral, `Float` otherwise. `None` cells are missing values.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if columns are empty, lengths differ, names repeat,
    /// or the label column is absent.
    pub fn from_columns(
        columns: Vec<(String, Vec<Option<f32>>)>,
        label_column: &str,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(DetectarError::schema("dataset must have at least one column"));
        }

        let n_rows = columns[0].1.len();
        for (name, values) in &columns {
            if values.len() != n_rows {
                return Err(DetectarError::schema(format!(
                    "column '{name}' has {} rows, expected {n_rows}",
                    values.len()
                )));
            }
        }

        let mut seen: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        seen.sort_unstable();
        for pair in seen.windows(2) {
            if pair[0] == pair[1] {
                return Err(DetectarError::schema(format!(
                    "duplicate column name '{}'",
                    pair[0]
                )));
            }
        }

        let columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| {
                let integral = values
                    .iter()
                    .flatten()
                    .all(|v| v.fract() == 0.0 && v.is_finite());
                Column {
                    name,
                    dtype: if integral {
                        ColumnType::Integer
                    } else {
                        ColumnType::Float
                    },
                    values: ColumnValues::Numeric(values),
                }
            })
            .collect();

        let dataset = Self {
            columns,
            label: label_column.to_string(),
            n_rows,
        };
        dataset.label_index()?;
        Ok(dataset)
    }

    /// Loads a dataset from a delimited file with a header row.
    ///
    /// Cell types are inferred per column from the data; empty cells are
    /// missing values.
    ///
    /// # Errors
    ///
    /// Returns `SourceNotFound` if the path cannot be opened, `Schema` on
    /// ragged rows or a missing label column.
    pub fn from_csv<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|_| DetectarError::SourceNotFound {
            path: path.display().to_string(),
        })?;

        let mut reader = csv::ReaderBuilder::new().from_reader(file);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DetectarError::schema(format!("failed to read header row: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                DetectarError::schema(format!("row {}: {e}", row_idx + 2))
            })?;
            if record.len() != headers.len() {
                return Err(DetectarError::schema(format!(
                    "row {}: expected {} fields, got {}",
                    row_idx + 2,
                    headers.len(),
                    record.len()
                )));
            }
            for (col, cell) in record.iter().enumerate() {
                let cell = cell.trim();
                raw[col].push(if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                });
            }
        }

        let n_rows = raw.first().map_or(0, Vec::len);
        let columns: Vec<Column> = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| infer_column(name, cells))
            .collect();

        let dataset = Self {
            columns,
            label: label_column.to_string(),
            n_rows,
        };
        dataset.label_index()?;
        Ok(dataset)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns, label included.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the designated label column name.
    #[must_use]
    pub fn label_column(&self) -> &str {
        &self.label
    }

    /// Returns the inferred type of a column.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column doesn't exist.
    pub fn column_type(&self, name: &str) -> Result<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.dtype)
            .ok_or_else(|| DetectarError::schema(format!("column '{name}' not found")))
    }

    /// Counts missing cells per column.
    #[must_use]
    pub fn missing_counts(&self) -> MissingReport {
        MissingReport {
            counts: self
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.values.missing_count()))
                .collect(),
        }
    }

    /// Returns a numeric column as a vector, missing cells as NaN.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the column doesn't exist or is categorical.
    pub fn numeric_column(&self, name: &str) -> Result<Vector<f32>> {
        let col = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DetectarError::schema(format!("column '{name}' not found")))?;
        let ColumnValues::Numeric(values) = &col.values else {
            return Err(DetectarError::schema(format!(
                "column '{name}' is categorical"
            )));
        };
        Ok(Vector::from_vec(
            values.iter().map(|v| v.unwrap_or(f32::NAN)).collect(),
        ))
    }

    /// Counts occurrences of each present label value.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the label column is categorical.
    pub fn label_value_counts(&self) -> Result<BTreeMap<String, usize>> {
        let idx = self.label_index()?;
        let ColumnValues::Numeric(values) = &self.columns[idx].values else {
            return Err(DetectarError::schema(format!(
                "label column '{}' is categorical",
                self.label
            )));
        };

        let mut counts = BTreeMap::new();
        for value in values.iter().flatten() {
            *counts.entry(format!("{value}")).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Drops rows whose label cell is missing, returning the cleaned copy
    /// and a per-column missingness report taken before removal.
    ///
    /// Rows with missing *feature* cells are kept untouched. The original
    /// dataset is not mutated.
    ///
    /// # Errors
    ///
    /// Returns `Schema` if the label column is absent or categorical.
    pub fn drop_missing_labels(&self) -> Result<(Dataset, MissingReport)> {
        let report = self.missing_counts();
        let idx = self.label_index()?;

        let ColumnValues::Numeric(labels) = &self.columns[idx].values else {
            return Err(DetectarError::schema(format!(
                "label column '{}' is categorical",
                self.label
            )));
        };
        let keep: Vec<bool> = labels.iter().map(Option::is_some).collect();
        let kept_rows = keep.iter().filter(|&&k| k).count();

        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                dtype: c.dtype,
                values: c.values.filter_rows(&keep),
            })
            .collect();

        Ok((
            Dataset {
                columns,
                label: self.label.clone(),
                n_rows: kept_rows,
            },
            report,
        ))
    }

    /// Splits the dataset into a feature matrix and a validated 0/1 label
    /// vector, index-aligned.
    ///
    /// Missing feature cells become NaN. Label conversion is explicit and
    /// validated: a missing, non-integral, or out-of-range label is a
    /// `Schema` error, never a silent truncation.
    ///
    /// # Errors
    ///
    /// Returns `Schema` on categorical feature columns or invalid labels,
    /// `EmptyInput` when the dataset has no rows.
    pub fn to_features(&self) -> Result<(Matrix<f32>, Vec<usize>)> {
        if self.n_rows == 0 {
            return Err(DetectarError::empty_input("dataset has no rows"));
        }
        let label_idx = self.label_index()?;

        let mut feature_cols: Vec<&Column> = Vec::with_capacity(self.columns.len() - 1);
        for (i, col) in self.columns.iter().enumerate() {
            if i == label_idx {
                continue;
            }
            match &col.values {
                ColumnValues::Numeric(_) => feature_cols.push(col),
                ColumnValues::Text(_) => {
                    return Err(DetectarError::schema(format!(
                        "categorical feature column '{}' cannot enter the feature matrix",
                        col.name
                    )))
                }
            }
        }
        if feature_cols.is_empty() {
            return Err(DetectarError::empty_input("dataset has no feature columns"));
        }

        let n_features = feature_cols.len();
        let mut data = Vec::with_capacity(self.n_rows * n_features);
        for row in 0..self.n_rows {
            for col in &feature_cols {
                let ColumnValues::Numeric(values) = &col.values else {
                    unreachable!("feature columns are numeric by construction");
                };
                data.push(values[row].unwrap_or(f32::NAN));
            }
        }
        let x = Matrix::from_vec(self.n_rows, n_features, data)
            .map_err(|e| DetectarError::schema(e.to_string()))?;

        let ColumnValues::Numeric(labels) = &self.columns[label_idx].values else {
            return Err(DetectarError::schema(format!(
                "label column '{}' is categorical",
                self.label
            )));
        };
        let mut y = Vec::with_capacity(self.n_rows);
        for (row, cell) in labels.iter().enumerate() {
            let value = cell.ok_or_else(|| {
                DetectarError::schema(format!(
                    "row {row}: missing label; drop missing labels before extracting features"
                ))
            })?;
            if value == 0.0 {
                y.push(0);
            } else if value == 1.0 {
                y.push(1);
            } else {
                return Err(DetectarError::schema(format!(
                    "row {row}: label must be 0 or 1, got {value}"
                )));
            }
        }

        Ok((x, y))
    }

    fn label_index(&self) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == self.label)
            .ok_or_else(|| {
                DetectarError::schema(format!("label column '{}' not found", self.label))
            })
    }
}

/// Infers a column's type from its raw cells and parses accordingly.
fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let all_integer = cells
        .iter()
        .flatten()
        .all(|c| c.parse::<i64>().is_ok());
    let all_float = all_integer
        || cells
            .iter()
            .flatten()
            .all(|c| c.parse::<f32>().is_ok());

    if all_float {
        let values = cells
            .iter()
            .map(|c| c.as_ref().and_then(|s| s.parse::<f32>().ok()))
            .collect();
        Column {
            name,
            dtype: if all_integer {
                ColumnType::Integer
            } else {
                ColumnType::Float
            },
            values: ColumnValues::Numeric(values),
        }
    } else {
        Column {
            name,
            dtype: ColumnType::Categorical,
            values: ColumnValues::Text(cells),
        }
    }
}
