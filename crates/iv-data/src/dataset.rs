//! Assembly of numeric feature/target matrices from JSON row records.

use ndarray::{Array1, Array2};
use serde_json::Value;

use iv_types::{DataError, IvResult};

/// One data row as received from a client: column name to cell value.
pub type Record = serde_json::Map<String, Value>;

/// Numeric design matrix and target vector for a fixed feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Vec<String>,
    pub target: String,
    /// `n_samples x n_features`, columns in `features` order.
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl Dataset {
    /// Select `features` and `target` from every record.
    ///
    /// Cells may be JSON numbers or strings holding a number. Columns are
    /// looked up on the first record; a cell missing from a later record is
    /// reported as non-numeric.
    pub fn from_records(records: &[Record], features: &[String], target: &str) -> IvResult<Self> {
        let first = records.first().ok_or(DataError::Empty)?;
        for column in features.iter().map(String::as_str).chain(std::iter::once(target)) {
            if !first.contains_key(column) {
                return Err(DataError::ColumnNotFound {
                    column: column.to_string(),
                }
                .into());
            }
        }

        let n = records.len();
        let d = features.len();
        let mut x = Array2::zeros((n, d));
        let mut y = Array1::zeros(n);

        for (row, record) in records.iter().enumerate() {
            for (j, feature) in features.iter().enumerate() {
                x[[row, j]] = numeric_cell(record, feature, row)?;
            }
            y[row] = numeric_cell(record, target, row)?;
        }

        Ok(Self {
            features: features.to_vec(),
            target: target.to_string(),
            x,
            y,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

fn numeric_cell(record: &Record, column: &str, row: usize) -> IvResult<f64> {
    let non_numeric = |value: String| DataError::NonNumeric {
        column: column.to_string(),
        row,
        value,
    };

    let parsed = match record.get(column) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(other) => return Err(non_numeric(other.to_string()).into()),
        None => return Err(non_numeric("null".to_string()).into()),
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(non_numeric(record.get(column).map(Value::to_string).unwrap_or_default()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iv_types::IvError;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn builds_matrix_in_feature_order() {
        let rows = records(json!([
            {"a": 1.0, "b": 10, "y": 0.5},
            {"a": 2.0, "b": 20, "y": 1.5},
            {"a": 3.0, "b": 30, "y": 2.5}
        ]));
        let ds = Dataset::from_records(&rows, &names(&["b", "a"]), "y").unwrap();

        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.x[[0, 0]], 10.0);
        assert_eq!(ds.x[[2, 1]], 3.0);
        assert_eq!(ds.y[1], 1.5);
    }

    #[test]
    fn accepts_numeric_strings() {
        let rows = records(json!([
            {"a": " 4.25 ", "y": "7"},
            {"a": "-1e2", "y": 8}
        ]));
        let ds = Dataset::from_records(&rows, &names(&["a"]), "y").unwrap();
        assert_eq!(ds.x[[0, 0]], 4.25);
        assert_eq!(ds.x[[1, 0]], -100.0);
        assert_eq!(ds.y[0], 7.0);
    }

    #[test]
    fn missing_column_is_reported() {
        let rows = records(json!([{"a": 1, "y": 2}]));
        let err = Dataset::from_records(&rows, &names(&["a", "b"]), "y").unwrap_err();
        match err {
            IvError::Data(DataError::ColumnNotFound { column }) => assert_eq!(column, "b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_cell_is_reported_with_row() {
        let rows = records(json!([
            {"a": 1, "y": 2},
            {"a": "n/a", "y": 3}
        ]));
        let err = Dataset::from_records(&rows, &names(&["a"]), "y").unwrap_err();
        match err {
            IvError::Data(DataError::NonNumeric { column, row, .. }) => {
                assert_eq!(column, "a");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn null_and_missing_cells_are_rejected() {
        let rows = records(json!([{"a": 1, "y": 2}, {"a": null, "y": 3}]));
        assert!(Dataset::from_records(&rows, &names(&["a"]), "y").is_err());

        let rows = records(json!([{"a": 1, "y": 2}, {"y": 3}]));
        assert!(Dataset::from_records(&rows, &names(&["a"]), "y").is_err());
    }

    #[test]
    fn empty_records_are_rejected() {
        let err = Dataset::from_records(&[], &names(&["a"]), "y").unwrap_err();
        assert!(matches!(err, IvError::Data(DataError::Empty)));
    }
}
