use std::path::Path;

use serde_json::{Number, Value};

use iv_types::{DataError, IvResult};

use crate::dataset::Record;

/// Reads delimited text files into the same row records the HTTP API accepts.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    delimiter: u8,
}

impl CsvLoader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load every row of a headed CSV file.
    ///
    /// Cells that parse as finite numbers become JSON numbers; anything else
    /// stays a string so [`crate::Dataset::from_records`] can report it.
    pub fn load_records<P: AsRef<Path>>(&self, file_path: P) -> IvResult<Vec<Record>> {
        let path = file_path.as_ref();
        tracing::info!("Loading CSV data from: {}", path.display());

        if !path.exists() {
            return Err(DataError::LoadingFailed {
                message: format!("File not found: {}", path.display()),
            }
            .into());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .has_headers(true)
            .from_path(path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open {}: {}", path.display(), e),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV header: {}", e),
            })?
            .clone();

        let mut records = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let row = result.map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to parse CSV record {}: {}", line + 1, e),
            })?;

            let record: Record = headers
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.to_string(), cell_value(cell)))
                .collect();
            records.push(record);
        }

        if records.is_empty() {
            return Err(DataError::Empty.into());
        }

        tracing::info!("Loaded {} rows from CSV file: {}", records.len(), path.display());
        Ok(records)
    }
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_value(cell: &str) -> Value {
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}
