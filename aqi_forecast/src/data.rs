//! Time series data handling for forecasting

use crate::error::{ForecastError, Result};
use aqi_math::MinMaxRange;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Named, ordered series of hourly readings
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series, rejecting non-finite readings
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Reading {} is not a finite number",
                pos
            )));
        }
        Ok(Self {
            name: name.into(),
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The most recent `n` readings (or all of them when fewer exist)
    pub fn tail(&self, n: usize) -> &[f64] {
        &self.values[self.values.len().saturating_sub(n)..]
    }

    /// Observed min/max
    pub fn range(&self) -> Result<MinMaxRange> {
        Ok(MinMaxRange::from_values(&self.values)?)
    }
}

/// Loader for series stored as CSV
#[derive(Debug)]
pub struct SeriesLoader;

impl SeriesLoader {
    /// Load a series from a CSV file with a header row.
    ///
    /// When `column` is `None`, the first header containing `aqi` or `value`
    /// (case-insensitive) is used.
    pub fn from_csv<P: AsRef<Path>>(path: P, column: Option<&str>) -> Result<TimeSeries> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("series")
            .to_string();
        let file = File::open(path)?;
        Self::from_reader(name, file, column)
    }

    /// Load a series from any CSV source
    pub fn from_reader<R: Read>(
        name: impl Into<String>,
        reader: R,
        column: Option<&str>,
    ) -> Result<TimeSeries> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let index = match column {
            Some(wanted) => headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| {
                    ForecastError::DataError(format!("Column '{}' not found", wanted))
                })?,
            None => Self::detect_value_column(&headers)?,
        };

        let mut values = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let field = record.get(index).ok_or_else(|| {
                ForecastError::DataError(format!("Row {} has no column {}", line + 1, index))
            })?;
            let value = field.parse::<f64>().map_err(|_| {
                ForecastError::DataError(format!(
                    "Row {}: '{}' is not a number",
                    line + 1,
                    field
                ))
            })?;
            values.push(value);
        }

        if values.is_empty() {
            return Err(ForecastError::DataError("No readings found".to_string()));
        }

        TimeSeries::new(name, values)
    }

    /// Detect the reading column in a header row
    fn detect_value_column(headers: &csv::StringRecord) -> Result<usize> {
        for key in ["aqi", "value"] {
            if let Some(pos) = headers
                .iter()
                .position(|h| h.to_lowercase().contains(key))
            {
                return Ok(pos);
            }
        }

        Err(ForecastError::DataError(
            "No AQI or value column found in data".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_aqi_column() {
        let csv = "timestamp,pm25_aqi,temp\n2024-01-01T00:00:00Z,140,28\n2024-01-01T01:00:00Z,132,27\n";
        let series = SeriesLoader::from_reader("thane", csv.as_bytes(), None).unwrap();

        assert_eq!(series.name(), "thane");
        assert_eq!(series.values(), &[140.0, 132.0]);
    }

    #[test]
    fn test_explicit_column() {
        let csv = "hour,temp,reading\n0,28,101\n1,27,99\n";
        let series = SeriesLoader::from_reader("x", csv.as_bytes(), Some("Reading")).unwrap();
        assert_eq!(series.values(), &[101.0, 99.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let no_column = "hour,temp\n0,28\n";
        assert!(SeriesLoader::from_reader("x", no_column.as_bytes(), None).is_err());

        let not_number = "aqi\n12\nhigh\n";
        assert!(SeriesLoader::from_reader("x", not_number.as_bytes(), None).is_err());

        let empty = "aqi\n";
        assert!(SeriesLoader::from_reader("x", empty.as_bytes(), None).is_err());
    }

    #[test]
    fn test_tail() {
        let series = TimeSeries::new("x", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(series.tail(2), &[3.0, 4.0]);
        assert_eq!(series.tail(10).len(), 4);
        assert!(TimeSeries::new("x", vec![1.0, f64::NAN]).is_err());
    }
}
