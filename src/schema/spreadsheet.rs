//! Annotation spreadsheet rows
//!
//! The spreadsheet reader hands rows over as JSON objects keyed by the sheet's own
//! column headers. This module maps those headers onto [`RawTransitionRow`] fields.

use crate::error::ProcessingError;
use crate::types::RawTransitionRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sheet holding the final transition annotations
pub const DEFAULT_SHEET_NAME: &str = "For Will";

/// Spreadsheet header for each logical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    /// Header of the sample id column (renamed to "Smp ID")
    pub subject_id: String,
    /// Header of the preceding behavior column (renamed to "Beh Before")
    pub behavior_before: String,
    /// Header of the succeeding behavior column (renamed to "Beh After")
    pub behavior_after: String,
    /// Header of the target site column (renamed to "Tgt Site")
    pub target_site: String,
    /// Header of the transition time column (renamed to "Trans Time")
    pub transition_time: String,
    /// Header of the interval time column (renamed to "Int Time")
    pub interval_time: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            subject_id: "Date and sample".to_string(),
            behavior_before: "Precede Behavior".to_string(),
            behavior_after: "Succeed Behavior".to_string(),
            target_site: "target site".to_string(),
            transition_time: "transition time".to_string(),
            interval_time: "interval time".to_string(),
        }
    }
}

/// Adapter from spreadsheet JSON to raw transition rows
pub struct SpreadsheetAdapter;

impl SpreadsheetAdapter {
    /// Parse spreadsheet rows.
    ///
    /// Accepts either a JSON array of row objects, or a workbook object mapping sheet
    /// names to such arrays, in which case `sheet_name` (default [`DEFAULT_SHEET_NAME`])
    /// selects the sheet.
    pub fn parse_rows(
        json: &str,
        columns: &ColumnMap,
        sheet_name: Option<&str>,
    ) -> Result<Vec<RawTransitionRow>, ProcessingError> {
        let value: Value = serde_json::from_str(json)?;
        let sheet_name = sheet_name.unwrap_or(DEFAULT_SHEET_NAME);

        let records = match &value {
            Value::Array(records) => records,
            Value::Object(workbook) => workbook
                .get(sheet_name)
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ProcessingError::ParseError(format!("Sheet '{}' not found in workbook", sheet_name))
                })?,
            _ => {
                return Err(ProcessingError::ParseError(
                    "Expected an array of rows or a workbook object".to_string(),
                ))
            }
        };

        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let record = record.as_object().ok_or_else(|| {
                    ProcessingError::ParseError(format!("Row {} is not an object", index))
                })?;
                row_from_record(index, record, columns)
            })
            .collect()
    }
}

fn row_from_record(
    index: usize,
    record: &Map<String, Value>,
    columns: &ColumnMap,
) -> Result<RawTransitionRow, ProcessingError> {
    let cell = |header: &str| {
        record
            .get(header)
            .ok_or_else(|| ProcessingError::MissingColumn(format!("{} (row {})", header, index)))
    };

    Ok(RawTransitionRow {
        subject_id: text_cell(cell(&columns.subject_id)?),
        behavior_before: text_cell(cell(&columns.behavior_before)?),
        behavior_after: text_cell(cell(&columns.behavior_after)?),
        target_site: text_cell(cell(&columns.target_site)?),
        transition_time: numeric_cell(cell(&columns.transition_time)?, &columns.transition_time, index)?,
        interval_time: numeric_cell(cell(&columns.interval_time)?, &columns.interval_time, index)?,
    })
}

/// Text cells are taken verbatim; behavior labels must keep their spacing for recoding.
fn text_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Blank numeric cells become NaN
fn numeric_cell(value: &Value, header: &str, index: usize) -> Result<f64, ProcessingError> {
    let invalid = || {
        ProcessingError::ParseError(format!(
            "Row {}: column '{}' is not numeric: {}",
            index, header, value
        ))
    };

    match value {
        Value::Null => Ok(f64::NAN),
        Value::Number(n) => n.as_f64().ok_or_else(invalid),
        Value::String(s) if s.trim().is_empty() => Ok(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
