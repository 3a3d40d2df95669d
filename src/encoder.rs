//! Output encoding
//!
//! This module wraps activity tables and count matrices into documents stamped with
//! producer metadata, and reads activity rows back from any of the shapes it writes.

use crate::aggregate::TransitionCountMatrix;
use crate::error::ProcessingError;
use crate::table::ActivityTable;
use crate::types::{ActivityRow, ActivityTableDocument, CountMatrixDocument, Producer};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Encoder for activity tables and count matrices
pub struct TableEncoder {
    instance_id: String,
}

impl Default for TableEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    fn producer(&self) -> Producer {
        Producer {
            name: PRODUCER_NAME.to_string(),
            version: FLUX_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    pub fn encode_table(&self, table: &ActivityTable) -> ActivityTableDocument {
        ActivityTableDocument {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            n_subjects: table.n_subjects(),
            n_rows: table.len(),
            rows: table.rows().to_vec(),
        }
    }

    pub fn encode_counts(&self, matrix: &TransitionCountMatrix) -> CountMatrixDocument {
        CountMatrixDocument {
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            behaviors: matrix.behaviors().to_vec(),
            counts: matrix.to_rows(),
        }
    }

    /// Encode a table document to JSON string
    pub fn table_to_json(&self, table: &ActivityTable) -> Result<String, ProcessingError> {
        let document = self.encode_table(table);
        serde_json::to_string_pretty(&document).map_err(ProcessingError::JsonError)
    }

    /// Encode a count document to JSON string
    pub fn counts_to_json(&self, matrix: &TransitionCountMatrix) -> Result<String, ProcessingError> {
        let document = self.encode_counts(matrix);
        serde_json::to_string_pretty(&document).map_err(ProcessingError::JsonError)
    }
}

/// Read activity rows from a table document, a JSON array of rows, or NDJSON.
pub fn decode_rows(input: &str) -> Result<Vec<ActivityRow>, ProcessingError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(object)) if object.contains_key("rows") => {
            let document: ActivityTableDocument = serde_json::from_value(Value::Object(object))?;
            Ok(document.rows)
        }
        Ok(Value::Array(rows)) => Ok(serde_json::from_value(Value::Array(rows))?),
        Ok(value) => Ok(vec![serde_json::from_value(value)?]),
        Err(_) => trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| ProcessingError::ParseError(format!("Line {}: {}", i + 1, e)))
            })
            .collect(),
    }
}
