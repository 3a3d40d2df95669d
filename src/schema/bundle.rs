//! Activity array bundles
//!
//! Activity extracted in MATLAB reaches us as a JSON object mapping variable names to
//! nested arrays: one 2-D block per subject for each activity phase, plus either an
//! annotation blob or a list of specimen ids.

use crate::error::ProcessingError;
use crate::types::ActivitySets;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bundle variable names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    /// Activity before the manipulation
    pub before: String,
    /// Activity during the manipulation
    pub during: String,
    /// Activity after the manipulation
    pub after: String,
    /// Per-subject annotation blob: behavior pairs followed by the subject id
    pub annotations: String,
    /// MATLAB-style specimen ids, one per subject
    pub specimen_ids: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            before: "activityPreManipulationSet".to_string(),
            during: "activityDurManipulationSet".to_string(),
            after: "activityPostManipulationSet".to_string(),
            annotations: "transitions".to_string(),
            specimen_ids: "newTransitions".to_string(),
        }
    }
}

/// Behavior pairs and id for one subject, as stored in an annotation blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnnotation {
    pub subject_id: String,
    /// (before, after) labels in event order, not yet recoded
    pub pairs: Vec<(String, String)>,
}

/// Loaded array bundle
#[derive(Debug, Clone, Default)]
pub struct ActivityBundle {
    variables: Map<String, Value>,
}

impl ActivityBundle {
    /// Parse a bundle from a JSON object
    pub fn from_json(json: &str) -> Result<Self, ProcessingError> {
        match serde_json::from_str(json)? {
            Value::Object(variables) => Ok(Self { variables }),
            _ => Err(ProcessingError::ParseError(
                "Activity bundle must be a JSON object of variables".to_string(),
            )),
        }
    }

    pub fn from_map(variables: Map<String, Value>) -> Self {
        Self { variables }
    }

    /// Names of all variables in the bundle
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variable(&self, name: &str) -> Result<&Value, ProcessingError> {
        self.variables
            .get(name)
            .ok_or_else(|| ProcessingError::MissingVariable(name.to_string()))
    }

    /// Read the before/during/after activity blocks.
    ///
    /// Shapes are not cross-checked here; that is the table builder's job.
    pub fn activity_sets(&self, names: &VariableNames) -> Result<ActivitySets, ProcessingError> {
        Ok(ActivitySets {
            before: self.blocks(&names.before)?,
            during: self.blocks(&names.during)?,
            after: self.blocks(&names.after)?,
        })
    }

    /// Read MATLAB-style specimen ids
    pub fn specimen_ids(&self, name: &str) -> Result<Vec<String>, ProcessingError> {
        subject_entries(self.variable(name)?, name)?
            .iter()
            .enumerate()
            .map(|(subject, value)| {
                scalar_text(value).ok_or_else(|| {
                    ProcessingError::ParseError(format!(
                        "{}[{}]: specimen id must be a string",
                        name, subject
                    ))
                })
            })
            .collect()
    }

    /// Read an annotation blob.
    ///
    /// Each subject entry is a list of `[before, after]` label pairs whose final element
    /// is the subject id.
    pub fn annotations(&self, name: &str) -> Result<Vec<RawAnnotation>, ProcessingError> {
        subject_entries(self.variable(name)?, name)?
            .iter()
            .enumerate()
            .map(|(subject, entry)| parse_annotation(entry, name, subject))
            .collect()
    }

    fn blocks(&self, name: &str) -> Result<Vec<Array2<f64>>, ProcessingError> {
        subject_entries(self.variable(name)?, name)?
            .iter()
            .enumerate()
            .map(|(subject, value)| parse_block(value, name, subject))
            .collect()
    }
}

fn subject_entries<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>, ProcessingError> {
    value.as_array().ok_or_else(|| {
        ProcessingError::ParseError(format!("{} must be an array with one entry per subject", name))
    })
}

/// Parse one subject's block. `null` cells become NaN so the NaN check sees them.
///
/// A flat array of numbers is a single-neuron block.
fn parse_block(value: &Value, name: &str, subject: usize) -> Result<Array2<f64>, ProcessingError> {
    let context = |msg: &str| ProcessingError::ParseError(format!("{}[{}]: {}", name, subject, msg));

    let rows = value.as_array().ok_or_else(|| context("block must be an array"))?;
    let rows: Vec<&Value> = if rows.iter().all(|v| !v.is_array()) && !rows.is_empty() {
        vec![value]
    } else {
        rows.iter().collect()
    };

    let ncols = rows
        .first()
        .and_then(|r| r.as_array())
        .map_or(0, Vec::len);
    let mut data = Vec::with_capacity(rows.len() * ncols);

    for (r, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| context(&format!("row {} is not an array", r)))?;
        if cells.len() != ncols {
            return Err(context(&format!(
                "row {} has {} columns, expected {}",
                r,
                cells.len(),
                ncols
            )));
        }
        for cell in cells {
            data.push(match cell {
                Value::Null => f64::NAN,
                Value::Number(n) => n
                    .as_f64()
                    .ok_or_else(|| context(&format!("row {} has a non-finite number", r)))?,
                _ => return Err(context(&format!("row {} has a non-numeric cell", r))),
            });
        }
    }

    Array2::from_shape_vec((rows.len(), ncols), data).map_err(|e| context(&e.to_string()))
}

fn parse_annotation(entry: &Value, name: &str, subject: usize) -> Result<RawAnnotation, ProcessingError> {
    let context = |msg: &str| ProcessingError::ParseError(format!("{}[{}]: {}", name, subject, msg));

    let items = entry
        .as_array()
        .ok_or_else(|| context("annotation must be an array"))?;
    let (id, pairs) = items
        .split_last()
        .ok_or_else(|| context("annotation is empty; expected the subject id as last element"))?;

    let subject_id = scalar_text(id).ok_or_else(|| context("last element must be the subject id"))?;

    let pairs = pairs
        .iter()
        .enumerate()
        .map(|(event, pair)| match pair.as_array().map(Vec::as_slice) {
            Some([before, after]) => match (before.as_str(), after.as_str()) {
                (Some(b), Some(a)) => Ok((b.to_string(), a.to_string())),
                _ => Err(context(&format!("event {} labels must be strings", event))),
            },
            _ => Err(context(&format!("event {} must be a [before, after] pair", event))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawAnnotation { subject_id, pairs })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
