//! Behavior label recoding
//!
//! Rewrites free-text behavior labels to canonical codes. Every label must be claimed
//! by exactly one synonym: a label matched twice means the table is ambiguous, and a
//! label never matched means the table is incomplete. Both abort the recode.

use crate::codes::{BehaviorCode, BEHAVIOR_CODES};
use crate::error::ProcessingError;
use crate::types::{RawTransitionRow, RecodedTransitionRow};
use tracing::debug;

/// Column names used when reporting recoding failures
pub const BEFORE_COLUMN: &str = "Beh Before";
pub const AFTER_COLUMN: &str = "Beh After";

/// Recode labels against `table`, preserving length and order.
///
/// Codes and their synonyms are visited in table order; the first row claimed twice
/// fails with [`ProcessingError::DuplicateLabelAssignment`]. Rows left unclaimed are
/// all reported in one [`ProcessingError::UnrecognizedLabel`].
pub fn recode_labels<'t, L, S>(
    labels: &[L],
    table: &[(BehaviorCode, S)],
) -> Result<Vec<BehaviorCode>, ProcessingError>
where
    L: AsRef<str>,
    S: AsRef<[&'t str]>,
{
    let mut assigned: Vec<Option<BehaviorCode>> = vec![None; labels.len()];

    for (code, synonyms) in table {
        for synonym in synonyms.as_ref() {
            for (row, label) in labels.iter().enumerate() {
                if label.as_ref() != *synonym {
                    continue;
                }
                if assigned[row].is_some() {
                    return Err(ProcessingError::DuplicateLabelAssignment {
                        row,
                        label: label.as_ref().to_string(),
                        code: *code,
                    });
                }
                assigned[row] = Some(*code);
            }
        }
    }

    let (rows, unmatched): (Vec<usize>, Vec<String>) = assigned
        .iter()
        .zip(labels)
        .enumerate()
        .filter(|(_, (code, _))| code.is_none())
        .map(|(row, (_, label))| (row, label.as_ref().to_string()))
        .unzip();

    if !rows.is_empty() {
        return Err(ProcessingError::UnrecognizedLabel {
            rows,
            labels: unmatched,
        });
    }

    Ok(assigned.into_iter().flatten().collect())
}

/// Recode both behavior columns of spreadsheet rows with [`BEHAVIOR_CODES`]
pub fn recode_rows(rows: &[RawTransitionRow]) -> Result<Vec<RecodedTransitionRow>, ProcessingError> {
    recode_rows_with(rows, BEHAVIOR_CODES)
}

/// Recode both behavior columns of spreadsheet rows with a custom table
pub fn recode_rows_with<'t, S>(
    rows: &[RawTransitionRow],
    table: &[(BehaviorCode, S)],
) -> Result<Vec<RecodedTransitionRow>, ProcessingError>
where
    S: AsRef<[&'t str]>,
{
    let before_labels: Vec<&str> = rows.iter().map(|r| r.behavior_before.as_str()).collect();
    let after_labels: Vec<&str> = rows.iter().map(|r| r.behavior_after.as_str()).collect();

    let before = recode_labels(&before_labels, table).map_err(|e| e.in_column(BEFORE_COLUMN))?;
    let after = recode_labels(&after_labels, table).map_err(|e| e.in_column(AFTER_COLUMN))?;

    debug!(rows = rows.len(), "Recoded behavior columns");

    Ok(rows
        .iter()
        .zip(before)
        .zip(after)
        .map(|((row, behavior_before), behavior_after)| RecodedTransitionRow {
            subject_id: row.subject_id.clone(),
            behavior_before,
            behavior_after,
            target_site: row.target_site.clone(),
            transition_time: row.transition_time,
            interval_time: row.interval_time,
        })
        .collect())
}
