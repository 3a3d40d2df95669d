//! Activity table construction
//!
//! Cross-joins per-neuron activity with per-subject transitions into one long-format
//! table: one row per (subject, neuron, event). All integrity checks run before any
//! row is built, and any failure aborts the whole table.

use crate::error::ProcessingError;
use crate::types::{ActivityDataset, ActivityPhase, ActivityRow, ActivitySets};
use ndarray::Array2;
use std::collections::HashSet;
use tracing::{debug, info};

/// Flat activity table in subject × neuron × event order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityTable {
    rows: Vec<ActivityRow>,
}

impl ActivityTable {
    /// Wrap rows that were built or decoded elsewhere
    pub fn from_rows(rows: Vec<ActivityRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ActivityRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ActivityRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct subjects present in the table
    pub fn n_subjects(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.subject_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Builder for the flat activity table
pub struct ActivityTableBuilder;

impl ActivityTableBuilder {
    /// Validate activity blocks alone.
    ///
    /// Checks, in order: every phase has as many subjects as the before phase, every
    /// block of a subject has the same event count, no value is NaN, and the cell id
    /// column matches across phases. Returns the event count per subject.
    pub fn validate_activity(activity: &ActivitySets) -> Result<Vec<usize>, ProcessingError> {
        let n_subjects = activity.n_subjects();
        let n_events = activity
            .before
            .iter()
            .enumerate()
            .map(|(subject, block)| events_in(block, subject, ActivityPhase::Before))
            .collect::<Result<Vec<_>, _>>()?;

        for phase in ActivityPhase::ALL {
            let blocks = activity.phase(phase);

            if blocks.len() != n_subjects {
                return Err(ProcessingError::SubjectCountMismatch {
                    left: "before activity".to_string(),
                    left_count: n_subjects,
                    right: format!("{} activity", phase),
                    right_count: blocks.len(),
                });
            }

            for (subject, block) in blocks.iter().enumerate() {
                let actual = events_in(block, subject, phase)?;
                if actual != n_events[subject] {
                    return Err(ProcessingError::EventCountMismatch {
                        subject,
                        origin: format!("{} activity", phase),
                        expected: n_events[subject],
                        actual,
                    });
                }
            }

            for (subject, block) in blocks.iter().enumerate() {
                if let Some(((row, column), _)) = block.indexed_iter().find(|(_, v)| v.is_nan()) {
                    return Err(ProcessingError::NonFiniteActivity {
                        subject,
                        block: phase,
                        row,
                        column,
                    });
                }
            }
        }

        for subject in 0..n_subjects {
            let cell_ids = activity.before[subject].column(0);
            for phase in [ActivityPhase::During, ActivityPhase::After] {
                if activity.phase(phase)[subject].column(0) != cell_ids {
                    return Err(ProcessingError::NeuronOrderMismatch {
                        subject,
                        block: phase,
                    });
                }
            }
        }

        Ok(n_events)
    }

    /// Validate activity blocks against the annotations.
    ///
    /// Runs [`Self::validate_activity`], then requires one annotation per subject and one
    /// transition per recorded event.
    pub fn validate(dataset: &ActivityDataset) -> Result<Vec<usize>, ProcessingError> {
        let n_events = Self::validate_activity(&dataset.activity)?;

        if dataset.subjects.len() != n_events.len() {
            return Err(ProcessingError::SubjectCountMismatch {
                left: "activity".to_string(),
                left_count: n_events.len(),
                right: "annotations".to_string(),
                right_count: dataset.subjects.len(),
            });
        }

        for (subject, (annotation, &expected)) in dataset.subjects.iter().zip(&n_events).enumerate() {
            if annotation.transitions.len() != expected {
                return Err(ProcessingError::EventCountMismatch {
                    subject,
                    origin: format!("annotations for {}", annotation.subject_id),
                    expected,
                    actual: annotation.transitions.len(),
                });
            }
        }

        Ok(n_events)
    }

    /// Validate and build the flat table.
    ///
    /// Rows are emitted subject by subject, then neuron by neuron in block row order,
    /// then event by event. The output buffer is sized exactly before filling.
    pub fn build(dataset: &ActivityDataset) -> Result<ActivityTable, ProcessingError> {
        let n_events = Self::validate(dataset)?;
        let activity = &dataset.activity;

        let total_rows: usize = activity
            .before
            .iter()
            .zip(&n_events)
            .map(|(block, &events)| block.nrows() * events)
            .sum();

        let mut rows = Vec::with_capacity(total_rows);

        for (subject, annotation) in dataset.subjects.iter().enumerate() {
            let before = &activity.before[subject];
            let during = &activity.during[subject];
            let after = &activity.after[subject];

            for neuron in 0..before.nrows() {
                let cell_id = before[[neuron, 0]];
                for (event, transition) in annotation.transitions.iter().enumerate() {
                    rows.push(ActivityRow {
                        subject_id: annotation.subject_id.clone(),
                        cell_id,
                        event_id: event,
                        beh_before: transition.before,
                        beh_after: transition.after,
                        dff_before: before[[neuron, event + 1]],
                        dff_during: during[[neuron, event + 1]],
                        dff_after: after[[neuron, event + 1]],
                    });
                }
            }

            debug!(
                subject = %annotation.subject_id,
                neurons = before.nrows(),
                events = annotation.transitions.len(),
                "Added subject to activity table"
            );
        }

        info!(
            subjects = dataset.subjects.len(),
            rows = rows.len(),
            "Built activity table"
        );

        Ok(ActivityTable { rows })
    }
}

/// Event count of a block: every column after the cell id column
fn events_in(block: &Array2<f64>, subject: usize, phase: ActivityPhase) -> Result<usize, ProcessingError> {
    block
        .ncols()
        .checked_sub(1)
        .ok_or(ProcessingError::EmptyBlock { subject, block: phase })
}
