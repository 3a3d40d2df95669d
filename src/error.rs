//! Error types for VNC Flux

use crate::codes::BehaviorCode;
use crate::types::ActivityPhase;
use serde::Serialize;
use thiserror::Error;

/// Broad class of a failure.
///
/// Everything except `Input` is a dataset-integrity problem that has to be fixed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Subject, event, ROI or time-point counts disagree across sources
    ShapeMismatch,
    /// Neuron ordering disagrees across activity blocks
    OrderMismatch,
    /// NaN found in activity data
    NonFiniteValue,
    /// A behavior label is unrecognized or matched more than once
    LabelCoverage,
    /// Malformed or incomplete input
    Input,
}

/// Errors that can occur while recoding, validating or assembling data
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Missing bundle variable: {0}")]
    MissingVariable(String),

    #[error("Invalid specimen id: {0}")]
    InvalidSpecimenId(String),

    #[error("No transitions found for subject {subject_id}")]
    MissingTransitions { subject_id: String },

    #[error("Caught double label: row {row} ({label:?}) matched again by code {code}")]
    DuplicateLabelAssignment {
        row: usize,
        label: String,
        code: BehaviorCode,
    },

    #[error("Unable to recognize {} label(s) {labels:?} at rows {rows:?}", .rows.len())]
    UnrecognizedLabel { rows: Vec<usize>, labels: Vec<String> },

    #[error("Column {column}: {source}")]
    InColumn {
        column: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Different number of subjects: {left} has {left_count}, {right} has {right_count}")]
    SubjectCountMismatch {
        left: String,
        left_count: usize,
        right: String,
        right_count: usize,
    },

    #[error("Subject {subject}: {origin} has {actual} events but {expected} were expected")]
    EventCountMismatch {
        subject: usize,
        origin: String,
        expected: usize,
        actual: usize,
    },

    #[error("Subject {subject}: {block} activity has no cell id column")]
    EmptyBlock { subject: usize, block: ActivityPhase },

    #[error("Subject {subject}: {block} activity lists neurons in a different order than before activity")]
    NeuronOrderMismatch { subject: usize, block: ActivityPhase },

    #[error("Caught NaN in {block} activity for subject {subject} (row {row}, column {column})")]
    NonFiniteActivity {
        subject: usize,
        block: ActivityPhase,
        row: usize,
        column: usize,
    },

    #[error("Dataset has {expected} images but found {actual} data points in {series}")]
    TimePointMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("Group {group} has {expected} ROIs but found {actual} ROIs in {series}")]
    RoiCountMismatch {
        group: String,
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("Time series {0} defined more than once")]
    DuplicateSeries(String),

    #[error("Frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),

    #[error("ROI {roi}: {statistic} has {actual} entries but there are {expected} transitions")]
    StatisticLengthMismatch {
        roi: usize,
        statistic: String,
        expected: usize,
        actual: usize,
    },

    #[error("ROI {roi}: missing statistic {statistic}")]
    MissingStatistic { roi: usize, statistic: String },
}

impl ProcessingError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::DuplicateLabelAssignment { .. }
            | ProcessingError::UnrecognizedLabel { .. } => ErrorKind::LabelCoverage,
            ProcessingError::InColumn { source, .. } => source.kind(),
            ProcessingError::SubjectCountMismatch { .. }
            | ProcessingError::EventCountMismatch { .. }
            | ProcessingError::EmptyBlock { .. }
            | ProcessingError::TimePointMismatch { .. }
            | ProcessingError::RoiCountMismatch { .. }
            | ProcessingError::StatisticLengthMismatch { .. } => ErrorKind::ShapeMismatch,
            ProcessingError::NeuronOrderMismatch { .. } => ErrorKind::OrderMismatch,
            ProcessingError::NonFiniteActivity { .. } => ErrorKind::NonFiniteValue,
            ProcessingError::ParseError(_)
            | ProcessingError::JsonError(_)
            | ProcessingError::MissingColumn(_)
            | ProcessingError::MissingVariable(_)
            | ProcessingError::InvalidSpecimenId(_)
            | ProcessingError::MissingTransitions { .. }
            | ProcessingError::DuplicateSeries(_)
            | ProcessingError::InvalidFrameRate(_)
            | ProcessingError::MissingStatistic { .. } => ErrorKind::Input,
        }
    }

    /// Attach the name of the column being recoded
    pub(crate) fn in_column(self, column: &str) -> Self {
        ProcessingError::InColumn {
            column: column.to_string(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_context_keeps_kind() {
        let err = ProcessingError::UnrecognizedLabel {
            rows: vec![2],
            labels: vec!["wiggle".to_string()],
        }
        .in_column("Beh After");

        assert_eq!(err.kind(), ErrorKind::LabelCoverage);
        assert!(err.to_string().starts_with("Column Beh After:"));
    }

    #[test]
    fn test_messages_name_the_subject() {
        let err = ProcessingError::NonFiniteActivity {
            subject: 3,
            block: ActivityPhase::During,
            row: 0,
            column: 4,
        };
        assert_eq!(err.kind(), ErrorKind::NonFiniteValue);
        assert!(err.to_string().contains("during activity for subject 3"));
    }
}
