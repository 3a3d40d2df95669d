//! Core types for the VNC Flux pipeline
//!
//! This module defines the data structures that flow through each stage:
//! raw spreadsheet rows, recoded rows, per-subject transitions, activity blocks,
//! flat activity rows and the output documents.

use crate::codes::BehaviorCode;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window of neural activity relative to a manipulation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPhase {
    Before,
    During,
    After,
}

impl ActivityPhase {
    pub const ALL: [ActivityPhase; 3] = [
        ActivityPhase::Before,
        ActivityPhase::During,
        ActivityPhase::After,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityPhase::Before => "before",
            ActivityPhase::During => "during",
            ActivityPhase::After => "after",
        }
    }
}

impl fmt::Display for ActivityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed behavioral event as read from the annotation spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransitionRow {
    /// Specimen id in spreadsheet format (e.g. "CW_17-08-24-L1")
    pub subject_id: String,
    /// Free-text behavior preceding the stimulus
    pub behavior_before: String,
    /// Free-text behavior following the stimulus
    pub behavior_after: String,
    /// Site targeted for perturbation
    pub target_site: String,
    /// Time from stimulus to the succeeding behavior (NaN when blank)
    pub transition_time: f64,
    /// Interval time (NaN when blank)
    pub interval_time: f64,
}

/// A spreadsheet row with both behavior columns mapped to canonical codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecodedTransitionRow {
    pub subject_id: String,
    pub behavior_before: BehaviorCode,
    pub behavior_after: BehaviorCode,
    pub target_site: String,
    pub transition_time: f64,
    pub interval_time: f64,
}

/// Ordered behavior pair around a single manipulation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub before: BehaviorCode,
    pub after: BehaviorCode,
}

impl Transition {
    pub fn new(before: BehaviorCode, after: BehaviorCode) -> Self {
        Self { before, after }
    }

    /// Name used to key renderer statistics, e.g. "F_Q"
    pub fn pair_name(&self) -> String {
        format!("{}_{}", self.before, self.after)
    }
}

/// The ordered transitions recorded for one subject.
///
/// Event index is the position in `transitions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAnnotation {
    pub subject_id: String,
    pub transitions: Vec<Transition>,
}

/// Activity for every subject, one 2-D block per subject and phase.
///
/// Each block row is a neuron: column 0 holds the cell id, columns 1.. hold one value
/// per event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivitySets {
    pub before: Vec<Array2<f64>>,
    pub during: Vec<Array2<f64>>,
    pub after: Vec<Array2<f64>>,
}

impl ActivitySets {
    /// Blocks for a single phase
    pub fn phase(&self, phase: ActivityPhase) -> &[Array2<f64>] {
        match phase {
            ActivityPhase::Before => &self.before,
            ActivityPhase::During => &self.during,
            ActivityPhase::After => &self.after,
        }
    }

    /// Number of subjects, taken from the before blocks
    pub fn n_subjects(&self) -> usize {
        self.before.len()
    }
}

/// Common representation both input adapters converge on
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDataset {
    pub activity: ActivitySets,
    /// Annotations in the same subject order as `activity`
    pub subjects: Vec<SubjectAnnotation>,
}

/// Activity of one neuron during one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    pub subject_id: String,
    pub cell_id: f64,
    /// Order of the event within the experiment, starting at 0
    pub event_id: usize,
    pub beh_before: BehaviorCode,
    pub beh_after: BehaviorCode,
    /// Delta F/F before the event
    pub dff_before: f64,
    /// Delta F/F during the event
    pub dff_during: f64,
    /// Delta F/F after the event
    pub dff_after: f64,
}

// ============================================================================
// Output documents
// ============================================================================

/// Producer metadata stamped on every output document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Serialized activity table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTableDocument {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub n_subjects: usize,
    pub n_rows: usize,
    pub rows: Vec<ActivityRow>,
}

/// Serialized subject-count matrix.
///
/// `counts[i][j]` is the number of subjects showing `behaviors[i]` → `behaviors[j]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountMatrixDocument {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub behaviors: Vec<BehaviorCode>,
    pub counts: Vec<Vec<usize>>,
}
