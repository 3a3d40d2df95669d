//! Subject counts per transition
//!
//! Reduces a flat activity table to a before × after matrix whose cells count distinct
//! subjects, not rows: a subject with many neurons showing a transition counts once.

use crate::codes::BehaviorCode;
use crate::transitions::SubjectTransitions;
use crate::types::ActivityRow;
use ndarray::Array2;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Square matrix of subject counts.
///
/// Rows are the before-behavior and columns the after-behavior, both indexed by
/// `behaviors`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCountMatrix {
    behaviors: Vec<BehaviorCode>,
    counts: Array2<usize>,
}

impl TransitionCountMatrix {
    pub fn behaviors(&self) -> &[BehaviorCode] {
        &self.behaviors
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Count for a single transition, `None` if either behavior is not an axis label
    pub fn get(&self, before: BehaviorCode, after: BehaviorCode) -> Option<usize> {
        let i = self.behaviors.iter().position(|&b| b == before)?;
        let j = self.behaviors.iter().position(|&b| b == after)?;
        Some(self.counts[[i, j]])
    }

    /// Counts as nested rows, for serialization
    pub fn to_rows(&self) -> Vec<Vec<usize>> {
        self.counts.outer_iter().map(|row| row.to_vec()).collect()
    }
}

/// Aggregator for subject counts per transition
pub struct SubjectCountAggregator;

impl SubjectCountAggregator {
    /// Count subjects per transition in a flat table.
    ///
    /// With `behaviors` unset, the axes are the sorted union of every observed before-
    /// and after-behavior.
    pub fn from_rows(
        rows: &[ActivityRow],
        behaviors: Option<&[BehaviorCode]>,
    ) -> TransitionCountMatrix {
        Self::count(
            rows.iter()
                .map(|r| (r.subject_id.as_str(), r.beh_before, r.beh_after)),
            behaviors,
        )
    }

    /// Count subjects per transition straight from extracted transitions
    pub fn from_transitions(
        transitions: &SubjectTransitions,
        behaviors: Option<&[BehaviorCode]>,
    ) -> TransitionCountMatrix {
        Self::count(
            transitions.iter().flat_map(|s| {
                s.transitions
                    .iter()
                    .map(move |t| (s.subject_id.as_str(), t.before, t.after))
            }),
            behaviors,
        )
    }

    fn count<'a, I>(observations: I, behaviors: Option<&[BehaviorCode]>) -> TransitionCountMatrix
    where
        I: Iterator<Item = (&'a str, BehaviorCode, BehaviorCode)>,
    {
        let mut subjects: HashMap<(BehaviorCode, BehaviorCode), HashSet<&'a str>> = HashMap::new();
        let mut observed = BTreeSet::new();

        for (subject_id, before, after) in observations {
            observed.insert(before);
            observed.insert(after);
            subjects.entry((before, after)).or_default().insert(subject_id);
        }

        let behaviors: Vec<BehaviorCode> = match behaviors {
            Some(explicit) => explicit.to_vec(),
            None => observed.into_iter().collect(),
        };

        let n = behaviors.len();
        let counts = Array2::from_shape_fn((n, n), |(i, j)| {
            subjects
                .get(&(behaviors[i], behaviors[j]))
                .map_or(0, HashSet::len)
        });

        debug!(
            behaviors = n,
            transitions = subjects.len(),
            "Counted subjects per transition"
        );

        TransitionCountMatrix { behaviors, counts }
    }
}
