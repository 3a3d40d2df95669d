//! Transition extraction
//!
//! Groups recoded spreadsheet rows into per-subject transition sequences. Subjects keep
//! the order in which they first appear; events keep spreadsheet row order.

use crate::codes::BehaviorCode;
use crate::types::{RecodedTransitionRow, SubjectAnnotation, Transition};
use std::collections::HashMap;
use tracing::debug;

/// Per-subject transition sequences in first-occurrence order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectTransitions {
    subjects: Vec<SubjectAnnotation>,
    index: HashMap<String, usize>,
}

impl SubjectTransitions {
    /// Transitions for one subject, in event order
    pub fn get(&self, subject_id: &str) -> Option<&[Transition]> {
        self.index
            .get(subject_id)
            .map(|&i| self.subjects[i].transitions.as_slice())
    }

    /// Subject ids in first-occurrence order
    pub fn subject_ids(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|s| s.subject_id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectAnnotation> {
        self.subjects.iter()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn into_annotations(self) -> Vec<SubjectAnnotation> {
        self.subjects
    }

    fn push(&mut self, subject_id: &str, transition: Transition) {
        let slot = match self.index.get(subject_id) {
            Some(&i) => i,
            None => {
                self.subjects.push(SubjectAnnotation {
                    subject_id: subject_id.to_string(),
                    transitions: Vec::new(),
                });
                self.index
                    .insert(subject_id.to_string(), self.subjects.len() - 1);
                self.subjects.len() - 1
            }
        };
        self.subjects[slot].transitions.push(transition);
    }
}

/// Transition extractor for recoded spreadsheet rows
pub struct TransitionExtractor;

impl TransitionExtractor {
    /// Extract transitions with no cutoff
    pub fn extract(rows: &[RecodedTransitionRow]) -> SubjectTransitions {
        Self::extract_with_cutoff(rows, None)
    }

    /// Extract transitions, counting slow responses as quiet.
    ///
    /// A row whose transition time exceeds `cutoff_time` had no response within the
    /// observation window, so its after-behavior becomes [`BehaviorCode::Quiet`].
    /// `None` means no cutoff. A NaN transition time never exceeds the cutoff.
    pub fn extract_with_cutoff(
        rows: &[RecodedTransitionRow],
        cutoff_time: Option<f64>,
    ) -> SubjectTransitions {
        let cutoff = cutoff_time.unwrap_or(f64::INFINITY);
        let mut extracted = SubjectTransitions::default();
        let mut relabeled = 0usize;

        for row in rows {
            let after = if row.transition_time > cutoff {
                relabeled += 1;
                BehaviorCode::Quiet
            } else {
                row.behavior_after
            };
            extracted.push(&row.subject_id, Transition::new(row.behavior_before, after));
        }

        debug!(
            subjects = extracted.len(),
            events = rows.len(),
            relabeled_quiet = relabeled,
            "Extracted transitions"
        );

        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BehaviorCode::*;

    fn row(subject: &str, before: BehaviorCode, after: BehaviorCode, time: f64) -> RecodedTransitionRow {
        RecodedTransitionRow {
            subject_id: subject.to_string(),
            behavior_before: before,
            behavior_after: after,
            target_site: "A1".to_string(),
            transition_time: time,
            interval_time: 30.0,
        }
    }

    #[test]
    fn test_groups_by_first_occurrence_and_keeps_row_order() {
        let rows = vec![
            row("s2", Forward, Quiet, 1.0),
            row("s1", Backward, Hunch, 1.0),
            row("s2", Turn, Forward, 1.0),
            row("s2", Forward, Quiet, 1.0),
        ];
        let trans = TransitionExtractor::extract(&rows);

        let ids: Vec<&str> = trans.subject_ids().collect();
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(
            trans.get("s2").unwrap(),
            &[
                Transition::new(Forward, Quiet),
                Transition::new(Turn, Forward),
                Transition::new(Forward, Quiet),
            ]
        );
        assert_eq!(trans.get("s1").unwrap(), &[Transition::new(Backward, Hunch)]);
        assert!(trans.get("s3").is_none());
    }

    #[test]
    fn test_cutoff_relabels_after_behavior_as_quiet() {
        let rows = vec![
            row("s1", Forward, Backward, 2.5),
            row("s1", Forward, Backward, 0.5),
            row("s1", Quiet, Hunch, 2.0),
        ];
        let trans = TransitionExtractor::extract_with_cutoff(&rows, Some(2.0));

        assert_eq!(
            trans.get("s1").unwrap(),
            &[
                Transition::new(Forward, Quiet),
                Transition::new(Forward, Backward),
                Transition::new(Quiet, Hunch),
            ]
        );
    }

    #[test]
    fn test_nan_time_is_never_relabeled() {
        let rows = vec![row("s1", Turn, Backward, f64::NAN)];
        let trans = TransitionExtractor::extract_with_cutoff(&rows, Some(0.0));
        assert_eq!(trans.get("s1").unwrap()[0].after, Backward);
    }

    #[test]
    fn test_input_rows_are_not_modified() {
        let rows = vec![row("s1", Forward, Backward, 9.0)];
        let _ = TransitionExtractor::extract_with_cutoff(&rows, Some(1.0));
        assert_eq!(rows[0].behavior_after, Backward);
    }
}
