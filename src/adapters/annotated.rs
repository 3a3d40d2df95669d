//! Adapter for bundles with embedded annotations
//!
//! Early extractions ship a `transitions` variable next to the activity: for each
//! subject, the list of (before, after) behavior pairs followed by the subject id.

use super::ActivitySourceAdapter;
use crate::codes::table_with_letters;
use crate::error::ProcessingError;
use crate::recode::{recode_labels, AFTER_COLUMN, BEFORE_COLUMN};
use crate::schema::{ActivityBundle, RawAnnotation, VariableNames};
use crate::types::{ActivityDataset, SubjectAnnotation, Transition};
use tracing::debug;

/// Adapter for bundles carrying their own annotations
pub struct AnnotatedAdapter;

impl ActivitySourceAdapter for AnnotatedAdapter {
    fn prepare(
        &self,
        bundle: &ActivityBundle,
        variables: &VariableNames,
    ) -> Result<ActivityDataset, ProcessingError> {
        let activity = bundle.activity_sets(variables)?;
        let annotations = bundle.annotations(&variables.annotations)?;
        let subjects = recode_annotations(&annotations)?;

        debug!(
            subjects = subjects.len(),
            "Read annotated activity bundle"
        );

        Ok(ActivityDataset { activity, subjects })
    }
}

/// Map embedded labels to codes. Labels may already be canonical letters or raw synonyms.
fn recode_annotations(annotations: &[RawAnnotation]) -> Result<Vec<SubjectAnnotation>, ProcessingError> {
    let table = table_with_letters();

    annotations
        .iter()
        .map(|annotation| {
            let (before, after): (Vec<&str>, Vec<&str>) = annotation
                .pairs
                .iter()
                .map(|(b, a)| (b.as_str(), a.as_str()))
                .unzip();

            let column = |name: &str| format!("{} of {}", name, annotation.subject_id);
            let before = recode_labels(&before, &table).map_err(|e| e.in_column(&column(BEFORE_COLUMN)))?;
            let after = recode_labels(&after, &table).map_err(|e| e.in_column(&column(AFTER_COLUMN)))?;

            Ok(SubjectAnnotation {
                subject_id: annotation.subject_id.clone(),
                transitions: before
                    .into_iter()
                    .zip(after)
                    .map(|(b, a)| Transition::new(b, a))
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::BehaviorCode::*;
    use crate::error::ErrorKind;

    fn bundle(transitions: &str) -> ActivityBundle {
        ActivityBundle::from_json(&format!(
            r#"{{
                "activityPreManipulationSet": [[[3, 0.1, 0.2]]],
                "activityDurManipulationSet": [[[3, 0.3, 0.4]]],
                "activityPostManipulationSet": [[[3, 0.5, 0.6]]],
                "transitions": {}
            }}"#,
            transitions
        ))
        .unwrap()
    }

    #[test]
    fn test_prepare_mixes_letters_and_synonyms() {
        let dataset = AnnotatedAdapter
            .prepare(
                &bundle(r#"[[["F", "quiet"], ["Backward", "H"], "s1"]]"#),
                &VariableNames::default(),
            )
            .unwrap();

        assert_eq!(dataset.subjects.len(), 1);
        assert_eq!(dataset.subjects[0].subject_id, "s1");
        assert_eq!(
            dataset.subjects[0].transitions,
            vec![Transition::new(Forward, Quiet), Transition::new(Backward, Hunch)]
        );
        assert_eq!(dataset.activity.during[0][[0, 2]], 0.4);
    }

    #[test]
    fn test_unknown_embedded_label() {
        let err = AnnotatedAdapter
            .prepare(
                &bundle(r#"[[["F", "sprint"], ["B", "H"], "s1"]]"#),
                &VariableNames::default(),
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::LabelCoverage);
        assert!(err.to_string().contains("Beh After of s1"));
    }
}
