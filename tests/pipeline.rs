use pretty_assertions::assert_eq;
use vnc_flux::codes::BehaviorCode::{self, *};
use vnc_flux::encoder::decode_rows;
use vnc_flux::error::ErrorKind;
use vnc_flux::pipeline::{ProcessorConfig, VncProcessor};
use vnc_flux::recode::recode_labels;
use vnc_flux::{annotated_to_table, specimen_to_table, ProcessingError};

const ACTIVITY: &str = r#"
    "activityPreManipulationSet": [
        [[101, 0.10, 0.11], [102, 0.12, 0.13]],
        [[201, 0.20, 0.21, 0.22]]
    ],
    "activityDurManipulationSet": [
        [[101, 1.10, 1.11], [102, 1.12, 1.13]],
        [[201, 1.20, 1.21, 1.22]]
    ],
    "activityPostManipulationSet": [
        [[101, 2.10, 2.11], [102, 2.12, 2.13]],
        [[201, 2.20, 2.21, 2.22]]
    ]
"#;

fn annotated_bundle() -> String {
    format!(
        r#"{{
            {},
            "transitions": [
                [["F", "Q"], ["B", "T"], "CW_17-08-24-L1"],
                [["Q", "F"], ["H", "Q"], ["F", "P"], "CW_17-09-01-L2"]
            ]
        }}"#,
        ACTIVITY
    )
}

fn specimen_bundle() -> String {
    format!(r#"{{ {}, "newTransitions": ["0824L1CL", "0901L2CL"] }}"#, ACTIVITY)
}

fn spreadsheet() -> &'static str {
    r#"[
        {"Date and sample": "CW_17-08-24-L1", "Precede Behavior": "Forward", "Succeed Behavior": "Quiet",
         "target site": "A4", "transition time": 3.0, "interval time": 20},
        {"Date and sample": "CW_17-08-24-L1", "Precede Behavior": "backward", "Succeed Behavior": "turn",
         "target site": "A4", "transition time": 12.0, "interval time": 20},
        {"Date and sample": "CW_17-09-01-L2", "Precede Behavior": "quiet", "Succeed Behavior": "forward",
         "target site": "A7", "transition time": 40.0, "interval time": 20},
        {"Date and sample": "CW_17-09-01-L2", "Precede Behavior": " hunch", "Succeed Behavior": "Quiet",
         "target site": "A7", "transition time": 1.0, "interval time": 20},
        {"Date and sample": "CW_17-09-01-L2", "Precede Behavior": "forward", "Succeed Behavior": "back hunch",
         "target site": "A7", "transition time": null, "interval time": 20}
    ]"#
}

#[test]
fn test_both_bundle_layouts_build_the_same_table() {
    let annotated = annotated_to_table(annotated_bundle()).unwrap();
    let specimen = specimen_to_table(specimen_bundle(), spreadsheet().to_string(), None).unwrap();

    assert_eq!(annotated, specimen);
    // 2 neurons x 2 events + 1 neuron x 3 events
    assert_eq!(annotated.len(), 7);
    assert_eq!(annotated.n_subjects(), 2);
}

#[test]
fn test_table_rows_follow_subject_neuron_event_order() {
    let table = annotated_to_table(annotated_bundle()).unwrap();
    let keys: Vec<(String, f64, usize)> = table
        .rows()
        .iter()
        .map(|r| (r.subject_id.clone(), r.cell_id, r.event_id))
        .collect();

    let l1 = "CW_17-08-24-L1".to_string();
    let l2 = "CW_17-09-01-L2".to_string();
    assert_eq!(
        keys,
        vec![
            (l1.clone(), 101.0, 0),
            (l1.clone(), 101.0, 1),
            (l1.clone(), 102.0, 0),
            (l1, 102.0, 1),
            (l2.clone(), 201.0, 0),
            (l2.clone(), 201.0, 1),
            (l2, 201.0, 2),
        ]
    );

    let last = &table.rows()[6];
    assert_eq!((last.beh_before, last.beh_after), (Forward, BackHunch));
    assert_eq!((last.dff_before, last.dff_during, last.dff_after), (0.22, 1.22, 2.22));
}

#[test]
fn test_cutoff_moves_slow_responses_to_quiet() {
    let config = ProcessorConfig {
        cutoff_time: Some(30.0),
        behaviors: Some(vec![Quiet, Forward]),
        ..Default::default()
    };
    let processor = VncProcessor::with_config(config);

    let matrix = processor.count_subjects_in_spreadsheet(spreadsheet()).unwrap();
    assert_eq!(matrix.to_rows(), vec![vec![1, 0], vec![1, 0]]);

    let table = processor
        .table_from_specimen_ids(&specimen_bundle(), spreadsheet())
        .unwrap();
    let l2_first = table
        .rows()
        .iter()
        .find(|r| r.subject_id == "CW_17-09-01-L2" && r.event_id == 0)
        .unwrap();
    assert_eq!(l2_first.beh_after, Quiet);
}

#[test]
fn test_counts_from_table_match_counts_from_spreadsheet() {
    let processor = VncProcessor::new();
    let table = processor
        .table_from_specimen_ids(&specimen_bundle(), spreadsheet())
        .unwrap();

    let from_table = processor.count_subjects(table.rows());
    let from_spreadsheet = processor.count_subjects_in_spreadsheet(spreadsheet()).unwrap();

    assert_eq!(from_table, from_spreadsheet);
    assert_eq!(from_table.behaviors(), &[Backward, Forward, Hunch, BackHunch, Quiet, Turn]);
    assert_eq!(from_table.get(Forward, Quiet), Some(1));
}

#[test]
fn test_encoded_table_decodes_back() {
    let processor = VncProcessor::new();
    let table = annotated_to_table(annotated_bundle()).unwrap();
    let document = serde_json::to_string(&processor.encode_table(&table)).unwrap();

    assert_eq!(decode_rows(&document).unwrap(), table.into_rows());
}

#[test]
fn test_reordered_neurons_abort_the_whole_table() {
    let bundle = annotated_bundle().replace(
        "[[101, 2.10, 2.11], [102, 2.12, 2.13]]",
        "[[102, 2.12, 2.13], [101, 2.10, 2.11]]",
    );
    let err = annotated_to_table(bundle).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OrderMismatch);
}

#[test]
fn test_overlapping_synonyms_are_rejected() {
    let table: &[(BehaviorCode, &[&str])] = &[(Forward, &["run", "walk"]), (Turn, &["walk"])];
    let err = recode_labels(&["run", "walk"], table).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LabelCoverage);
    assert!(matches!(
        err,
        ProcessingError::DuplicateLabelAssignment { row: 1, code: Turn, .. }
    ));
}
