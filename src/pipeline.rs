//! Pipeline orchestration
//!
//! This module provides the public API for VNC Flux.
//! It runs the stages from raw spreadsheet rows and activity bundles to the flat
//! activity table and subject counts.

use crate::adapters::{ActivitySourceAdapter, AnnotatedAdapter, SpecimenIdAdapter};
use crate::aggregate::{SubjectCountAggregator, TransitionCountMatrix};
use crate::codes::BehaviorCode;
use crate::encoder::TableEncoder;
use crate::error::ProcessingError;
use crate::recode::recode_rows;
use crate::schema::{ActivityBundle, ColumnMap, SpreadsheetAdapter, VariableNames, DEFAULT_SHEET_NAME};
use crate::stats::{behavior_stats, BehaviorStats, FitResults, PValueKind};
use crate::table::{ActivityTable, ActivityTableBuilder};
use crate::transitions::{SubjectTransitions, TransitionExtractor};
use crate::types::{
    ActivityRow, ActivityTableDocument, CountMatrixDocument, RawTransitionRow, RecodedTransitionRow,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Build the activity table from a bundle with embedded annotations.
///
/// # Arguments
/// * `bundle_json` - Activity bundle with the `transitions` variable
///
/// # Example
/// ```ignore
/// let table = annotated_to_table(bundle_json)?;
/// ```
pub fn annotated_to_table(bundle_json: String) -> Result<ActivityTable, ProcessingError> {
    VncProcessor::new().table_from_annotated(&bundle_json)
}

/// Build the activity table from a specimen-id bundle and the annotation spreadsheet.
///
/// # Arguments
/// * `bundle_json` - Activity bundle with the `newTransitions` variable
/// * `spreadsheet_json` - Spreadsheet rows, or a workbook containing the `For Will` sheet
/// * `cutoff_time` - Transition times above this are relabeled quiet (`None` for no cutoff)
///
/// # Example
/// ```ignore
/// let table = specimen_to_table(bundle_json, spreadsheet_json, Some(30.0))?;
/// ```
pub fn specimen_to_table(
    bundle_json: String,
    spreadsheet_json: String,
    cutoff_time: Option<f64>,
) -> Result<ActivityTable, ProcessingError> {
    let config = ProcessorConfig {
        cutoff_time,
        ..Default::default()
    };
    VncProcessor::with_config(config).table_from_specimen_ids(&bundle_json, &spreadsheet_json)
}

/// Processor settings. Every field has a default, so partial JSON files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Transition times above this are relabeled quiet; `None` means no cutoff
    pub cutoff_time: Option<f64>,
    pub variables: VariableNames,
    pub columns: ColumnMap,
    pub sheet_name: String,
    /// Count matrix axes; `None` uses every observed behavior, sorted by letter
    pub behaviors: Option<Vec<BehaviorCode>>,
    pub p_value: PValueKind,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            cutoff_time: None,
            variables: VariableNames::default(),
            columns: ColumnMap::default(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            behaviors: None,
            p_value: PValueKind::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn from_json(json: &str) -> Result<Self, ProcessingError> {
        serde_json::from_str(json).map_err(ProcessingError::JsonError)
    }
}

/// Processor holding configuration and an encoder for output documents.
pub struct VncProcessor {
    config: ProcessorConfig,
    encoder: TableEncoder,
}

impl Default for VncProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl VncProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            encoder: TableEncoder::new(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Parse spreadsheet rows using the configured columns and sheet
    pub fn read_transitions(&self, spreadsheet_json: &str) -> Result<Vec<RawTransitionRow>, ProcessingError> {
        SpreadsheetAdapter::parse_rows(
            spreadsheet_json,
            &self.config.columns,
            Some(&self.config.sheet_name),
        )
    }

    /// Parse and recode spreadsheet rows
    pub fn recode_transitions(
        &self,
        spreadsheet_json: &str,
    ) -> Result<Vec<RecodedTransitionRow>, ProcessingError> {
        let rows = self.read_transitions(spreadsheet_json)?;
        recode_rows(&rows)
    }

    /// Parse, recode and group spreadsheet rows by subject, applying the cutoff
    pub fn extract(&self, spreadsheet_json: &str) -> Result<SubjectTransitions, ProcessingError> {
        let rows = self.recode_transitions(spreadsheet_json)?;
        Ok(TransitionExtractor::extract_with_cutoff(
            &rows,
            self.config.cutoff_time,
        ))
    }

    pub fn table_from_annotated(&self, bundle_json: &str) -> Result<ActivityTable, ProcessingError> {
        let bundle = ActivityBundle::from_json(bundle_json)?;
        self.build_with_adapter(&AnnotatedAdapter, &bundle)
    }

    pub fn table_from_specimen_ids(
        &self,
        bundle_json: &str,
        spreadsheet_json: &str,
    ) -> Result<ActivityTable, ProcessingError> {
        let transitions = self.extract(spreadsheet_json)?;
        let bundle = ActivityBundle::from_json(bundle_json)?;
        self.build_with_adapter(&SpecimenIdAdapter::new(&transitions), &bundle)
    }

    /// Run every activity check without building the table.
    ///
    /// With a spreadsheet the bundle is read as a specimen-id bundle, otherwise as an
    /// annotated one. Returns the event count per subject.
    pub fn validate_bundle(
        &self,
        bundle_json: &str,
        spreadsheet_json: Option<&str>,
    ) -> Result<Vec<usize>, ProcessingError> {
        let bundle = ActivityBundle::from_json(bundle_json)?;
        let dataset = match spreadsheet_json {
            Some(spreadsheet_json) => {
                let transitions = self.extract(spreadsheet_json)?;
                SpecimenIdAdapter::new(&transitions).prepare(&bundle, &self.config.variables)?
            }
            None => AnnotatedAdapter.prepare(&bundle, &self.config.variables)?,
        };
        ActivityTableBuilder::validate(&dataset)
    }

    /// Count subjects per transition in a flat table
    pub fn count_subjects(&self, rows: &[ActivityRow]) -> TransitionCountMatrix {
        SubjectCountAggregator::from_rows(rows, self.config.behaviors.as_deref())
    }

    /// Count subjects per transition straight from the spreadsheet
    pub fn count_subjects_in_spreadsheet(
        &self,
        spreadsheet_json: &str,
    ) -> Result<TransitionCountMatrix, ProcessingError> {
        let transitions = self.extract(spreadsheet_json)?;
        Ok(SubjectCountAggregator::from_transitions(
            &transitions,
            self.config.behaviors.as_deref(),
        ))
    }

    /// Reshape saved fit results into per-transition statistics
    pub fn behavior_stats(&self, fit_json: &str) -> Result<BTreeMap<String, BehaviorStats>, ProcessingError> {
        let results: FitResults = serde_json::from_str(fit_json)?;
        behavior_stats(&results.transitions(), &results.full_stats, self.config.p_value)
    }

    pub fn encode_table(&self, table: &ActivityTable) -> ActivityTableDocument {
        self.encoder.encode_table(table)
    }

    pub fn encode_counts(&self, matrix: &TransitionCountMatrix) -> CountMatrixDocument {
        self.encoder.encode_counts(matrix)
    }

    fn build_with_adapter(
        &self,
        adapter: &dyn ActivitySourceAdapter,
        bundle: &ActivityBundle,
    ) -> Result<ActivityTable, ProcessingError> {
        let dataset = adapter.prepare(bundle, &self.config.variables)?;
        let table = ActivityTableBuilder::build(&dataset)?;

        info!(
            subjects = table.n_subjects(),
            rows = table.len(),
            "Processed activity bundle"
        );

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::BehaviorCode::*;
    use crate::error::ErrorKind;

    fn sample_spreadsheet_json() -> &'static str {
        r#"{
            "Summary": [],
            "For Will": [
                {"Date and sample": "CW_17-08-24-L1", "Precede Behavior": "forward", "Succeed Behavior": "quiet",
                 "target site": "A4", "transition time": 2.5, "interval time": 30},
                {"Date and sample": "CW_17-08-24-L1", "Precede Behavior": "backward", "Succeed Behavior": "turn",
                 "target site": "A4", "transition time": 45.0, "interval time": 30},
                {"Date and sample": "CW_17-09-01-L3", "Precede Behavior": "Forward", "Succeed Behavior": "Quiet",
                 "target site": "A9", "transition time": "", "interval time": 30}
            ]
        }"#
    }

    fn sample_bundle_json() -> &'static str {
        r#"{
            "newTransitions": ["0824L1CL"],
            "activityPreManipulationSet": [[[11, 0.1, 0.2], [12, 0.3, 0.4]]],
            "activityDurManipulationSet": [[[11, 1.1, 1.2], [12, 1.3, 1.4]]],
            "activityPostManipulationSet": [[[11, 2.1, 2.2], [12, 2.3, 2.4]]]
        }"#
    }

    #[test]
    fn test_extract_applies_cutoff() {
        let config = ProcessorConfig {
            cutoff_time: Some(30.0),
            ..Default::default()
        };
        let transitions = VncProcessor::with_config(config)
            .extract(sample_spreadsheet_json())
            .unwrap();

        let l1 = transitions.get("CW_17-08-24-L1").unwrap();
        assert_eq!(l1[0].after, Quiet);
        assert_eq!(l1[1].before, Backward);
        assert_eq!(l1[1].after, Quiet);

        let l3 = transitions.get("CW_17-09-01-L3").unwrap();
        assert_eq!(l3[0].before, Forward);
    }

    #[test]
    fn test_specimen_to_table() {
        let table = specimen_to_table(
            sample_bundle_json().to_string(),
            sample_spreadsheet_json().to_string(),
            None,
        )
        .unwrap();

        assert_eq!(table.len(), 4);
        let rows = table.rows();
        assert_eq!(rows[0].subject_id, "CW_17-08-24-L1");
        assert_eq!(rows[0].cell_id, 11.0);
        assert_eq!(rows[1].beh_after, Turn);
        assert_eq!(rows[3].cell_id, 12.0);
        assert_eq!(rows[3].dff_after, 2.4);
    }

    #[test]
    fn test_validate_bundle_reports_event_counts() {
        let processor = VncProcessor::new();
        let events = processor
            .validate_bundle(sample_bundle_json(), Some(sample_spreadsheet_json()))
            .unwrap();
        assert_eq!(events, vec![2]);

        let err = processor.validate_bundle(sample_bundle_json(), None).unwrap_err();
        assert!(matches!(err, ProcessingError::MissingVariable(ref v) if v == "transitions"));
    }

    #[test]
    fn test_count_subjects_uses_configured_axes() {
        let config = ProcessorConfig {
            behaviors: Some(vec![Forward, Backward, Quiet, Turn]),
            ..Default::default()
        };
        let processor = VncProcessor::with_config(config);
        let matrix = processor
            .count_subjects_in_spreadsheet(sample_spreadsheet_json())
            .unwrap();

        assert_eq!(matrix.behaviors(), &[Forward, Backward, Quiet, Turn]);
        assert_eq!(matrix.get(Forward, Quiet), Some(2));
        assert_eq!(matrix.get(Backward, Turn), Some(1));
        assert_eq!(matrix.get(Quiet, Forward), Some(0));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = ProcessorConfig::from_json(r#"{"cutoff_time": 12.5, "p_value": "non_zero_p"}"#).unwrap();
        assert_eq!(config.cutoff_time, Some(12.5));
        assert_eq!(config.p_value, PValueKind::NonZero);
        assert_eq!(config.sheet_name, DEFAULT_SHEET_NAME);
        assert_eq!(config.variables, VariableNames::default());
    }

    #[test]
    fn test_unrecognized_label_aborts() {
        let spreadsheet = r#"[
            {"Date and sample": "CW_17-08-24-L1", "Precede Behavior": "wiggle", "Succeed Behavior": "quiet",
             "target site": "A4", "transition time": 1, "interval time": 1}
        ]"#;
        let err = VncProcessor::new().extract(spreadsheet).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LabelCoverage);
    }

    #[test]
    fn test_invalid_json() {
        let result = annotated_to_table("not valid json".to_string());
        assert!(result.is_err());
    }
}
