//! Adapter for bundles keyed by MATLAB specimen ids
//!
//! Later extractions carry only MATLAB-style specimen ids (e.g. `0824L1CL`). The
//! behavior for each subject comes from the annotation spreadsheet instead, looked up
//! by the spreadsheet-format id (e.g. `CW_17-08-24-L1`).

use super::ActivitySourceAdapter;
use crate::error::ProcessingError;
use crate::schema::{ActivityBundle, VariableNames};
use crate::transitions::SubjectTransitions;
use crate::types::{ActivityDataset, SubjectAnnotation};
use tracing::debug;

/// Recording year shared by every specimen in the MATLAB exports
const RECORDING_YEAR: &str = "17";

/// MATLAB ids that do not follow the naming rule.
///
/// Two specimens were recorded on 08/24 under sample L2. Their spreadsheet ids carry a
/// `-1` / `-2` suffix that the MATLAB ids encode differently. The root cause lies in
/// the upstream naming, so these stay explicit rather than generalized.
pub const SPECIMEN_ID_EXCEPTIONS: &[(&str, &str)] = &[("0824L2CL", "-1"), ("0824L2-2CL", "-2")];

/// Convert a MATLAB specimen id (`MMDDSN...`) to the spreadsheet format `CW_17-MM-DD-SN`
pub fn spreadsheet_id_from_matlab_id(id: &str) -> Result<String, ProcessingError> {
    let (month, day, sample) = match (id.get(0..2), id.get(2..4), id.get(4..6)) {
        (Some(m), Some(d), Some(s)) => (m, d, s),
        _ => return Err(ProcessingError::InvalidSpecimenId(id.to_string())),
    };

    let suffix = SPECIMEN_ID_EXCEPTIONS
        .iter()
        .find(|(matlab_id, _)| *matlab_id == id)
        .map_or("", |(_, suffix)| *suffix);

    Ok(format!(
        "CW_{}-{}-{}-{}{}",
        RECORDING_YEAR, month, day, sample, suffix
    ))
}

/// Adapter for specimen-id bundles, paired with transitions from the spreadsheet
pub struct SpecimenIdAdapter<'a> {
    transitions: &'a SubjectTransitions,
}

impl<'a> SpecimenIdAdapter<'a> {
    pub fn new(transitions: &'a SubjectTransitions) -> Self {
        Self { transitions }
    }
}

impl ActivitySourceAdapter for SpecimenIdAdapter<'_> {
    fn prepare(
        &self,
        bundle: &ActivityBundle,
        variables: &VariableNames,
    ) -> Result<ActivityDataset, ProcessingError> {
        let activity = bundle.activity_sets(variables)?;
        let matlab_ids = bundle.specimen_ids(&variables.specimen_ids)?;

        let subjects = matlab_ids
            .iter()
            .map(|matlab_id| {
                let subject_id = spreadsheet_id_from_matlab_id(matlab_id)?;
                let transitions = self
                    .transitions
                    .get(&subject_id)
                    .ok_or_else(|| ProcessingError::MissingTransitions {
                        subject_id: subject_id.clone(),
                    })?
                    .to_vec();
                debug!(%matlab_id, %subject_id, events = transitions.len(), "Matched specimen");
                Ok(SubjectAnnotation {
                    subject_id,
                    transitions,
                })
            })
            .collect::<Result<Vec<_>, ProcessingError>>()?;

        Ok(ActivityDataset { activity, subjects })
    }
}
