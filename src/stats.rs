//! Behavior statistics for whole-brain maps
//!
//! Regression fits produce one record per ROI with one coefficient and p-value per
//! behavior transition. The map renderer wants the transpose: for each transition
//! (keyed `"{before}_{after}"`), the arrays of p-values and betas across ROIs.

use crate::codes::BehaviorCode;
use crate::error::ProcessingError;
use crate::types::Transition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which p-value of a fit to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PValueKind {
    /// Test that the transition mean equals the mean of all other transitions
    #[default]
    #[serde(rename = "eq_mean_p")]
    EqMean,
    /// Test that the coefficient is non-zero
    #[serde(rename = "non_zero_p")]
    NonZero,
    /// Test that the coefficient is not the maximum
    #[serde(rename = "non_max_p")]
    NonMax,
}

impl PValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PValueKind::EqMean => "eq_mean_p",
            PValueKind::NonZero => "non_zero_p",
            PValueKind::NonMax => "non_max_p",
        }
    }
}

/// Fitted statistics for one ROI, one entry per transition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiStatistics {
    pub beta: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq_mean_p: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_zero_p: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_max_p: Option<Vec<f64>>,
}

impl RoiStatistics {
    pub fn p_values(&self, kind: PValueKind) -> Option<&[f64]> {
        match kind {
            PValueKind::EqMean => self.eq_mean_p.as_deref(),
            PValueKind::NonZero => self.non_zero_p.as_deref(),
            PValueKind::NonMax => self.non_max_p.as_deref(),
        }
    }
}

/// Saved fit results: the transitions fitted and per-ROI statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResults {
    pub beh_trans: Vec<(BehaviorCode, BehaviorCode)>,
    pub full_stats: Vec<RoiStatistics>,
}

impl FitResults {
    pub fn transitions(&self) -> Vec<Transition> {
        self.beh_trans
            .iter()
            .map(|&(before, after)| Transition::new(before, after))
            .collect()
    }
}

/// Per-ROI statistics for one transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorStats {
    pub p_values: Vec<f64>,
    pub beta: Vec<f64>,
}

/// Reshape per-ROI fits into per-transition arrays, keyed by pair name
pub fn behavior_stats(
    transitions: &[Transition],
    full_stats: &[RoiStatistics],
    kind: PValueKind,
) -> Result<BTreeMap<String, BehaviorStats>, ProcessingError> {
    let n_trans = transitions.len();

    for (roi, stats) in full_stats.iter().enumerate() {
        let p_values = stats.p_values(kind).ok_or_else(|| ProcessingError::MissingStatistic {
            roi,
            statistic: kind.as_str().to_string(),
        })?;
        for (name, values) in [(kind.as_str(), p_values), ("beta", stats.beta.as_slice())] {
            if values.len() != n_trans {
                return Err(ProcessingError::StatisticLengthMismatch {
                    roi,
                    statistic: name.to_string(),
                    expected: n_trans,
                    actual: values.len(),
                });
            }
        }
    }

    Ok(transitions
        .iter()
        .enumerate()
        .map(|(t, transition)| {
            let stats = BehaviorStats {
                p_values: full_stats
                    .iter()
                    .filter_map(|s| s.p_values(kind))
                    .map(|p| p[t])
                    .collect(),
                beta: full_stats.iter().map(|s| s.beta[t]).collect(),
            };
            (transition.pair_name(), stats)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::BehaviorCode::*;
    use crate::error::ErrorKind;

    fn roi(beta: &[f64], p: &[f64]) -> RoiStatistics {
        RoiStatistics {
            beta: beta.to_vec(),
            eq_mean_p: Some(p.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn test_transposes_roi_records() {
        let transitions = [Transition::new(Forward, Quiet), Transition::new(Backward, Hunch)];
        let full_stats = [roi(&[1.0, 2.0], &[0.01, 0.5]), roi(&[3.0, 4.0], &[0.02, 0.6])];

        let stats = behavior_stats(&transitions, &full_stats, PValueKind::EqMean).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats["F_Q"].beta, vec![1.0, 3.0]);
        assert_eq!(stats["F_Q"].p_values, vec![0.01, 0.02]);
        assert_eq!(stats["B_H"].beta, vec![2.0, 4.0]);
    }

    #[test]
    fn test_missing_p_value_kind() {
        let transitions = [Transition::new(Forward, Quiet)];
        let err = behavior_stats(&transitions, &[roi(&[1.0], &[0.1])], PValueKind::NonZero).unwrap_err();
        assert!(matches!(err, ProcessingError::MissingStatistic { roi: 0, .. }));
    }

    #[test]
    fn test_length_mismatch() {
        let transitions = [Transition::new(Forward, Quiet), Transition::new(Turn, Quiet)];
        let err = behavior_stats(&transitions, &[roi(&[1.0], &[0.1, 0.2])], PValueKind::EqMean)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_fit_results_from_json() {
        let json = r#"{
            "beh_trans": [["F", "Q"]],
            "full_stats": [{"beta": [0.5], "eq_mean_p": [0.04], "non_zero_p": [0.2]}]
        }"#;
        let results: FitResults = serde_json::from_str(json).unwrap();
        let stats = behavior_stats(&results.transitions(), &results.full_stats, PValueKind::NonZero).unwrap();
        assert_eq!(stats["F_Q"].p_values, vec![0.2]);
    }
}
