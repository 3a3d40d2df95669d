//! ROI dataset assembly
//!
//! Combines the image sequence of a whole-brain recording with groups of ROIs and the
//! values extracted from them. Every value set must cover every image and every ROI of
//! its group; the dataset is only assembled once all of them check out.

use crate::error::ProcessingError;
use ndarray::Array2;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

/// Name of the image series in `ts_data`
pub const IMAGE_SERIES: &str = "imgs";

/// Values extracted from a group's ROIs, shaped (time points, ROIs)
#[derive(Debug, Clone, PartialEq)]
pub struct RoiValueSet {
    /// Key under which the values appear in the dataset's time series
    pub name: String,
    /// Where the values were read from, for error messages
    pub file: String,
    pub values: Array2<f64>,
}

/// One group of ROIs with its extracted values
#[derive(Debug, Clone, PartialEq)]
pub struct RoiGroupSpec {
    pub group_name: String,
    /// ROI geometries as loaded from the locations file
    pub rois: Vec<Value>,
    pub value_sets: Vec<RoiValueSet>,
    pub extra_attributes: BTreeMap<String, Value>,
}

/// Samples of a time series
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    /// One image file per time point
    Images(Vec<String>),
    /// One row per time point, one column per ROI
    Values(Array2<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub ts: Vec<f64>,
    pub values: SeriesValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoiGroup {
    pub rois: Vec<Value>,
    /// Time series keys holding this group's values
    pub ts_labels: Vec<String>,
    pub extra_attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoiDataset {
    pub ts_data: BTreeMap<String, TimeSeries>,
    pub metadata: BTreeMap<String, Value>,
    pub roi_groups: BTreeMap<String, RoiGroup>,
}

impl RoiDataset {
    /// Validate and assemble a dataset.
    ///
    /// Image `i` is stamped `i / frame_rate`; every value set shares those stamps.
    pub fn assemble(
        images: Vec<String>,
        frame_rate: f64,
        groups: Vec<RoiGroupSpec>,
        metadata: BTreeMap<String, Value>,
    ) -> Result<RoiDataset, ProcessingError> {
        if !(frame_rate > 0.0) {
            return Err(ProcessingError::InvalidFrameRate(frame_rate));
        }

        let n_images = images.len();
        let interval = 1.0 / frame_rate;
        let ts: Vec<f64> = (0..n_images).map(|i| interval * i as f64).collect();

        let mut ts_data = BTreeMap::new();
        ts_data.insert(
            IMAGE_SERIES.to_string(),
            TimeSeries {
                ts: ts.clone(),
                values: SeriesValues::Images(images),
            },
        );

        let mut roi_groups = BTreeMap::new();
        for group in groups {
            let n_rois = group.rois.len();
            let mut ts_labels = Vec::with_capacity(group.value_sets.len());

            for set in group.value_sets {
                let (n_ts, n_set_rois) = set.values.dim();
                if n_ts != n_images {
                    return Err(ProcessingError::TimePointMismatch {
                        series: set.file,
                        expected: n_images,
                        actual: n_ts,
                    });
                }
                if n_set_rois != n_rois {
                    return Err(ProcessingError::RoiCountMismatch {
                        group: group.group_name,
                        series: set.file,
                        expected: n_rois,
                        actual: n_set_rois,
                    });
                }
                if ts_data.contains_key(&set.name) {
                    return Err(ProcessingError::DuplicateSeries(set.name));
                }

                ts_labels.push(set.name.clone());
                ts_data.insert(
                    set.name,
                    TimeSeries {
                        ts: ts.clone(),
                        values: SeriesValues::Values(set.values),
                    },
                );
            }

            roi_groups.insert(
                group.group_name,
                RoiGroup {
                    rois: group.rois,
                    ts_labels,
                    extra_attributes: group.extra_attributes,
                },
            );
        }

        info!(
            images = n_images,
            groups = roi_groups.len(),
            series = ts_data.len(),
            "Assembled ROI dataset"
        );

        Ok(RoiDataset {
            ts_data,
            metadata,
            roi_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn images(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("TM{:05}/img.klb", i)).collect()
    }

    fn group(name: &str, n_rois: usize, sets: Vec<(&str, Array2<f64>)>) -> RoiGroupSpec {
        RoiGroupSpec {
            group_name: name.to_string(),
            rois: (0..n_rois).map(|i| json!({"voxel_inds": [i]})).collect(),
            value_sets: sets
                .into_iter()
                .map(|(n, values)| RoiValueSet {
                    name: n.to_string(),
                    file: format!("{}.h5", n),
                    values,
                })
                .collect(),
            extra_attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_assemble_dataset() {
        let dataset = RoiDataset::assemble(
            images(4),
            2.0,
            vec![group("rois_1_5_5", 3, vec![("f_1_5_5", Array2::zeros((4, 3)))])],
            BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(dataset.ts_data[IMAGE_SERIES].ts, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(dataset.ts_data["f_1_5_5"].ts.len(), 4);
        assert_eq!(dataset.roi_groups["rois_1_5_5"].ts_labels, vec!["f_1_5_5".to_string()]);
        assert_eq!(dataset.roi_groups["rois_1_5_5"].rois.len(), 3);
    }

    #[test]
    fn test_time_point_mismatch() {
        let err = RoiDataset::assemble(
            images(4),
            1.0,
            vec![group("g", 3, vec![("f", Array2::zeros((5, 3)))])],
            BTreeMap::new(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert_eq!(err.to_string(), "Dataset has 4 images but found 5 data points in f.h5");
    }

    #[test]
    fn test_roi_count_mismatch() {
        let err = RoiDataset::assemble(
            images(2),
            1.0,
            vec![group("g", 3, vec![("f", Array2::zeros((2, 2)))])],
            BTreeMap::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ProcessingError::RoiCountMismatch { expected: 3, actual: 2, .. }
        ));
    }

    #[test]
    fn test_duplicate_series_and_bad_frame_rate() {
        let err = RoiDataset::assemble(
            images(1),
            1.0,
            vec![
                group("a", 1, vec![("f", Array2::zeros((1, 1)))]),
                group("b", 1, vec![("f", Array2::zeros((1, 1)))]),
            ],
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessingError::DuplicateSeries(ref s) if s == "f"));

        let err = RoiDataset::assemble(images(1), 0.0, Vec::new(), BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidFrameRate(_)));
    }
}
