//! Activity source adapters
//!
//! This module provides adapters for the two bundle layouts produced during the project.
//! Both map a raw bundle to the same [`ActivityDataset`], so the table builder never
//! needs to know which layout it came from.

mod annotated;
mod specimen;

pub use annotated::AnnotatedAdapter;
pub use specimen::{spreadsheet_id_from_matlab_id, SpecimenIdAdapter, SPECIMEN_ID_EXCEPTIONS};

use crate::error::ProcessingError;
use crate::schema::{ActivityBundle, VariableNames};
use crate::types::ActivityDataset;

/// Trait for activity bundle adapters
pub trait ActivitySourceAdapter {
    /// Read activity blocks and per-subject transitions from a bundle
    fn prepare(
        &self,
        bundle: &ActivityBundle,
        variables: &VariableNames,
    ) -> Result<ActivityDataset, ProcessingError>;
}
