//! VNC Flux - Behavior-transition recoding and activity tables for VNC imaging data
//!
//! Flux turns hand-annotated behavior spreadsheets and per-subject neural activity
//! into analysis-ready tables through a deterministic pipeline: label recoding →
//! transition extraction → activity validation → table building → subject counts.
//!
//! ## Modules
//!
//! - **Annotation path**: spreadsheet rows are recoded to [`BehaviorCode`]s and grouped
//!   per subject
//! - **Activity path**: activity bundles are adapted, validated and flattened into an
//!   [`ActivityTable`]
//! - **Whole-brain support**: ROI dataset assembly and per-transition statistics

pub mod adapters;
pub mod aggregate;
pub mod codes;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod recode;
pub mod roi;
pub mod schema;
pub mod stats;
pub mod table;
pub mod transitions;
pub mod types;

pub use aggregate::{SubjectCountAggregator, TransitionCountMatrix};
pub use codes::{BehaviorCode, BEHAVIOR_CODES};
pub use error::{ErrorKind, ProcessingError};
pub use pipeline::{annotated_to_table, specimen_to_table, ProcessorConfig, VncProcessor};
pub use recode::{recode_labels, recode_rows};
pub use table::{ActivityTable, ActivityTableBuilder};
pub use transitions::{SubjectTransitions, TransitionExtractor};

/// Flux version embedded in all output documents
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for output documents
pub const PRODUCER_NAME: &str = "vnc-flux";
