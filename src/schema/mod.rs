//! Input schemas
//!
//! Wire formats handed over by the external readers: annotation spreadsheet rows
//! (with a configurable header mapping) and MATLAB-exported activity bundles.

mod bundle;
mod spreadsheet;

pub use bundle::*;
pub use spreadsheet::*;
