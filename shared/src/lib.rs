//! Shared types for the sheet-driven campaign uploader
//!
//! Contains the data model that crosses component boundaries: the normalized
//! campaign request, resolved platform credentials, and the per-layer and
//! per-row outcomes written back to the spreadsheet. Engine-internal plan
//! types live in the uploader crate.

pub mod types;
pub mod errors;
pub mod logging;

pub use types::*;
pub use errors::*;
