//! Campaign uploader library
//!
//! Turns spreadsheet rows into ad campaigns: each row is validated, its
//! platform credentials resolved, a deterministic campaign plan built, and
//! the plan submitted with idempotency and per-unit failure isolation. Row
//! outcomes are written back to the sheet and summarised by SMS.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod uploader_impl;

// Re-export main types
pub use config::AppConfig;
pub use error::{UploaderError, UploaderResult, ValidationError};
pub use traits::*;
pub use types::*;
pub use uploader_impl::{RowVerdict, RunSummary, Uploader};
