//! Core module for codepath
//!
//! This module contains the data model, the error taxonomy and the source scanner.

mod error;
pub mod scanner;
mod types;

pub use error::*;
pub use scanner::{ScanControl, ScanOutcome, ScanSummary, discover_files, scan_repository};
pub use types::*;
