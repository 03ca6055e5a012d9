//! Output module for persisting harvest results
//!
//! This module handles:
//! - Writing a category result to the result file (overwritten per category)
//! - Reading the result file back
//! - Exporting the result file as a spreadsheet, one row per product

mod result_file;
mod spreadsheet;

pub use result_file::{load_result, persist_result, write_result};
pub use spreadsheet::{export_spreadsheet, write_spreadsheet, SPREADSHEET_HEADERS};
