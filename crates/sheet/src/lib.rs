//! Tabular export sink: writes flattened survey rows to a dated file.

pub mod sheet;

pub use sheet::{SheetPaths, sheet_file_name, write_sheet, write_sheet_dated};
