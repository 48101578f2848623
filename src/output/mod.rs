//! Output formatters for duplicate scan results.
//!
//! - table for humans (default)
//! - JSON for automation and scripting
//! - CSV for spreadsheet import

pub mod csv;
pub mod json;
pub mod table;

pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use table::TableOutput;
