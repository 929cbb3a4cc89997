//! On-disk output: append-only CSV logs and their directory layout.

pub mod csv;
pub mod layout;

pub use csv::{dir_csv_bytes, CsvRecord};
pub use layout::{DataLayout, LogSet};
