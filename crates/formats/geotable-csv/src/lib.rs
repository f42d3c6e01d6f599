//! CSV format driver: batched COPY import and mirrored export of
//! comma-separated files.

pub mod driver;

pub use driver::CsvDriver;
