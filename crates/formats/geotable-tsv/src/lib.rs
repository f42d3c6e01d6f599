//! TSV format driver: LINK-mode exposure of tab-separated files as virtual
//! tables, backed by a seekable row source. No file bytes are copied.

pub mod driver;
pub mod row_source;

pub use driver::TsvDriver;
pub use row_source::TsvRowSource;
