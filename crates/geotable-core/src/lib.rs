//! `geotable-core` is the dispatch layer of the `geotable` driver
//! framework.
//!
//! It provides the [`DriverRegistry`]: an ordered, extension-keyed lookup of
//! format drivers, the generic import/export entry points that dispatch by
//! file extension, and the "open file as table" path that registers
//! LINK-mode virtual tables. Format codecs live in the `crates/formats/*`
//! crates; shared contracts in `geotable-core-common`.

pub mod registry;

pub use registry::DriverRegistry;

// Re-export the shared contract types so callers depend on one crate.
pub use geotable_core_common::{
    Column, DataType, DriverMode, DriverOptions, ExportSource, FileRowSource, FormatDriver, Geom,
    GeometryKind, GeotableError, MemoryStore, ProgressNode, Result, TableRef, TableScan,
    TabularStore, Value,
};
