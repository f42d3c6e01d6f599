//! Common types and traits shared across `geotable` crates.
//!
//! This crate provides the core abstractions that are shared between
//! `geotable-core` and the format driver crates, preventing circular
//! dependencies:
//!
//! - **Driver contract**: the [`FormatDriver`] trait every format codec
//!   implements, and the [`FileRowSource`] trait LINK-mode drivers expose.
//! - **Progress tree**: the hierarchical [`ProgressNode`] used for progress
//!   reporting and cooperative cancellation.
//! - **Store boundary**: the [`TabularStore`] trait through which drivers
//!   talk to the host engine, plus the in-memory reference implementation
//!   [`MemoryStore`] used by tests.
//! - **Values and schemas**: SRID-tagged geometries, typed field values and
//!   column definitions.

pub mod driver;
pub mod error;
pub mod memory;
pub mod options;
pub mod progress;
pub mod schema;
pub mod store;
pub mod table;
pub mod value;

// Re-export commonly used types
pub use driver::{DriverMode, FileRowSource, FormatDriver, check_importable, file_extension};
pub use error::{GeotableError, Result};
pub use memory::MemoryStore;
pub use options::DriverOptions;
pub use progress::ProgressNode;
pub use schema::{Column, DataType, GeometryKind};
pub use store::{TableScan, TabularStore};
pub use table::{ExportSource, TableRef, is_valid_identifier};
pub use value::{Geom, Value};
