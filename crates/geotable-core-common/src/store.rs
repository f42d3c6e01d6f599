//! The tabular store boundary.
//!
//! Drivers never talk to a concrete engine; they issue DDL, batched inserts
//! and scans through this trait. The host's query executor, storage engine
//! and transaction manager all live behind it. [`crate::MemoryStore`] is the
//! in-crate reference implementation used by tests.

use std::path::Path;

use crate::driver::FileRowSource;
use crate::error::Result;
use crate::schema::Column;
use crate::table::{ExportSource, TableRef};
use crate::value::Value;

/// The columns and materialized rows of a scan, consumed by export drivers.
#[derive(Debug)]
pub struct TableScan {
    /// Ordered column definitions.
    pub columns: Vec<Column>,
    /// Row tuples, one `Vec<Value>` per row.
    pub rows: Vec<Vec<Value>>,
}

/// Generic interface to the host engine's tables and transactions.
pub trait TabularStore {
    /// Whether `table` exists (ordinary or virtual).
    ///
    /// # Errors
    ///
    /// Returns a storage error from the host engine.
    fn table_exists(&self, table: &TableRef) -> Result<bool>;

    /// Creates an ordinary table with the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GeotableError::TargetAlreadyExists`] on name
    /// collision, or a storage error.
    fn create_table(&mut self, table: &TableRef, columns: &[Column]) -> Result<()>;

    /// Drops `table` if it exists; dropping an absent table is not an
    /// error. Dropping a virtual table releases its row source.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the host engine.
    fn drop_table(&mut self, table: &TableRef) -> Result<()>;

    /// Executes and commits one batch of row inserts.
    ///
    /// Committed batches are durable increments: a later failure of the
    /// same job does not roll them back.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the table is unknown, a row arity does
    /// not match, or the commit fails.
    fn append_batch(&mut self, table: &TableRef, rows: Vec<Vec<Value>>) -> Result<()>;

    /// Resolves `source` (table or sub-query) and returns its columns and
    /// rows. Scanning a virtual table materializes rows through its row
    /// source on demand.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the source does not resolve.
    fn scan(&mut self, source: &ExportSource) -> Result<TableScan>;

    /// Registers a virtual table bound to `engine` (a driver identifier),
    /// the source `path` and the exclusively owned row source. No file
    /// bytes are copied.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GeotableError::TargetAlreadyExists`] on name
    /// collision, or a storage error.
    fn create_linked_table(
        &mut self,
        table: &TableRef,
        engine: &str,
        path: &Path,
        source: Box<dyn FileRowSource>,
    ) -> Result<()>;

    /// Suspends or restores auto-commit on the underlying connection. COPY
    /// drivers suspend it for the duration of an import and restore it
    /// before returning, success or failure.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the host engine.
    fn set_auto_commit(&mut self, enabled: bool) -> Result<()>;
}
