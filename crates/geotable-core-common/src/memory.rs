//! In-memory reference implementation of the tabular store.
//!
//! `MemoryStore` backs the test suites of every driver crate and doubles as
//! an executable specification of the store contract: batched appends
//! commit immediately, linked tables materialize rows through their owned
//! row source, and dropping a linked table closes that source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::driver::FileRowSource;
use crate::error::{GeotableError, Result};
use crate::schema::Column;
use crate::store::{TableScan, TabularStore};
use crate::table::{ExportSource, TableRef};
use crate::value::Value;

struct LinkedTable {
    engine: String,
    path: PathBuf,
    source: Box<dyn FileRowSource>,
}

struct MemTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    link: Option<LinkedTable>,
}

/// An in-memory tabular store keyed by formatted table reference.
#[derive(Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemTable>,
    auto_commit: bool,
}

impl MemoryStore {
    /// Creates an empty store with auto-commit enabled.
    #[must_use]
    pub fn new() -> Self {
        MemoryStore {
            tables: BTreeMap::new(),
            auto_commit: true,
        }
    }

    /// Row count of `table`, or `None` when it does not exist. Linked
    /// tables report the row source count.
    #[must_use]
    pub fn row_count(&self, table: &TableRef) -> Option<u64> {
        self.tables.get(&table.to_string()).map(|t| match &t.link {
            Some(link) => link.source.row_count(),
            None => t.rows.len() as u64,
        })
    }

    /// Column definitions of `table`, if it exists.
    #[must_use]
    pub fn columns(&self, table: &TableRef) -> Option<&[Column]> {
        self.tables
            .get(&table.to_string())
            .map(|t| t.columns.as_slice())
    }

    /// Stored rows of an ordinary table, if it exists.
    #[must_use]
    pub fn rows(&self, table: &TableRef) -> Option<&[Vec<Value>]> {
        self.tables
            .get(&table.to_string())
            .filter(|t| t.link.is_none())
            .map(|t| t.rows.as_slice())
    }

    /// Whether `table` is a linked virtual table, and if so, the engine
    /// identifier and source path it was registered with.
    #[must_use]
    pub fn link_info(&self, table: &TableRef) -> Option<(&str, &Path)> {
        self.tables
            .get(&table.to_string())
            .and_then(|t| t.link.as_ref())
            .map(|l| (l.engine.as_str(), l.path.as_path()))
    }

    /// Current auto-commit state.
    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Names of all stored tables, in key order.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}

impl TabularStore for MemoryStore {
    fn table_exists(&self, table: &TableRef) -> Result<bool> {
        Ok(self.tables.contains_key(&table.to_string()))
    }

    fn create_table(&mut self, table: &TableRef, columns: &[Column]) -> Result<()> {
        let key = table.to_string();
        if self.tables.contains_key(&key) {
            return Err(GeotableError::TargetAlreadyExists { table: key });
        }
        self.tables.insert(
            key,
            MemTable {
                columns: columns.to_vec(),
                rows: Vec::new(),
                link: None,
            },
        );
        Ok(())
    }

    fn drop_table(&mut self, table: &TableRef) -> Result<()> {
        if let Some(mut dropped) = self.tables.remove(&table.to_string())
            && let Some(link) = dropped.link.as_mut()
            && let Err(e) = link.source.close()
        {
            warn!("failed to close row source of {table}: {e}");
        }
        Ok(())
    }

    fn append_batch(&mut self, table: &TableRef, rows: Vec<Vec<Value>>) -> Result<()> {
        let key = table.to_string();
        let Some(stored) = self.tables.get_mut(&key) else {
            return Err(GeotableError::storage(format!("unknown table {key}")));
        };
        if stored.link.is_some() {
            return Err(GeotableError::storage(format!(
                "cannot insert into linked table {key}"
            )));
        }
        for row in &rows {
            if row.len() != stored.columns.len() {
                return Err(GeotableError::storage(format!(
                    "row arity {} does not match {} columns of {key}",
                    row.len(),
                    stored.columns.len()
                )));
            }
        }
        stored.rows.extend(rows);
        Ok(())
    }

    fn scan(&mut self, source: &ExportSource) -> Result<TableScan> {
        let table = match source {
            ExportSource::Table(table) => table,
            ExportSource::Query(query) => {
                return Err(GeotableError::storage(format!(
                    "sub-query export requires a host engine: {query}"
                )));
            },
        };
        let key = table.to_string();
        let Some(stored) = self.tables.get_mut(&key) else {
            return Err(GeotableError::storage(format!("unknown table {key}")));
        };
        let rows = match stored.link.as_mut() {
            Some(link) => {
                let mut rows = Vec::with_capacity(link.source.row_count() as usize);
                for index in 0..link.source.row_count() {
                    rows.push(link.source.row(index)?);
                }
                rows
            },
            None => stored.rows.clone(),
        };
        Ok(TableScan {
            columns: stored.columns.clone(),
            rows,
        })
    }

    fn create_linked_table(
        &mut self,
        table: &TableRef,
        engine: &str,
        path: &Path,
        source: Box<dyn FileRowSource>,
    ) -> Result<()> {
        let key = table.to_string();
        if self.tables.contains_key(&key) {
            return Err(GeotableError::TargetAlreadyExists { table: key });
        }
        self.tables.insert(
            key,
            MemTable {
                columns: source.columns().to_vec(),
                rows: Vec::new(),
                link: Some(LinkedTable {
                    engine: engine.to_string(),
                    path: path.to_path_buf(),
                    source,
                }),
            },
        );
        Ok(())
    }

    fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        self.auto_commit = enabled;
        Ok(())
    }
}
