//! Driver registry and extension-based dispatch.
//!
//! The registry is an explicit value, constructed once at startup and
//! passed to whoever needs dispatch; there is no ambient global state, and
//! tests build a fresh registry per case. It holds an ordered list of
//! driver trait objects: insertion order is lookup priority when two
//! drivers declare the same extension, and extension matching is always
//! case-insensitive.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use geotable_core_common::driver::file_extension;
use geotable_core_common::{
    DriverMode, DriverOptions, ExportSource, FormatDriver, GeotableError, ProgressNode, Result,
    TableRef, TabularStore,
};

/// Ordered extension-to-driver lookup and the generic entry points.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Arc<dyn FormatDriver>>,
}

impl DriverRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        DriverRegistry {
            drivers: Vec::new(),
        }
    }

    /// A registry preloaded with the built-in drivers (CSV, GPX, TSV).
    #[must_use]
    pub fn with_builtin_drivers() -> Self {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(geotable_csv::CsvDriver::new()));
        registry.register(Arc::new(geotable_gpx::GpxDriver::new()));
        registry.register(Arc::new(geotable_tsv::TsvDriver::new()));
        registry
    }

    /// Appends a driver. Earlier registrations win on extension collision.
    pub fn register(&mut self, driver: Arc<dyn FormatDriver>) {
        debug!(
            "registering driver {} for extensions {:?}",
            driver.identifier(),
            driver.import_extensions()
        );
        self.drivers.push(driver);
    }

    /// The first driver declaring `extension` for import.
    #[must_use]
    pub fn import_driver(&self, extension: &str) -> Option<&Arc<dyn FormatDriver>> {
        self.drivers.iter().find(|d| {
            d.import_extensions()
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension))
        })
    }

    /// The first driver declaring `extension` for export.
    #[must_use]
    pub fn export_driver(&self, extension: &str) -> Option<&Arc<dyn FormatDriver>> {
        self.drivers.iter().find(|d| {
            d.export_extensions()
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension))
        })
    }

    /// Pass-through description lookup; an empty string when the extension
    /// is unknown rather than a failure.
    #[must_use]
    pub fn format_description(&self, extension: &str) -> &'static str {
        self.import_driver(extension)
            .or_else(|| self.export_driver(extension))
            .map(|d| d.format_description(extension))
            .unwrap_or("")
    }

    /// Pass-through spatial-format lookup; `false` when unknown.
    #[must_use]
    pub fn is_spatial_format(&self, extension: &str) -> bool {
        self.import_driver(extension)
            .or_else(|| self.export_driver(extension))
            .is_some_and(|d| d.is_spatial(extension))
    }

    /// Imports `path` into `table`, dispatching on the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::FormatUnsupported`] when no registered
    /// driver declares the extension, plus whatever the driver raises.
    pub fn import_file(
        &self,
        store: &mut dyn TabularStore,
        table: &TableRef,
        path: &Path,
        options: &DriverOptions,
        progress: &ProgressNode,
    ) -> Result<Vec<String>> {
        let extension = file_extension(path);
        let driver = self
            .import_driver(&extension)
            .ok_or(GeotableError::FormatUnsupported {
                extension: extension.clone(),
            })?;
        info!(
            "importing {} into {table} via {}",
            path.display(),
            driver.identifier()
        );
        driver.import_file(store, table, path, options, progress)
    }

    /// Exports `source` into `path`, dispatching on the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::FormatUnsupported`] when no registered
    /// driver declares the extension for export, plus whatever the driver
    /// raises.
    pub fn export_table(
        &self,
        store: &mut dyn TabularStore,
        source: &ExportSource,
        path: &Path,
        options: &DriverOptions,
        progress: &ProgressNode,
    ) -> Result<Vec<String>> {
        let extension = file_extension(path);
        let driver = self
            .export_driver(&extension)
            .ok_or(GeotableError::FormatUnsupported {
                extension: extension.clone(),
            })?;
        info!(
            "exporting {source} into {} via {}",
            path.display(),
            driver.identifier()
        );
        driver.export_table(store, source, path, options, progress)
    }

    /// Opens `path` as a virtual table: resolves a LINK driver by
    /// extension, opens its row source and asks the store to create a
    /// virtual table bound to the driver identifier and the source path.
    /// When `table` is `None` the name is derived from the file stem,
    /// upper-cased.
    ///
    /// Returns the name of the registered table. No rows are copied.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::FormatUnsupported`] when no LINK driver
    /// declares the extension, [`GeotableError::InvalidIdentifier`] when
    /// the derived name violates the identifier grammar, and
    /// [`GeotableError::TargetAlreadyExists`] on collision. A failure
    /// leaves no virtual table registered.
    pub fn open_file_as_table(
        &self,
        store: &mut dyn TabularStore,
        path: &Path,
        table: Option<&TableRef>,
    ) -> Result<String> {
        let extension = file_extension(path);
        let driver = self
            .import_driver(&extension)
            .filter(|d| d.mode() == DriverMode::Link)
            .ok_or(GeotableError::FormatUnsupported {
                extension: extension.clone(),
            })?;
        let table = match table {
            Some(table) => table.clone(),
            None => TableRef::from_file_stem(path)?,
        };
        if store.table_exists(&table)? {
            return Err(GeotableError::TargetAlreadyExists {
                table: table.to_string(),
            });
        }
        let source = driver.open_row_source(path, &DriverOptions::default())?;
        store.create_linked_table(&table, driver.identifier(), path, source)?;
        info!(
            "linked {} as {table} via {}",
            path.display(),
            driver.identifier()
        );
        Ok(table.to_string())
    }
}
