//! The format driver contract.
//!
//! Every format codec implements [`FormatDriver`]. A driver declares the
//! extensions it imports and exports, a human-readable description and a
//! spatial-format flag, and provides the import/export entry points. The
//! driver's [`DriverMode`] decides the materialization strategy:
//!
//! - **COPY** drivers stream the source and fully materialize independent
//!   tables through the store;
//! - **LINK** drivers open a [`FileRowSource`] and register a virtual table
//!   bound to it, copying no file bytes.
//!
//! The contract is identical either way from the caller's perspective.

use std::path::Path;

use crate::error::{GeotableError, Result};
use crate::options::DriverOptions;
use crate::progress::ProgressNode;
use crate::schema::Column;
use crate::store::TabularStore;
use crate::table::{ExportSource, TableRef};
use crate::value::Value;

/// Import strategy of a driver.
///
/// A LINK driver exposes the file as a virtual table bound to the host's
/// table-engine mechanism; a COPY driver transfers the data into ordinary
/// tables whose content is not synced with the file afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    /// Full materialization into independent tables.
    Copy,
    /// Lazy virtual linkage, no bytes copied.
    Link,
}

/// The lower-cased extension of a path, without the dot. A gzip-wrapped
/// file reports the compound form, e.g. `gpx.gz` for `trip.gpx.gz`.
#[must_use]
pub fn file_extension(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if extension == "gz" {
        let inner = Path::new(path.file_stem().unwrap_or_default())
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !inner.is_empty() {
            return format!("{inner}.gz");
        }
    }
    extension
}

/// A file-backed row source, the abstraction a LINK driver exposes so the
/// engine can read an external file as a virtual table without copying it.
///
/// A row source is bound to exactly one open file handle and is exclusively
/// owned by the virtual table that registered it; it is never shared between
/// two virtual tables. Re-linking a file opens a new instance.
pub trait FileRowSource: Send {
    /// The ordered column definitions of the exposed rows.
    fn columns(&self) -> &[Column];

    /// Total row count, known at open time. Non-indexed formats pre-scan
    /// once when opened and cache the count.
    fn row_count(&self) -> u64;

    /// The ordered field values of logical row `index`, for `index` in
    /// `[0, row_count())`. Must be safe to call out of sequential order.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the index is out of range or the source
    /// was closed, and an I/O error when the seek/decode fails.
    fn row(&mut self, index: u64) -> Result<Vec<Value>>;

    /// Releases the underlying handle. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if releasing the handle fails.
    fn close(&mut self) -> Result<()>;
}

/// Contract implemented by every format driver.
pub trait FormatDriver: Send + Sync {
    /// Stable identifier used when registering LINK-mode virtual tables
    /// with the host's table-engine mechanism.
    fn identifier(&self) -> &'static str;

    /// File extensions this driver can import, lower-cased.
    fn import_extensions(&self) -> &'static [&'static str];

    /// File extensions this driver can export, lower-cased. Empty for
    /// import-only drivers.
    fn export_extensions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Description of the given format, or an empty string when the
    /// extension is not one of this driver's.
    fn format_description(&self, extension: &str) -> &'static str;

    /// Whether the extension designates a spatial format.
    fn is_spatial(&self, extension: &str) -> bool;

    /// The driver's materialization strategy.
    fn mode(&self) -> DriverMode;

    /// Imports `path` under the `table` reference (a COPY driver creates
    /// one or more ordinary tables, a LINK driver registers one virtual
    /// table) and returns the created table names.
    ///
    /// # Errors
    ///
    /// Fails with [`GeotableError::FormatUnsupported`] when the source
    /// extension is not declared, [`GeotableError::TargetAlreadyExists`]
    /// when the target exists without the delete option, and the usual
    /// parse/storage errors during the copy.
    fn import_file(
        &self,
        store: &mut dyn TabularStore,
        table: &TableRef,
        path: &Path,
        options: &DriverOptions,
        progress: &ProgressNode,
    ) -> Result<Vec<String>>;

    /// Exports `source` into `path` and returns the written file paths.
    ///
    /// The default implementation refuses: import-only drivers inherit it.
    ///
    /// # Errors
    ///
    /// Fails with [`GeotableError::FormatUnsupported`] when the destination
    /// extension is not declared for export.
    fn export_table(
        &self,
        store: &mut dyn TabularStore,
        source: &ExportSource,
        path: &Path,
        options: &DriverOptions,
        progress: &ProgressNode,
    ) -> Result<Vec<String>> {
        let _ = (store, source, options, progress);
        Err(GeotableError::FormatUnsupported {
            extension: file_extension(path),
        })
    }

    /// Opens a [`FileRowSource`] over `path` for virtual-table linkage.
    ///
    /// The default implementation refuses: COPY drivers inherit it.
    ///
    /// # Errors
    ///
    /// Fails with [`GeotableError::FormatUnsupported`] for COPY drivers,
    /// and with I/O or parse errors when the file cannot be opened.
    fn open_row_source(
        &self,
        path: &Path,
        options: &DriverOptions,
    ) -> Result<Box<dyn FileRowSource>> {
        let _ = options;
        Err(GeotableError::FormatUnsupported {
            extension: file_extension(path),
        })
    }
}

/// Validates that `path` exists and carries one of the `declared`
/// extensions. Shared by driver import entry points.
///
/// # Errors
///
/// Returns a file-not-found I/O error or
/// [`GeotableError::FormatUnsupported`].
pub fn check_importable(path: &Path, declared: &[&str]) -> Result<()> {
    if !path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )
        .into());
    }
    let extension = file_extension(path);
    if !declared.iter().any(|d| d.eq_ignore_ascii_case(&extension)) {
        return Err(GeotableError::FormatUnsupported { extension });
    }
    Ok(())
}
