//! The TSV driver.
//!
//! LINK mode: importing registers one virtual table bound to the source
//! file through a [`TsvRowSource`]; no rows are copied and the table
//! reflects the file as long as the link exists.

use std::path::Path;

use geotable_core_common::{
    DriverMode, DriverOptions, FileRowSource, FormatDriver, GeotableError, ProgressNode, Result,
    TableRef, TabularStore, check_importable,
};

use crate::row_source::TsvRowSource;

const DESCRIPTION: &str = "TSV file (Tab Separated Values)";

/// LINK-mode driver for `.tsv` files.
#[derive(Debug, Default)]
pub struct TsvDriver;

impl TsvDriver {
    /// Creates the driver.
    #[must_use]
    pub fn new() -> Self {
        TsvDriver
    }
}

impl FormatDriver for TsvDriver {
    fn identifier(&self) -> &'static str {
        "TSV"
    }

    fn import_extensions(&self) -> &'static [&'static str] {
        &["tsv"]
    }

    fn format_description(&self, extension: &str) -> &'static str {
        if extension.eq_ignore_ascii_case("tsv") {
            DESCRIPTION
        } else {
            ""
        }
    }

    fn is_spatial(&self, _extension: &str) -> bool {
        false
    }

    fn mode(&self) -> DriverMode {
        DriverMode::Link
    }

    fn import_file(
        &self,
        store: &mut dyn TabularStore,
        table: &TableRef,
        path: &Path,
        options: &DriverOptions,
        progress: &ProgressNode,
    ) -> Result<Vec<String>> {
        check_importable(path, self.import_extensions())?;
        if options.delete_existing {
            store.drop_table(table)?;
        } else if store.table_exists(table)? {
            return Err(GeotableError::TargetAlreadyExists {
                table: table.to_string(),
            });
        }
        if progress.is_cancelled() {
            return Err(GeotableError::Cancelled);
        }
        log::info!("Linking {} as {table}", path.display());

        let source = self.open_row_source(path, options)?;
        store.create_linked_table(table, self.identifier(), path, source)?;
        progress.end_of_progress();
        Ok(vec![table.to_string()])
    }

    fn open_row_source(
        &self,
        path: &Path,
        _options: &DriverOptions,
    ) -> Result<Box<dyn FileRowSource>> {
        check_importable(path, self.import_extensions())?;
        Ok(Box::new(TsvRowSource::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_links_rather_than_copies() {
        let driver = TsvDriver::new();
        assert_eq!(driver.mode(), DriverMode::Link);
        assert_eq!(driver.import_extensions(), &["tsv"]);
        assert!(driver.export_extensions().is_empty());
        assert!(!driver.is_spatial("tsv"));
    }

    #[test]
    fn description_is_empty_for_other_extensions() {
        let driver = TsvDriver::new();
        assert_eq!(driver.format_description("tsv"), DESCRIPTION);
        assert_eq!(driver.format_description("csv"), "");
    }
}
