//! The GPX driver.
//!
//! Import-only. A document produces up to six tables under the target
//! prefix, created lazily as element kinds appear. The presence of any of
//! the six derived names fails the job before anything is created, unless
//! the delete-existing option is set, in which case all six are dropped
//! first. A zero-length source yields a single empty table under the
//! requested name.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use geotable_core_common::{
    DriverMode, DriverOptions, FormatDriver, GeotableError, ProgressNode, Result, TableRef,
    TabularStore, check_importable, file_extension,
};

use crate::parser::{GpxImporter, TableSet};

const DESCRIPTION: &str = "GPX file (GPS eXchange Format)";

/// Default spatial reference of GPX coordinates (WGS 84).
pub const DEFAULT_SRID: i32 = 4326;

fn is_gpx_extension(extension: &str) -> bool {
    extension.eq_ignore_ascii_case("gpx") || extension.eq_ignore_ascii_case("gpx.gz")
}

/// COPY-mode driver for `.gpx` and gzip-wrapped `.gpx.gz` files.
#[derive(Debug, Default)]
pub struct GpxDriver;

impl GpxDriver {
    /// Creates the driver.
    #[must_use]
    pub fn new() -> Self {
        GpxDriver
    }
}

impl FormatDriver for GpxDriver {
    fn identifier(&self) -> &'static str {
        "GPX"
    }

    fn import_extensions(&self) -> &'static [&'static str] {
        &["gpx", "gpx.gz"]
    }

    fn format_description(&self, extension: &str) -> &'static str {
        if is_gpx_extension(extension) {
            DESCRIPTION
        } else {
            ""
        }
    }

    fn is_spatial(&self, extension: &str) -> bool {
        is_gpx_extension(extension)
    }

    fn mode(&self) -> DriverMode {
        DriverMode::Copy
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
        let srid = options.srid.unwrap_or(DEFAULT_SRID);

        // Every derived name is validated and checked for collisions (or
        // dropped) before any table is created, zero-length sources
        // included.
        let tables = TableSet::new(table)?;
        for target in tables.all() {
            if options.delete_existing {
                store.drop_table(target)?;
            } else if store.table_exists(target)? {
                return Err(GeotableError::TargetAlreadyExists {
                    table: target.to_string(),
                });
            }
        }

        // A zero-length source maps to one empty table under the prefix.
        if path.metadata()?.len() == 0 {
            if options.delete_existing {
                store.drop_table(table)?;
            } else if store.table_exists(table)? {
                return Err(GeotableError::TargetAlreadyExists {
                    table: table.to_string(),
                });
            }
            store.create_table(table, &[])?;
            return Ok(vec![table.to_string()]);
        }
        log::info!("Importing {} under prefix {table}", path.display());

        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let source: Box<dyn BufRead> = if file_extension(path).ends_with(".gz") {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        store.set_auto_commit(false)?;
        let imported = GpxImporter::new(store, &tables, srid, progress).run(source, file_size);
        store.set_auto_commit(true)?;
        imported
    }
}
