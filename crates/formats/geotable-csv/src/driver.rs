//! The CSV driver.
//!
//! Import streams the source through a buffered CSV reader, derives a
//! text-typed schema from the header row and inserts rows in batches of
//! [`BATCH_MAX_SIZE`]. Each batch is committed as it is flushed, so a
//! failure or cancellation mid-import leaves the already flushed batches
//! in place. Export mirrors a table or sub-query scan back out, header
//! first, rendering NULL as the empty field.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use geotable_core_common::{
    Column, DriverMode, DriverOptions, ExportSource, FormatDriver, GeotableError, ProgressNode,
    Result, TableRef, TabularStore, Value, check_importable, file_extension,
};

/// Rows accumulated before a batch is flushed and committed.
pub const BATCH_MAX_SIZE: usize = 100;

const DESCRIPTION: &str = "CSV file (Comma Separated Values)";

/// COPY-mode driver for `.csv` files.
#[derive(Debug, Default)]
pub struct CsvDriver;

impl CsvDriver {
    /// Creates the driver.
    #[must_use]
    pub fn new() -> Self {
        CsvDriver
    }
}

fn csv_parse_error(err: &csv::Error) -> GeotableError {
    GeotableError::MalformedSource {
        format: "CSV".to_string(),
        line: err.position().map(csv::Position::line),
        message: err.to_string(),
    }
}

/// An ASCII option character, or the driver default when the option is
/// unset or outside the single-byte range the codec accepts.
fn byte_option(value: Option<char>, default: u8) -> u8 {
    value
        .filter(char::is_ascii)
        .map_or(default, |c| c as u8)
}

fn header_columns(headers: &csv::StringRecord) -> Result<Vec<Column>> {
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(GeotableError::malformed("CSV", "missing header row"));
    }
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if name.is_empty() {
                Column::text(format!("COL{}", i + 1))
            } else {
                Column::text(name)
            }
        })
        .collect())
}

fn copy_rows(
    store: &mut dyn TabularStore,
    table: &TableRef,
    path: &Path,
    options: &DriverOptions,
    progress: &ProgressNode,
) -> Result<()> {
    let file_size = path.metadata()?.len();
    let mut reader = ReaderBuilder::new()
        .delimiter(byte_option(options.delimiter, b','))
        .quote(byte_option(options.quote, b'"'))
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_parse_error(&e))?;

    let columns = header_columns(&reader.headers().map_err(|e| csv_parse_error(&e))?.clone())?;
    store.create_table(table, &columns)?;

    // Percent progress keyed on the byte offset of the reader.
    let node = progress.sub_process(100);
    let mut batch: Vec<Vec<Value>> = Vec::with_capacity(BATCH_MAX_SIZE);
    for record in reader.records() {
        // Checkpoint before decoding the next record; the in-flight batch
        // is abandoned, only flushed batches stay committed.
        if node.is_cancelled() {
            return Err(GeotableError::Cancelled);
        }
        let record = record.map_err(|e| csv_parse_error(&e))?;
        let row = (0..columns.len())
            .map(|i| match record.get(i) {
                Some(field) => Value::Text(field.to_string()),
                None => Value::Null,
            })
            .collect();
        batch.push(row);
        if batch.len() >= BATCH_MAX_SIZE {
            store.append_batch(table, std::mem::take(&mut batch))?;
            if file_size > 0 {
                let offset = record.position().map_or(0, csv::Position::byte);
                node.set_step(offset * 100 / file_size);
            }
        }
    }
    if !batch.is_empty() {
        store.append_batch(table, batch)?;
    }
    node.end_of_progress();
    Ok(())
}

impl FormatDriver for CsvDriver {
    fn identifier(&self) -> &'static str {
        "CSV"
    }

    fn import_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn export_extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn format_description(&self, extension: &str) -> &'static str {
        if extension.eq_ignore_ascii_case("csv") {
            DESCRIPTION
        } else {
            ""
        }
    }

    fn is_spatial(&self, _extension: &str) -> bool {
        false
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
        if options.delete_existing {
            store.drop_table(table)?;
        } else if store.table_exists(table)? {
            return Err(GeotableError::TargetAlreadyExists {
                table: table.to_string(),
            });
        }
        log::info!("Importing {} into {table}", path.display());

        store.set_auto_commit(false)?;
        let copied = copy_rows(store, table, path, options, progress);
        store.set_auto_commit(true)?;
        copied?;
        Ok(vec![table.to_string()])
    }

    fn export_table(
        &self,
        store: &mut dyn TabularStore,
        source: &ExportSource,
        path: &Path,
        options: &DriverOptions,
        progress: &ProgressNode,
    ) -> Result<Vec<String>> {
        let extension = file_extension(path);
        if !extension.eq_ignore_ascii_case("csv") {
            return Err(GeotableError::FormatUnsupported { extension });
        }
        if options.delete_existing && path.is_file() {
            std::fs::remove_file(path)?;
        }
        log::info!("Exporting {source} into {}", path.display());

        let scan = store.scan(source)?;
        let node = progress.sub_process(scan.rows.len() as u64);
        let mut writer = WriterBuilder::new()
            .delimiter(byte_option(options.delimiter, b','))
            .quote(byte_option(options.quote, b'"'))
            .from_writer(BufWriter::new(File::create(path)?));

        writer
            .write_record(scan.columns.iter().map(|c| c.name.as_str()))
            .map_err(|e| GeotableError::storage(e.to_string()))?;
        for row in &scan.rows {
            if node.is_cancelled() {
                return Err(GeotableError::Cancelled);
            }
            let fields = row
                .iter()
                .map(Value::to_export_text)
                .collect::<Result<Vec<_>>>()?;
            writer
                .write_record(&fields)
                .map_err(|e| GeotableError::storage(e.to_string()))?;
            node.end_step();
        }
        writer.flush()?;
        node.end_of_progress();
        Ok(vec![path.display().to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_declares_csv_both_ways() {
        let driver = CsvDriver::new();
        assert_eq!(driver.import_extensions(), &["csv"]);
        assert_eq!(driver.export_extensions(), &["csv"]);
        assert_eq!(driver.mode(), DriverMode::Copy);
        assert!(!driver.is_spatial("csv"));
    }

    #[test]
    fn description_is_empty_for_other_extensions() {
        let driver = CsvDriver::new();
        assert_eq!(driver.format_description("csv"), DESCRIPTION);
        assert_eq!(driver.format_description("CSV"), DESCRIPTION);
        assert_eq!(driver.format_description("tsv"), "");
    }

    #[test]
    fn byte_option_falls_back_on_wide_chars() {
        assert_eq!(byte_option(Some(';'), b','), b';');
        assert_eq!(byte_option(Some('\u{00e9}'), b','), b','); // non-ASCII
        assert_eq!(byte_option(None, b','), b',');
    }

    #[test]
    fn header_columns_rejects_all_empty_header() {
        let headers = csv::StringRecord::from(vec!["", ""]);
        let err = header_columns(&headers).unwrap_err();
        assert!(matches!(err, GeotableError::MalformedSource { .. }));
    }

    #[test]
    fn header_columns_names_blank_fields() {
        let headers = csv::StringRecord::from(vec!["ID", "", "NAME"]);
        let columns = header_columns(&headers).unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "COL2", "NAME"]);
    }
}
