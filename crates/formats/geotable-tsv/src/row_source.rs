//! Seekable row access over a tab-separated file.
//!
//! The format carries no index, so opening pre-scans the file once,
//! deriving text columns from the header line and recording the byte
//! offset of every data line. Random row access then seeks straight to
//! the recorded offset.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use geotable_core_common::{Column, FileRowSource, GeotableError, Result, Value};

fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// A [`FileRowSource`] over one open tab-separated file.
#[derive(Debug)]
pub struct TsvRowSource {
    columns: Vec<Column>,
    offsets: Vec<u64>,
    file: Option<BufReader<File>>,
}

impl TsvRowSource {
    /// Opens `path`, reads the header and records every data-line offset.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be read and
    /// [`GeotableError::MalformedSource`] when the header line is missing
    /// or empty.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut line = String::new();
        let mut position = reader.read_line(&mut line)? as u64;
        let header = trim_line_ending(&line);
        if header.is_empty() {
            return Err(GeotableError::malformed("TSV", "missing header row"));
        }
        let columns = header
            .split('\t')
            .enumerate()
            .map(|(i, name)| {
                if name.is_empty() {
                    Column::text(format!("COL{}", i + 1))
                } else {
                    Column::text(name)
                }
            })
            .collect();

        let mut offsets = Vec::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)? as u64;
            if read == 0 {
                break;
            }
            if !trim_line_ending(&line).is_empty() {
                offsets.push(position);
            }
            position += read;
        }
        Ok(TsvRowSource {
            columns,
            offsets,
            file: Some(reader),
        })
    }
}

impl FileRowSource for TsvRowSource {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.offsets.len() as u64
    }

    fn row(&mut self, index: u64) -> Result<Vec<Value>> {
        let offset = *self
            .offsets
            .get(usize::try_from(index).unwrap_or(usize::MAX))
            .ok_or_else(|| {
                GeotableError::storage(format!(
                    "row index {index} out of range 0..{}",
                    self.offsets.len()
                ))
            })?;
        let reader = self
            .file
            .as_mut()
            .ok_or_else(|| GeotableError::storage("row source is closed"))?;
        reader.seek(SeekFrom::Start(offset))?;
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = trim_line_ending(&line);

        let mut fields = line.split('\t');
        // Short rows pad with NULL, extra fields are dropped.
        Ok((0..self.columns.len())
            .map(|_| match fields.next() {
                Some(field) => Value::Text(field.to_string()),
                None => Value::Null,
            })
            .collect())
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}
