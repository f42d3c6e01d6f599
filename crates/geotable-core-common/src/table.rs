//! Table references and identifier handling.
//!
//! A [`TableRef`] is parsed from a dotted, optionally double-quoted path
//! string (`[[catalog.]schema.]table`). Unquoted parts are upper-cased, the
//! convention of case-folding relational engines; quoted parts are kept
//! verbatim. Derived names (from file stems or suffixes) must satisfy the
//! identifier grammar `[A-Za-z_][A-Za-z0-9_]*` before any table is created.

use std::fmt;
use std::path::Path;

use crate::error::{GeotableError, Result};

/// Whether `name` satisfies the host identifier grammar.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A `[[catalog.]schema.]table` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    catalog: Option<String>,
    schema: Option<String>,
    table: String,
}

impl TableRef {
    /// A bare table reference with no schema or catalog.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        TableRef {
            catalog: None,
            schema: None,
            table: table.into(),
        }
    }

    /// A schema-qualified table reference.
    #[must_use]
    pub fn with_schema(schema: impl Into<String>, table: impl Into<String>) -> Self {
        TableRef {
            catalog: None,
            schema: Some(schema.into()),
            table: table.into(),
        }
    }

    /// Parses a dotted, optionally quoted reference string.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::InvalidIdentifier`] when the string is empty,
    /// has more than three parts, contains an empty part, or an unquoted
    /// part violates the identifier grammar.
    pub fn parse(reference: &str) -> Result<Self> {
        let parts = split_reference(reference)?;
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(table), None, None) => Ok(TableRef {
                catalog: None,
                schema: None,
                table,
            }),
            (Some(schema), Some(table), None) => Ok(TableRef {
                catalog: None,
                schema: Some(schema),
                table,
            }),
            (Some(catalog), Some(schema), Some(table)) => Ok(TableRef {
                catalog: Some(catalog),
                schema: Some(schema),
                table,
            }),
            _ => Err(invalid(reference, "empty table reference")),
        }
    }

    /// Derives a table reference from the source file's base name,
    /// upper-cased.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::InvalidIdentifier`] when the stem does not
    /// satisfy the identifier grammar.
    pub fn from_file_stem(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_uppercase();
        if !is_valid_identifier(&stem) {
            return Err(invalid(
                &stem,
                "file name does not map to a valid table name",
            ));
        }
        Ok(TableRef::new(stem))
    }

    /// The unqualified table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The schema part, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// The catalog part, if any.
    #[must_use]
    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    /// The same reference with `suffix` appended to the table name.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::InvalidIdentifier`] when the combined name
    /// violates the identifier grammar.
    pub fn with_suffix(&self, suffix: &str) -> Result<TableRef> {
        let table = format!("{}{}", self.table, suffix);
        if !is_valid_identifier(&table) {
            return Err(invalid(&table, "derived table name is not a valid identifier"));
        }
        Ok(TableRef {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            table,
        })
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", quote_part(catalog))?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_part(schema))?;
        }
        f.write_str(&quote_part(&self.table))
    }
}

/// Splits on unquoted dots; unquoted parts are upper-cased, quoted parts
/// kept verbatim with their quotes stripped.
fn split_reference(reference: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted_part = false;
    let mut in_quotes = false;
    for c in reference.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted_part = true;
            },
            '.' if !in_quotes => {
                parts.push(finish_part(reference, current, quoted_part)?);
                current = String::new();
                quoted_part = false;
            },
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(invalid(reference, "unterminated quote"));
    }
    parts.push(finish_part(reference, current, quoted_part)?);
    if parts.len() > 3 {
        return Err(invalid(reference, "more than three dotted parts"));
    }
    Ok(parts)
}

fn finish_part(reference: &str, part: String, quoted: bool) -> Result<String> {
    if part.is_empty() {
        return Err(invalid(reference, "empty part in table reference"));
    }
    if quoted {
        return Ok(part);
    }
    if !is_valid_identifier(&part) {
        return Err(invalid(&part, "not a valid identifier"));
    }
    Ok(part.to_ascii_uppercase())
}

fn quote_part(part: &str) -> String {
    if is_valid_identifier(part) && part == part.to_ascii_uppercase() {
        part.to_string()
    } else {
        format!("\"{part}\"")
    }
}

fn invalid(identifier: &str, reason: &str) -> GeotableError {
    GeotableError::InvalidIdentifier {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    }
}

/// The source of an export: an ordinary table or a parenthesized sub-query
/// forwarded to the host engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    /// Export the rows of a table.
    Table(TableRef),
    /// Export the result of a sub-query such as `(SELECT * FROM T LIMIT 1)`.
    Query(String),
}

impl ExportSource {
    /// Parses a source string: a leading parenthesis marks a sub-query,
    /// anything else is parsed as a table reference.
    ///
    /// # Errors
    ///
    /// Returns [`GeotableError::InvalidIdentifier`] when the table reference
    /// form is malformed.
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.starts_with('(') {
            Ok(ExportSource::Query(trimmed.to_string()))
        } else {
            Ok(ExportSource::Table(TableRef::parse(trimmed)?))
        }
    }
}

impl fmt::Display for ExportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportSource::Table(table) => table.fmt(f),
            ExportSource::Query(query) => f.write_str(query),
        }
    }
}
