//! Driver options.
//!
//! One configuration struct serves both directions, with documented
//! defaults. The legacy space-separated `key=value` convention (e.g.
//! `"fieldSeparator=| fieldDelimiter=,"`) parses onto the same struct;
//! entries without an `=` and unknown keys are ignored, so a non-conforming
//! string silently falls back to the defaults.

/// Options accepted by the import/export entry points.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Source character encoding. Only UTF-8 is decoded natively; other
    /// values are kept for host engines that transcode.
    pub encoding: Option<String>,
    /// Field separator for delimited formats. Defaults to the driver's
    /// convention (`,` for CSV).
    pub delimiter: Option<char>,
    /// Field quote character for delimited formats. Defaults to `"`.
    pub quote: Option<char>,
    /// SRID override for formats without an intrinsic reference system.
    pub srid: Option<i32>,
    /// Drop existing same-prefix tables (import) or existing files (export)
    /// before running. Defaults to `false`.
    pub delete_existing: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            encoding: None,
            delimiter: None,
            quote: None,
            srid: None,
            delete_existing: false,
        }
    }
}

impl DriverOptions {
    /// Creates options with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field separator.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Sets the field quote character.
    #[must_use]
    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Sets the source encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Sets the SRID override.
    #[must_use]
    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    /// Requests deletion of existing targets before running.
    #[must_use]
    pub fn with_delete_existing(mut self, delete_existing: bool) -> Self {
        self.delete_existing = delete_existing;
        self
    }

    /// Parses the space-separated `key=value` option-string convention.
    ///
    /// Recognized keys: `charset`, `fieldSeparator`, `fieldDelimiter`,
    /// `srid`. Anything else, including entries without an `=`, is ignored.
    #[must_use]
    pub fn parse(options: &str) -> Self {
        let mut parsed = DriverOptions::default();
        for entry in options.split_whitespace() {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            match key {
                "charset" => parsed.encoding = Some(value.to_string()),
                "fieldSeparator" => parsed.delimiter = value.chars().next(),
                "fieldDelimiter" => parsed.quote = value.chars().next(),
                "srid" => parsed.srid = value.parse().ok(),
                _ => {},
            }
        }
        parsed
    }

    /// The effective field separator given a driver default.
    #[must_use]
    pub fn delimiter_or(&self, default: char) -> char {
        self.delimiter.unwrap_or(default)
    }

    /// The effective quote character given a driver default.
    #[must_use]
    pub fn quote_or(&self, default: char) -> char {
        self.quote.unwrap_or(default)
    }
}
