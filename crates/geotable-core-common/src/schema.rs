//! Column definitions handed to the store when drivers create tables.

/// Geometry column kinds the framework produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// A single point.
    Point,
    /// A single linestring.
    LineString,
    /// A collection of linestrings.
    MultiLineString,
}

/// Data type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Variable-length text.
    Text,
    /// 64-bit integer.
    Int,
    /// Double precision float.
    Double,
    /// Boolean.
    Bool,
    /// Geometry constrained to a kind and SRID.
    Geometry {
        /// The geometry kind stored in the column.
        kind: GeometryKind,
        /// The spatial reference identifier of the column.
        srid: i32,
    },
}

/// A named, typed table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
}

impl Column {
    /// Creates a column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
        }
    }

    /// A text column, the type every CSV-inferred column gets.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Column::new(name, DataType::Text)
    }
}
