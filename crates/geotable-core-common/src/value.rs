//! Field values and SRID-tagged geometries.
//!
//! Drivers exchange rows with the store as ordered tuples of [`Value`]. The
//! geometry payload is deliberately opaque: it wraps a [`geo_types`] geometry
//! together with its SRID, and the only operations the framework needs are
//! the point/line/multi-line constructors and WKT rendering.

use std::fmt;

use geo_types::{Coord, Geometry, LineString, MultiLineString, Point};
use geozero::ToWkt;

use crate::error::{GeotableError, Result};

/// An SRID-tagged geometry value.
#[derive(Debug, Clone, PartialEq)]
pub struct Geom {
    geometry: Geometry<f64>,
    srid: i32,
}

impl Geom {
    /// A point from `(x, y)` coordinates.
    #[must_use]
    pub fn point(x: f64, y: f64, srid: i32) -> Self {
        Geom {
            geometry: Geometry::Point(Point::new(x, y)),
            srid,
        }
    }

    /// A linestring through `coords` in order. An empty slice yields an
    /// empty (degenerate) linestring, not an error.
    #[must_use]
    pub fn line(coords: &[(f64, f64)], srid: i32) -> Self {
        Geom {
            geometry: Geometry::LineString(line_string(coords)),
            srid,
        }
    }

    /// A multi-linestring with one part per entry of `parts`.
    #[must_use]
    pub fn multi_line(parts: &[Vec<(f64, f64)>], srid: i32) -> Self {
        let lines: Vec<LineString<f64>> = parts.iter().map(|p| line_string(p)).collect();
        Geom {
            geometry: Geometry::MultiLineString(MultiLineString::new(lines)),
            srid,
        }
    }

    /// The spatial reference identifier this geometry is tagged with.
    #[must_use]
    pub fn srid(&self) -> i32 {
        self.srid
    }

    /// The wrapped geometry.
    #[must_use]
    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    /// Renders the geometry as WKT.
    ///
    /// # Errors
    ///
    /// Returns a storage error if WKT serialization fails.
    pub fn wkt(&self) -> Result<String> {
        self.geometry
            .to_wkt()
            .map_err(|e| GeotableError::storage(format!("WKT serialization failed: {e}")))
    }
}

fn line_string(coords: &[(f64, f64)]) -> LineString<f64> {
    LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect())
}

/// A single typed field value within a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Text field.
    Text(String),
    /// 64-bit integer field.
    Int(i64),
    /// Double precision field.
    Double(f64),
    /// Boolean field.
    Bool(bool),
    /// Geometry field.
    Geometry(Geom),
}

impl Value {
    /// The text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The geometry payload, if this is a geometry value.
    #[must_use]
    pub fn as_geometry(&self) -> Option<&Geom> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Whether this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text rendering used when streaming rows out to delimited files:
    /// NULL becomes the empty string and geometries their WKT form.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a geometry cannot be rendered.
    pub fn to_export_text(&self) -> Result<String> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Double(d) => Ok(d.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Geometry(g) => g.wkt(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<Geom> for Value {
    fn from(g: Geom) -> Self {
        Value::Geometry(g)
    }
}

/// An optional value maps absent to NULL.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Text(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Geometry(g) => f.write_str(&g.wkt().map_err(|_| fmt::Error)?),
        }
    }
}
