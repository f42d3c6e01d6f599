//! Names and column sets of the tables a GPX import produces.
//!
//! All six tables hang off the requested prefix. Point-carrying tables
//! (waypoints, route points, track points) share the same descriptive
//! columns; the nested ones add a parent foreign key and a `sequence`
//! ordinal scoped to that parent.

use geotable_core_common::{Column, DataType, GeometryKind};

/// Suffix of the waypoint table.
pub const WAYPOINT_SUFFIX: &str = "_WAYPOINT";
/// Suffix of the route table.
pub const ROUTE_SUFFIX: &str = "_ROUTE";
/// Suffix of the route point table.
pub const ROUTEPOINT_SUFFIX: &str = "_ROUTEPOINT";
/// Suffix of the track table.
pub const TRACK_SUFFIX: &str = "_TRACK";
/// Suffix of the track segment table.
pub const TRACKSEGMENT_SUFFIX: &str = "_TRACKSEGMENT";
/// Suffix of the track point table.
pub const TRACKPOINT_SUFFIX: &str = "_TRACKPOINT";

/// All table suffixes, parents before children.
pub const ALL_SUFFIXES: [&str; 6] = [
    WAYPOINT_SUFFIX,
    ROUTE_SUFFIX,
    ROUTEPOINT_SUFFIX,
    TRACK_SUFFIX,
    TRACKSEGMENT_SUFFIX,
    TRACKPOINT_SUFFIX,
];

fn geometry(kind: GeometryKind, srid: i32) -> DataType {
    DataType::Geometry { kind, srid }
}

fn point_columns(srid: i32) -> Vec<Column> {
    vec![
        Column::new("the_geom", geometry(GeometryKind::Point, srid)),
        Column::new("id", DataType::Int),
        Column::new("lat", DataType::Double),
        Column::new("lon", DataType::Double),
        Column::new("ele", DataType::Double),
        Column::text("time"),
        Column::text("name"),
        Column::text("cmt"),
        Column::text("description"),
        Column::text("src"),
        Column::text("sym"),
        Column::text("type"),
    ]
}

/// Columns of the waypoint table.
#[must_use]
pub fn waypoint_columns(srid: i32) -> Vec<Column> {
    point_columns(srid)
}

/// Columns of the route table.
#[must_use]
pub fn route_columns(srid: i32) -> Vec<Column> {
    collection_columns(GeometryKind::LineString, srid)
}

/// Columns of the route point table: waypoint columns plus the owning
/// route and the point's ordinal within it.
#[must_use]
pub fn routepoint_columns(srid: i32) -> Vec<Column> {
    let mut columns = point_columns(srid);
    columns.push(Column::new("route_id", DataType::Int));
    columns.push(Column::new("sequence", DataType::Int));
    columns
}

/// Columns of the track table.
#[must_use]
pub fn track_columns(srid: i32) -> Vec<Column> {
    collection_columns(GeometryKind::MultiLineString, srid)
}

/// Columns of the track segment table.
#[must_use]
pub fn tracksegment_columns(srid: i32) -> Vec<Column> {
    vec![
        Column::new("the_geom", geometry(GeometryKind::LineString, srid)),
        Column::new("id", DataType::Int),
        Column::new("track_id", DataType::Int),
        Column::new("sequence", DataType::Int),
    ]
}

/// Columns of the track point table: waypoint columns plus the owning
/// segment and the point's ordinal within it.
#[must_use]
pub fn trackpoint_columns(srid: i32) -> Vec<Column> {
    let mut columns = point_columns(srid);
    columns.push(Column::new("segment_id", DataType::Int));
    columns.push(Column::new("sequence", DataType::Int));
    columns
}

fn collection_columns(kind: GeometryKind, srid: i32) -> Vec<Column> {
    vec![
        Column::new("the_geom", geometry(kind, srid)),
        Column::new("id", DataType::Int),
        Column::text("name"),
        Column::text("cmt"),
        Column::text("description"),
        Column::text("src"),
        Column::new("number", DataType::Int),
        Column::text("type"),
    ]
}
