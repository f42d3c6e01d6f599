//! End-to-end tests for the GPX driver against the in-memory store.

use std::path::PathBuf;

use geo_types::Geometry;
use geotable_core_common::{
    Column, DriverOptions, FormatDriver, GeotableError, MemoryStore, ProgressNode, TableRef,
    TabularStore, Value,
};
use geotable_gpx::GpxDriver;
use tempfile::TempDir;

fn write_gpx(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let document = format!("<?xml version=\"1.0\"?>\n<gpx version=\"1.1\">\n{body}\n</gpx>\n");
    std::fs::write(&path, document).unwrap();
    path
}

fn table(name: &str) -> TableRef {
    TableRef::parse(name).unwrap()
}

fn import(store: &mut MemoryStore, path: &PathBuf, name: &str, options: &DriverOptions) -> Result<Vec<String>, GeotableError> {
    GpxDriver::new().import_file(store, &table(name), path, options, &ProgressNode::default())
}

#[test]
fn waypoints_only_creates_the_waypoint_table() {
    let dir = TempDir::new().unwrap();
    let path = write_gpx(
        &dir,
        "points.gpx",
        "<wpt lat=\"48.5\" lon=\"2.1\"><name>home</name><ele>35.0</ele></wpt>\n\
         <wpt lat=\"48.6\" lon=\"2.2\"/>",
    );
    let mut store = MemoryStore::new();
    let created = import(&mut store, &path, "G", &DriverOptions::default()).unwrap();
    assert_eq!(created, vec!["G_WAYPOINT".to_string()]);

    let rows = store.rows(&table("G_WAYPOINT")).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], Value::Int(1));
    assert_eq!(rows[1][1], Value::Int(2));
    assert_eq!(rows[0][2], Value::Double(48.5));
    assert_eq!(rows[0][4], Value::Double(35.0));
    assert_eq!(rows[0][6], Value::Text("home".to_string()));
    assert!(rows[1][6].is_null());
    let geom = rows[0][0].as_geometry().unwrap();
    assert_eq!(geom.srid(), 4326);
    assert!(matches!(geom.geometry(), Geometry::Point(p) if p.x() == 2.1 && p.y() == 48.5));
    assert!(store.auto_commit());
}

#[test]
fn route_with_five_points_sequences_from_zero() {
    let dir = TempDir::new().unwrap();
    let mut body = String::from("<rte><name>loop</name>\n");
    for i in 0..5 {
        body.push_str(&format!("<rtept lat=\"48.{i}\" lon=\"2.{i}\"/>\n"));
    }
    body.push_str("</rte>");
    let path = write_gpx(&dir, "route.gpx", &body);

    let mut store = MemoryStore::new();
    let created = import(&mut store, &path, "R", &DriverOptions::default()).unwrap();
    assert_eq!(
        created,
        vec!["R_ROUTE".to_string(), "R_ROUTEPOINT".to_string()]
    );

    let routes = store.rows(&table("R_ROUTE")).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0][1], Value::Int(1));
    assert_eq!(routes[0][2], Value::Text("loop".to_string()));
    let geom = routes[0][0].as_geometry().unwrap();
    assert!(matches!(geom.geometry(), Geometry::LineString(ls) if ls.0.len() == 5));

    let points = store.rows(&table("R_ROUTEPOINT")).unwrap();
    assert_eq!(points.len(), 5);
    for (i, row) in points.iter().enumerate() {
        let route_id = &row[row.len() - 2];
        let sequence = &row[row.len() - 1];
        assert_eq!(*route_id, Value::Int(1));
        assert_eq!(*sequence, Value::Int(i as i64));
    }
}

#[test]
fn track_segments_and_points_nest_under_the_track() {
    let dir = TempDir::new().unwrap();
    let body = "<trk><name>hike</name>\n\
        <trkseg>\n\
        <trkpt lat=\"48.0\" lon=\"2.0\"/>\n<trkpt lat=\"48.1\" lon=\"2.1\"/>\n\
        </trkseg>\n\
        <trkseg>\n\
        <trkpt lat=\"48.2\" lon=\"2.2\"/>\n<trkpt lat=\"48.3\" lon=\"2.3\"/>\n\
        </trkseg>\n\
        </trk>";
    let path = write_gpx(&dir, "track.gpx", body);

    let mut store = MemoryStore::new();
    let created = import(&mut store, &path, "T", &DriverOptions::default()).unwrap();
    assert_eq!(
        created,
        vec![
            "T_TRACK".to_string(),
            "T_TRACKSEGMENT".to_string(),
            "T_TRACKPOINT".to_string()
        ]
    );

    let tracks = store.rows(&table("T_TRACK")).unwrap();
    assert_eq!(tracks.len(), 1);
    let geom = tracks[0][0].as_geometry().unwrap();
    assert!(matches!(geom.geometry(), Geometry::MultiLineString(ml) if ml.0.len() == 2));

    let segments = store.rows(&table("T_TRACKSEGMENT")).unwrap();
    assert_eq!(segments.len(), 2);
    // (the_geom, id, track_id, sequence)
    assert_eq!(segments[0][2], Value::Int(1));
    assert_eq!(segments[0][3], Value::Int(0));
    assert_eq!(segments[1][3], Value::Int(1));

    let points = store.rows(&table("T_TRACKPOINT")).unwrap();
    assert_eq!(points.len(), 4);
    let first_segment_id = segments[0][1].clone();
    let second_segment_id = segments[1][1].clone();
    assert_eq!(points[0][points[0].len() - 2], first_segment_id);
    assert_eq!(points[2][points[2].len() - 2], second_segment_id);
    // sequence restarts per segment
    assert_eq!(points[1][points[1].len() - 1], Value::Int(1));
    assert_eq!(points[2][points[2].len() - 1], Value::Int(0));
}

#[test]
fn empty_route_keeps_one_row_with_empty_geometry() {
    let dir = TempDir::new().unwrap();
    let path = write_gpx(&dir, "bare.gpx", "<rte><name>bare</name></rte>");
    let mut store = MemoryStore::new();
    import(&mut store, &path, "B", &DriverOptions::default()).unwrap();

    let routes = store.rows(&table("B_ROUTE")).unwrap();
    assert_eq!(routes.len(), 1);
    let geom = routes[0][0].as_geometry().unwrap();
    assert!(matches!(geom.geometry(), Geometry::LineString(ls) if ls.0.is_empty()));
    assert_eq!(store.row_count(&table("B_ROUTEPOINT")), Some(0));
}

#[test]
fn colliding_derived_name_fails_before_any_creation() {
    let dir = TempDir::new().unwrap();
    let path = write_gpx(&dir, "a.gpx", "<wpt lat=\"1\" lon=\"1\"/>");
    let mut store = MemoryStore::new();
    store
        .create_table(&table("A_TRACKPOINT"), &[Column::text("X")])
        .unwrap();

    let err = import(&mut store, &path, "A", &DriverOptions::default()).unwrap_err();
    assert!(
        matches!(err, GeotableError::TargetAlreadyExists { table } if table == "A_TRACKPOINT")
    );
    assert_eq!(store.table_names(), vec!["A_TRACKPOINT".to_string()]);
}

#[test]
fn delete_existing_drops_all_derived_tables_first() {
    let dir = TempDir::new().unwrap();
    let path = write_gpx(&dir, "a.gpx", "<wpt lat=\"1\" lon=\"1\"/>");
    let mut store = MemoryStore::new();
    store
        .create_table(&table("A_ROUTE"), &[Column::text("X")])
        .unwrap();
    store
        .create_table(&table("A_WAYPOINT"), &[Column::text("X")])
        .unwrap();

    let opts = DriverOptions::new().with_delete_existing(true);
    let created = import(&mut store, &path, "A", &opts).unwrap();
    assert_eq!(created, vec!["A_WAYPOINT".to_string()]);
    // The stale route table is gone, the waypoint table holds fresh rows.
    assert_eq!(store.table_names(), vec!["A_WAYPOINT".to_string()]);
    assert_eq!(store.row_count(&table("A_WAYPOINT")), Some(1));
}

#[test]
fn zero_length_file_creates_one_empty_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.gpx");
    std::fs::write(&path, b"").unwrap();
    let mut store = MemoryStore::new();
    let created = import(&mut store, &path, "E", &DriverOptions::default()).unwrap();
    assert_eq!(created, vec!["E".to_string()]);
    assert_eq!(store.row_count(&table("E")), Some(0));
}

#[test]
fn zero_length_file_with_delete_existing_drops_stale_derived_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.gpx");
    std::fs::write(&path, b"").unwrap();
    let mut store = MemoryStore::new();
    store
        .create_table(&table("E_WAYPOINT"), &[Column::text("X")])
        .unwrap();

    // Without delete_existing the stale derived table blocks the import.
    let err = import(&mut store, &path, "E", &DriverOptions::default()).unwrap_err();
    assert!(matches!(err, GeotableError::TargetAlreadyExists { table } if table == "E_WAYPOINT"));

    let opts = DriverOptions::new().with_delete_existing(true);
    let created = import(&mut store, &path, "E", &opts).unwrap();
    assert_eq!(created, vec!["E".to_string()]);
    assert_eq!(store.table_names(), vec!["E".to_string()]);
    assert_eq!(store.row_count(&table("E")), Some(0));
}

#[test]
fn gzip_wrapped_documents_import_like_plain_ones() {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trip.gpx.gz");
    let document = "<?xml version=\"1.0\"?>\n<gpx version=\"1.1\">\n\
        <wpt lat=\"48.5\" lon=\"2.1\"><name>home</name></wpt>\n\
        </gpx>\n";
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(document.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let mut store = MemoryStore::new();
    let created = import(&mut store, &path, "TRIP", &DriverOptions::default()).unwrap();
    assert_eq!(created, vec!["TRIP_WAYPOINT".to_string()]);
    let rows = store.rows(&table("TRIP_WAYPOINT")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], Value::Text("home".to_string()));
}

#[test]
fn misplaced_elements_are_malformed() {
    let dir = TempDir::new().unwrap();
    let mut store = MemoryStore::new();

    let orphan_rtept = write_gpx(&dir, "o1.gpx", "<rtept lat=\"1\" lon=\"1\"/>");
    let err = import(&mut store, &orphan_rtept, "O1", &DriverOptions::default()).unwrap_err();
    assert!(matches!(err, GeotableError::MalformedSource { format, .. } if format == "GPX"));

    let orphan_trkpt = write_gpx(&dir, "o2.gpx", "<trk><trkpt lat=\"1\" lon=\"1\"/></trk>");
    let err = import(&mut store, &orphan_trkpt, "O2", &DriverOptions::default()).unwrap_err();
    assert!(matches!(err, GeotableError::MalformedSource { .. }));

    let missing_lat = write_gpx(&dir, "o3.gpx", "<wpt lon=\"1\"/>");
    let err = import(&mut store, &missing_lat, "O3", &DriverOptions::default()).unwrap_err();
    assert!(matches!(err, GeotableError::MalformedSource { .. }));
    assert!(store.auto_commit());
}

#[test]
fn unknown_elements_and_extensions_are_skipped() {
    let dir = TempDir::new().unwrap();
    let body = "<metadata><name>doc</name></metadata>\n\
        <wpt lat=\"48.5\" lon=\"2.1\">\n\
        <extensions><speed>4.2</speed></extensions>\n\
        <name>kept</name>\n\
        </wpt>";
    let path = write_gpx(&dir, "ext.gpx", body);
    let mut store = MemoryStore::new();
    import(&mut store, &path, "X", &DriverOptions::default()).unwrap();

    let rows = store.rows(&table("X_WAYPOINT")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], Value::Text("kept".to_string()));
}

#[test]
fn srid_override_tags_all_geometries() {
    let dir = TempDir::new().unwrap();
    let path = write_gpx(&dir, "s.gpx", "<wpt lat=\"1\" lon=\"1\"/>");
    let mut store = MemoryStore::new();
    let opts = DriverOptions::new().with_srid(2154);
    import(&mut store, &path, "S", &opts).unwrap();
    let rows = store.rows(&table("S_WAYPOINT")).unwrap();
    assert_eq!(rows[0][0].as_geometry().unwrap().srid(), 2154);
}
