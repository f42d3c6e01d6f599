//! Dispatch tests driving real files through the built-in registry.

use geotable_core::DriverRegistry;
use geotable_core_common::{
    DriverOptions, ExportSource, GeotableError, MemoryStore, ProgressNode, TableRef, TabularStore,
    Value,
};
use tempfile::TempDir;

#[test]
fn import_dispatches_on_extension_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Cities.CSV");
    std::fs::write(&path, "ID,NAME\n1,Paris\n").unwrap();

    let registry = DriverRegistry::with_builtin_drivers();
    let mut store = MemoryStore::new();
    let created = registry
        .import_file(
            &mut store,
            &TableRef::new("CITIES"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap();
    assert_eq!(created, vec!["CITIES".to_string()]);
    assert_eq!(store.row_count(&TableRef::new("CITIES")), Some(1));
}

#[test]
fn open_file_as_table_derives_the_name_from_the_stem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("readings.tsv");
    std::fs::write(&path, "A\tB\n1\t2\n3\t4\n").unwrap();

    let registry = DriverRegistry::with_builtin_drivers();
    let mut store = MemoryStore::new();
    let name = registry
        .open_file_as_table(&mut store, &path, None)
        .unwrap();
    assert_eq!(name, "READINGS");

    let target = TableRef::new("READINGS");
    let (engine, _) = store.link_info(&target).unwrap();
    assert_eq!(engine, "TSV");
    let scan = store.scan(&ExportSource::Table(target)).unwrap();
    assert_eq!(scan.rows.len(), 2);
    assert_eq!(scan.rows[0][0], Value::Text("1".to_string()));
}

#[test]
fn open_file_as_table_rejects_invalid_stems() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("1-bad name.tsv");
    std::fs::write(&path, "A\n1\n").unwrap();

    let registry = DriverRegistry::with_builtin_drivers();
    let mut store = MemoryStore::new();
    let err = registry
        .open_file_as_table(&mut store, &path, None)
        .unwrap_err();
    assert!(matches!(err, GeotableError::InvalidIdentifier { .. }));
    assert!(store.table_names().is_empty());
}

#[test]
fn open_file_as_table_rejects_existing_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dup.tsv");
    std::fs::write(&path, "A\n1\n").unwrap();

    let registry = DriverRegistry::with_builtin_drivers();
    let mut store = MemoryStore::new();
    registry.open_file_as_table(&mut store, &path, None).unwrap();
    let err = registry
        .open_file_as_table(&mut store, &path, None)
        .unwrap_err();
    assert!(matches!(err, GeotableError::TargetAlreadyExists { table } if table == "DUP"));
}

#[test]
fn gpx_import_dispatches_and_prefixes_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trip.gpx");
    std::fs::write(
        &path,
        "<?xml version=\"1.0\"?><gpx version=\"1.1\"><wpt lat=\"48.5\" lon=\"2.1\"/></gpx>",
    )
    .unwrap();

    let registry = DriverRegistry::with_builtin_drivers();
    let mut store = MemoryStore::new();
    let created = registry
        .import_file(
            &mut store,
            &TableRef::new("TRIP"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap();
    assert_eq!(created, vec!["TRIP_WAYPOINT".to_string()]);
}
