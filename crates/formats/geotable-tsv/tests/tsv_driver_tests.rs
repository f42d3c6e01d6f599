//! End-to-end tests for the TSV driver against the in-memory store.

use std::path::PathBuf;

use geotable_core_common::{
    DriverOptions, ExportSource, FormatDriver, GeotableError, MemoryStore, ProgressNode, TableRef,
    TabularStore, Value,
};
use geotable_tsv::TsvDriver;
use tempfile::TempDir;

fn write_tsv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn table(name: &str) -> TableRef {
    TableRef::parse(name).unwrap()
}

#[test]
fn import_registers_a_virtual_table_without_copying() {
    let dir = TempDir::new().unwrap();
    let path = write_tsv(&dir, "data.tsv", "A\tB\n1\t2\n3\t4\n");
    let mut store = MemoryStore::new();

    let created = TsvDriver::new()
        .import_file(
            &mut store,
            &table("LINKED"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap();
    assert_eq!(created, vec!["LINKED".to_string()]);

    // The table is virtual: the store holds the link, not the rows.
    let target = table("LINKED");
    let (engine, linked_path) = store.link_info(&target).unwrap();
    assert_eq!(engine, "TSV");
    assert_eq!(linked_path, path.as_path());
    assert!(store.rows(&target).is_none());
    assert_eq!(store.row_count(&target), Some(2));

    // A scan materializes through the row source on demand.
    let scan = store.scan(&ExportSource::parse("LINKED").unwrap()).unwrap();
    assert_eq!(scan.columns.len(), 2);
    assert_eq!(scan.rows.len(), 2);
    assert_eq!(scan.rows[1][0], Value::Text("3".to_string()));
}

#[test]
fn scan_sees_file_changes_made_after_linking() {
    let dir = TempDir::new().unwrap();
    let path = write_tsv(&dir, "live.tsv", "A\n1\n");
    let mut store = MemoryStore::new();
    TsvDriver::new()
        .import_file(
            &mut store,
            &table("LIVE"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap();

    std::fs::write(&path, "A\n1\nchanged\n").unwrap();
    // The pre-scanned offsets cover the original extent only; rows appended
    // afterwards appear once the file is re-linked.
    let opts = DriverOptions::new().with_delete_existing(true);
    TsvDriver::new()
        .import_file(&mut store, &table("LIVE"), &path, &opts, &ProgressNode::default())
        .unwrap();
    let scan = store.scan(&ExportSource::parse("LIVE").unwrap()).unwrap();
    assert_eq!(scan.rows.len(), 2);
    assert_eq!(scan.rows[1][0], Value::Text("changed".to_string()));
}

#[test]
fn import_rejects_existing_target_without_delete_option() {
    let dir = TempDir::new().unwrap();
    let path = write_tsv(&dir, "a.tsv", "A\n1\n");
    let mut store = MemoryStore::new();
    let driver = TsvDriver::new();
    driver
        .import_file(
            &mut store,
            &table("A"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap();
    let err = driver
        .import_file(
            &mut store,
            &table("A"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap_err();
    assert!(matches!(err, GeotableError::TargetAlreadyExists { table } if table == "A"));
}

#[test]
fn dropping_the_virtual_table_releases_the_source() {
    let dir = TempDir::new().unwrap();
    let path = write_tsv(&dir, "a.tsv", "A\n1\n");
    let mut store = MemoryStore::new();
    TsvDriver::new()
        .import_file(
            &mut store,
            &table("A"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap();
    store.drop_table(&table("A")).unwrap();
    assert!(store.table_names().is_empty());
    let err = store.scan(&ExportSource::parse("A").unwrap()).unwrap_err();
    assert!(matches!(err, GeotableError::Storage { .. }));
}

#[test]
fn import_rejects_undeclared_extension() {
    let dir = TempDir::new().unwrap();
    let path = write_tsv(&dir, "a.csv", "A\n1\n");
    let mut store = MemoryStore::new();
    let err = TsvDriver::new()
        .import_file(
            &mut store,
            &table("A"),
            &path,
            &DriverOptions::default(),
            &ProgressNode::default(),
        )
        .unwrap_err();
    assert!(matches!(err, GeotableError::FormatUnsupported { extension } if extension == "csv"));
}
