use std::fs;

use harvester_engine::{ensure_output_dir, AtomicFileWriter, PARTIAL_SUFFIX};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("cache").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
    assert_eq!(fs::read_dir(&new_dir).unwrap().count(), 0);
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("475.json", b"{\"a\":1}").unwrap();
    assert_eq!(first.file_name().unwrap(), "475.json");
    assert_eq!(fs::read(&first).unwrap(), b"{\"a\":1}");

    let second = writer.write("475.json", b"{\"b\":2}").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"{\"b\":2}");
}

#[test]
fn no_temp_files_remain_after_write() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    writer.write("1.json", b"[]").unwrap();
    writer.write("2.json", b"[]").unwrap();

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| !n.ends_with(PARTIAL_SUFFIX)));
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("1.json", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("1.json").exists());
}
