use std::fs;

use harvester_engine::{CacheError, CacheStore};
use tempfile::TempDir;

#[test]
fn exists_reflects_completed_writes_only() {
    let temp = TempDir::new().unwrap();
    let cache = CacheStore::open(temp.path()).unwrap();
    assert!(!cache.exists(475));

    // Leftover from an interrupted write.
    fs::write(temp.path().join(".tmpXYZ.partial"), b"{\"degreeLev").unwrap();
    assert!(!cache.exists(475));

    let path = cache.write(475, br#"{"degreeLevelData": []}"#).unwrap();
    assert_eq!(path, temp.path().join("475.json"));
    assert!(cache.exists(475));
    assert_eq!(cache.cached_ids().unwrap(), vec![475]);
}

#[test]
fn payload_is_stored_verbatim_and_read_back_parsed() {
    let temp = TempDir::new().unwrap();
    let cache = CacheStore::open(temp.path()).unwrap();
    let body = br#"{"degreeLevelData":[{"instituteLegalName":"Acme","year":2022,"x":1}],"other":"kept"}"#;

    cache.write(9, body).unwrap();

    assert_eq!(cache.read_bytes(9).unwrap(), body.to_vec());
    let payload = cache.read(9).unwrap();
    assert_eq!(payload.institutions.len(), 1);
    assert_eq!(payload.institutions[0].legal_name, "Acme");
}

#[test]
fn unparsable_file_is_reported_as_corrupt() {
    let temp = TempDir::new().unwrap();
    let cache = CacheStore::open(temp.path()).unwrap();
    fs::write(temp.path().join("12.json"), b"{ truncated").unwrap();

    assert!(cache.exists(12));
    match cache.read(12) {
        Err(CacheError::Corrupt {
            program_id, path, ..
        }) => {
            assert_eq!(program_id, 12);
            assert_eq!(path, temp.path().join("12.json"));
        }
        other => panic!("expected corrupt cache error, got {other:?}"),
    }
}

#[test]
fn cached_ids_ignore_foreign_files() {
    let temp = TempDir::new().unwrap();
    let cache = CacheStore::open(temp.path()).unwrap();
    cache.write(30, b"{}").unwrap();
    cache.write(4, b"{}").unwrap();
    fs::write(temp.path().join("readme.txt"), b"hi").unwrap();
    fs::create_dir(temp.path().join("99.json")).unwrap();

    assert_eq!(cache.cached_ids().unwrap(), vec![4, 30]);
    assert!(!cache.exists(99));
}

#[test]
fn missing_directory_has_no_ids() {
    let temp = TempDir::new().unwrap();
    let cache = CacheStore::at(temp.path().join("absent"));
    assert!(cache.cached_ids().unwrap().is_empty());
    assert!(!cache.exists(1));
}
