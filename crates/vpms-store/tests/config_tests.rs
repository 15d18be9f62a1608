//! Storage configuration loading

use std::fs;
use tempfile::TempDir;
use vpms_store::{StorageRegistry, StoreError};

#[test]
fn test_load_storage_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.toml");
    fs::write(
        &path,
        r#"
extend_builtin = true

[[kinds]]
kind = "Patient"
parent = "Party"
"#,
    )
    .unwrap();

    let registry = StorageRegistry::load(&path).unwrap();
    let mapping = registry.resolve("Patient").unwrap();
    assert_eq!(mapping.kind, "Entity");
    assert_eq!(mapping.details, "entity_details");
    assert_eq!(registry.classification_for("Patient").unwrap().unwrap().table, "entity_classifications");
}

#[test]
fn test_load_rejects_malformed_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.toml");
    fs::write(&path, "[[mappings]]\nkind = 3\n").unwrap();

    let err = StorageRegistry::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::Config { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_load_missing_config_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = StorageRegistry::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[test]
fn test_unmapped_kind_chain_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("storage.toml");
    fs::write(
        &path,
        r#"
[[kinds]]
kind = "Invoice"
parent = "FinancialAct"
"#,
    )
    .unwrap();

    let registry = StorageRegistry::load(&path).unwrap();
    match registry.resolve("Invoice") {
        Err(StoreError::NoMapping { kind, searched }) => {
            assert_eq!(kind, "Invoice");
            assert_eq!(searched, vec!["Invoice".to_string(), "FinancialAct".to_string()]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
