use nexus_softdelete::{DbError, LifecycleStrategy, SoftDeleteConfig};
use std::fs;
use tempfile::tempdir;

#[test]
fn config_loads_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("softdelete.toml");
    fs::write(&path, "strategy = \"conditional_update\"\npersist_concurrency = 2\n").unwrap();
    let cfg = SoftDeleteConfig::from_path(&path).unwrap();
    assert_eq!(cfg.strategy, LifecycleStrategy::ConditionalUpdate);
    assert_eq!(cfg.persist_concurrency, 2);
    assert!(cfg.audit);
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = SoftDeleteConfig::from_path(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, DbError::Io(_)));
}

#[test]
fn malformed_config_file_is_toml_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "persist_concurrency = \"many\"").unwrap();
    assert!(matches!(SoftDeleteConfig::from_path(&path), Err(DbError::Toml(_))));
}
