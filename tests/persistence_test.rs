#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn lock_cmd(db_path: &Path, args: &[&str]) -> Output {
    Command::new(cargo_bin!("payment-commons"))
        .arg("lock")
        .args(args)
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_rocksdb_lock_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: procA takes the lock
    let output1 = lock_cmd(&db_path, &["acquire", "txn-42", "procA", "--lease-secs", "60"]);
    assert!(output1.status.success());
    assert_eq!(String::from_utf8_lossy(&output1.stdout).trim(), "true");

    // 2. Second run: procB finds it held
    let output2 = lock_cmd(&db_path, &["acquire", "txn-42", "procB"]);
    assert!(output2.status.success());
    assert_eq!(String::from_utf8_lossy(&output2.stdout).trim(), "false");

    let status = lock_cmd(&db_path, &["status", "txn-42"]);
    assert!(String::from_utf8_lossy(&status.stdout).starts_with("locked,procA,"));

    // 3. procB may not release it, procA may
    let denied = lock_cmd(&db_path, &["release", "txn-42", "procB"]);
    assert!(!denied.status.success());

    let released = lock_cmd(&db_path, &["release", "txn-42", "procA"]);
    assert!(released.status.success());

    let status = lock_cmd(&db_path, &["status", "txn-42"]);
    assert_eq!(String::from_utf8_lossy(&status.stdout).trim(), "unlocked");
}
