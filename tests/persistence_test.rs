#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use common::{CLI_SEED, COMMAND_HEADER, temp_file};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed the club and pay Ana's green fee
    let seed = temp_file(CLI_SEED);
    let feed1 = temp_file(&format!(
        "{}\npay,club-1,,,,li-1,107,,cash,,,,pro,\n",
        COMMAND_HEADER
    ));

    let mut cmd1 = Command::new(cargo_bin!("fairway-ledger"));
    cmd1.arg(feed1.path())
        .arg("--seed")
        .arg(seed.path())
        .arg("--db-path")
        .arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("p1,Ana,tt-1,2,120.00,7.00,127.00,107.00,20.00,false"));

    // 2. Second run: no seed, settle Ben against the same database
    let feed2 = temp_file(&format!(
        "{}\nsettle,,,p2,,,,,cash,,,,pro,\n",
        COMMAND_HEADER
    ));

    let mut cmd2 = Command::new(cargo_bin!("fairway-ledger"));
    cmd2.arg(feed2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    let stderr2 = String::from_utf8_lossy(&output2.stderr);
    assert!(!stderr2.contains("Error"), "stderr: {}", stderr2);

    // Ana's payment survived the restart and Ben's settlement was added on top
    assert!(stdout2.contains("p1,Ana,tt-1,2,120.00,7.00,127.00,107.00,20.00,false"));
    assert!(stdout2.contains("p2,Ben,tt-1,1,50.00,0.00,50.00,50.00,0.00,true"));

    // 3. Third run: the transaction counter continues instead of restarting
    let feed3 = temp_file(&format!(
        "{}\npay,club-1,,,,li-3,20,,cash,,,,pro,\n",
        COMMAND_HEADER
    ));
    let mut cmd3 = Command::new(cargo_bin!("fairway-ledger"));
    cmd3.arg(feed3.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--log-level")
        .arg("info");

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    let stderr3 = String::from_utf8_lossy(&output3.stderr);
    assert!(stderr3.contains("-00003"), "stderr: {}", stderr3);
}
