mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_csv_handling() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(common::CSV_HEADER).unwrap();

    // Valid donation
    wtr.write_record([
        "1", "a@example.com", "1", "acme", "roof", "1.0", "4242424242424242", "123", "12", "2030",
    ])
    .unwrap();
    // Negative amount
    wtr.write_record([
        "2", "b@example.com", "1", "acme", "roof", "-4", "4242424242424242", "123", "12", "2030",
    ])
    .unwrap();
    // Non-numeric user id
    wtr.write_record([
        "abc", "c@example.com", "1", "acme", "roof", "1.0", "4242424242424242", "123", "12",
        "2030",
    ])
    .unwrap();
    // Valid donation again
    wtr.write_record([
        "4", "d@example.com", "1", "acme", "roof", "2.0", "4242424242424242", "123", "12", "2030",
    ])
    .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("donations"));
    cmd.arg("process").arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading donation"))
        .stdout(predicate::str::contains("1,1,1,donated"))
        .stdout(predicate::str::contains("4,1,2,donated"))
        .stdout(predicate::str::contains("2,1,").not());
}

#[test]
fn test_invalid_card_details_do_not_abort_batch() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(common::CSV_HEADER).unwrap();

    // Expiry month out of range
    wtr.write_record([
        "1", "a@example.com", "1", "acme", "roof", "5", "4242424242424242", "123", "13", "2030",
    ])
    .unwrap();
    wtr.write_record([
        "2", "b@example.com", "1", "acme", "roof", "5", "4242424242424242", "123", "12", "2030",
    ])
    .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("donations"));
    cmd.arg("process").arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "1,1,5,failed,false,false,,,Card tokenization failed: Validation error: Expiration month is invalid",
        ))
        .stdout(predicate::str::contains("2,1,5,donated,true,true"));
}
