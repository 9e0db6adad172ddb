//! Tests for the cqpconc binary

#![cfg(unix)]

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::path::PathBuf;

use common::{Fixture, bbs_corpus, make_executable};

fn write_config(fixture: &Fixture) -> PathBuf {
    let script = fixture.script_path();
    make_executable(&script);
    let path = fixture.temp.path().join("cqpconc.yml");
    std::fs::write(
        &path,
        format!(
            "corpus: bbs\nregistry_dir: {}\ncqp_bin: {}\ndefaults:\n  window_size: 2\n",
            fixture.registry.display(),
            script.display()
        ),
    )
    .unwrap();
    path
}

fn cqpconc(config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("cqpconc").unwrap();
    cmd.env("NO_COLOR", "1").arg("--config").arg(config);
    cmd
}

#[test]
#[serial]
fn test_info_lists_attributes() {
    let fixture = bbs_corpus();
    let config = write_config(&fixture);

    cqpconc(&config)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Corpus: bbs"))
        .stdout(predicate::str::contains("Size: 12 tokens"))
        .stdout(predicate::str::contains("board: text_board"));
}

#[test]
#[serial]
fn test_query_json() {
    let fixture = bbs_corpus();
    let config = write_config(&fixture);

    let output = cqpconc(&config)
        .args(["query", "cat", "-n", "2", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let page: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["num_per_page"], 2);
    let rows = page["conclist"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["board"], "sports");
    assert_eq!(rows[1]["conc"][0], ". a");
}

#[test]
#[serial]
fn test_query_text_with_board_filter() {
    let fixture = bbs_corpus();
    let config = write_config(&fixture);

    cqpconc(&config)
        .args(["query", "cat", "--board", "news"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 hits"))
        .stdout(predicate::str::contains("(1 shown)"))
        .stdout(predicate::str::contains("200 news"));
}

#[test]
#[serial]
fn test_query_without_matches() {
    let fixture = bbs_corpus();
    let config = write_config(&fixture);

    cqpconc(&config)
        .args(["query", "dog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matches for 'dog'"));
}

#[test]
#[serial]
fn test_query_rejects_page_zero() {
    let fixture = bbs_corpus();
    let config = write_config(&fixture);

    cqpconc(&config)
        .args(["query", "cat", "--page", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page_num"));
}

#[test]
#[serial]
fn test_missing_cqp_binary() {
    let fixture = bbs_corpus();
    let config = write_config(&fixture);

    cqpconc(&config)
        .args(["--cqp-bin", "/nonexistent/cqp", "query", "cat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect to corpus bbs"));
}

#[test]
#[serial]
fn test_missing_corpus_setting() {
    let fixture = bbs_corpus();
    let config = fixture.temp.path().join("empty.yml");
    std::fs::write(&config, "log_level: error\n").unwrap();

    cqpconc(&config)
        .arg("info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No corpus configured"));
}
