//! Process-level tests for the `quilt-cli` binary (spec §6, "CLI"),
//! following the same `assert_cmd::Command::cargo_bin` style as the
//! teacher's CLI integration tests.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

/// Writes a config file pointing the `file` engine at `root`, plus the
/// repo's own template directory so HTML responses have something to
/// render.
fn write_config(dir: &std::path::Path, root: &std::path::Path) -> std::path::PathBuf {
    let templates = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    let path = dir.join("quilt.conf");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "[quilt]").unwrap();
    writeln!(f, "engine = file").unwrap();
    writeln!(f, "base = http://example.org").unwrap();
    writeln!(f, "[file]").unwrap();
    writeln!(f, "root = {}", root.display()).unwrap();
    writeln!(f, "[html]").unwrap();
    writeln!(f, "templatedir = {}", templates.display()).unwrap();
    path
}

#[test]
fn renders_a_turtle_resource_with_cgi_style_headers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("thing.ttl"),
        "<http://example.org/thing> <http://www.w3.org/2000/01/rdf-schema#label> \"A Thing\" .\n",
    )
    .unwrap();
    let config = write_config(dir.path(), dir.path());

    let assert = Command::cargo_bin("quilt-cli")
        .unwrap()
        .arg("-c")
        .arg(&config)
        .arg("-t")
        .arg("text/turtle")
        .arg("/thing")
        .assert()
        .success();

    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Status: 200"));
    assert!(stdout.contains("Content-Type: text/turtle"));
    assert!(stdout.contains("\n\n"), "header block must end with a blank line");
    assert!(stdout.contains("A Thing"));
}

#[test]
fn missing_resource_still_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), dir.path());

    Command::cargo_bin("quilt-cli")
        .unwrap()
        .arg("-c")
        .arg(&config)
        .arg("-t")
        .arg("text/turtle")
        .arg("/nope")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: 404"));
}

#[test]
fn bulk_mode_reports_failure_for_an_engine_without_support() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), dir.path());

    Command::cargo_bin("quilt-cli")
        .unwrap()
        .arg("-c")
        .arg(&config)
        .arg("-b")
        .assert()
        .failure();
}

#[test]
fn help_lists_the_documented_flags() {
    Command::cargo_bin("quilt-cli")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--type"));
}
