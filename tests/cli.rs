use assert_cmd::Command;
use predicates::prelude::*;

fn mmsearch() -> Command {
    let mut cmd = Command::cargo_bin("mmsearch").unwrap();
    cmd.env_remove("MMSEARCH_CONFIG").env_remove("MMSEARCH_URL");
    cmd
}

#[test]
fn test_help() {
    mmsearch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multimodal search engine"));
}

#[test]
fn test_version() {
    mmsearch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mmsearch"));
}

#[test]
fn disallowed_image_extension_is_rejected_locally() {
    mmsearch()
        .args(["--url", "http://127.0.0.1:9", "search", "image", "animation.gif"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a .png, .jpg or .jpeg image"));
}

#[test]
fn blank_query_is_rejected() {
    mmsearch()
        .args(["--url", "http://127.0.0.1:9", "search", "text", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("query must not be empty"));
}

#[test]
fn unreachable_service_reports_failure() {
    mmsearch()
        .args(["--url", "http://127.0.0.1:9", "search", "text", "red sunset"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Search failed"));
}

#[test]
fn invalid_service_url_is_rejected() {
    mmsearch()
        .args(["--url", "localhost:8000", "search", "text", "red sunset"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("service_url must start with http"));
}

#[test]
fn index_metadata_must_be_json_object() {
    mmsearch()
        .args(["--url", "http://127.0.0.1:9", "index", "text", "hello", "--metadata", "not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("metadata must be a JSON object"));
}
