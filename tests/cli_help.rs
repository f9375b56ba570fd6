use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("bag2csv").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--polygon"));
}

#[test]
fn missing_bag_argument_prints_usage() {
    let mut cmd = Command::cargo_bin("bag2csv").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn malformed_polygon_fails_before_reading() {
    let mut cmd = Command::cargo_bin("bag2csv").unwrap();
    cmd.args(["does-not-exist.bag", "--polygon", "0,0;1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 3 vertices"));
}

#[test]
fn unreadable_bag_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("bag2csv").unwrap();
    cmd.arg(dir.path().join("missing.bag"))
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open bag"));
}

#[test]
fn region_file_is_validated() {
    let dir = tempfile::tempdir().unwrap();
    let region = dir.path().join("region.json");
    let json = r#"{"type": "bounding_box", "xmin": 5, "xmax": 1, "ymin": 0, "ymax": 1}"#;
    std::fs::write(&region, json).unwrap();

    let mut cmd = Command::cargo_bin("bag2csv").unwrap();
    cmd.arg("run.bag")
        .arg("--region")
        .arg(&region)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bounding box is empty"));
}

fn header_field(name: &str, value: &[u8]) -> Vec<u8> {
    let mut out = ((name.len() + 1 + value.len()) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(name.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value);
    out
}

#[test]
fn unindexed_bag_fails_without_writing_outputs() {
    // What a recorder leaves behind before the bag is closed.
    let header = [
        header_field("op", &[0x03]),
        header_field("index_pos", &0u64.to_le_bytes()),
        header_field("conn_count", &0u32.to_le_bytes()),
        header_field("chunk_count", &0u32.to_le_bytes()),
    ]
    .concat();
    let mut bytes = b"#ROSBAG V2.0\n".to_vec();
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&0u32.to_le_bytes());

    let dir = tempfile::tempdir().unwrap();
    let bag = dir.path().join("open.bag");
    std::fs::write(&bag, bytes).unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let mut cmd = Command::cargo_bin("bag2csv").unwrap();
    cmd.arg(&bag)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not indexed"));
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}
