//! End-to-end CLI test: run the `netsim` binary against a small descriptor
//! and check it reports clean completion.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "netsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

const TWO_HOST_RENO: &str = r#"{
    "hosts": [ { "id": "h1" }, { "id": "h2" } ],
    "routers": [],
    "links": [
        { "id": "l1", "source_id": "h1", "target_id": "h2", "rate": 10.0, "delay": 10.0, "buffsize": 64.0 }
    ],
    "flows": [
        { "name": "f1", "source_id": "h1", "dest_id": "h2", "bytes": 10000, "timestamp": 100.0, "flowType": "TCPRenoFlow" }
    ]
}"#;

#[test]
fn reno_flow_over_a_single_link_completes_cleanly() {
    let dir = unique_temp_dir("reno-single-link");
    let descriptor = dir.join("network.json");
    fs::write(&descriptor, TWO_HOST_RENO).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_netsim"))
        .arg(&descriptor)
        .output()
        .expect("run netsim");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Completed"), "stdout: {stdout}");
}

#[test]
fn unknown_flow_type_is_a_clean_config_error() {
    let dir = unique_temp_dir("bad-flow-type");
    let descriptor = dir.join("network.json");
    fs::write(
        &descriptor,
        r#"{
            "hosts": [ { "id": "h1" }, { "id": "h2" } ],
            "routers": [],
            "links": [ { "id": "l1", "source_id": "h1", "target_id": "h2", "rate": 10.0, "delay": 10.0, "buffsize": 64.0 } ],
            "flows": [ { "name": "f1", "source_id": "h1", "dest_id": "h2", "bytes": 1000, "timestamp": 0.0, "flowType": "Nonsense" } ]
        }"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_netsim"))
        .arg(&descriptor)
        .output()
        .expect("run netsim");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown flow-type"), "stderr: {stderr}");
}

#[test]
fn missing_descriptor_file_is_a_clean_io_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_netsim"))
        .arg("/nonexistent/path/does-not-exist.json")
        .output()
        .expect("run netsim");

    assert!(!output.status.success());
}
