use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "rainfill-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_profiles_writes_output() {
    let exe = env!("CARGO_BIN_EXE_rainfill");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-profiles", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available profiles"));
    assert!(content.contains("Saint"));
    assert!(content.contains("starts in SU"));
}

#[test]
fn cli_json_report_covers_every_seed() {
    let exe = env!("CARGO_BIN_EXE_rainfill");
    let output_path = temp_path("json");
    let status = Command::new(exe)
        .args([
            "--profiles",
            "White,Saint",
            "--seeds",
            "1..4",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("parse report");
    assert_eq!(report["total"], 6);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["runs"][0]["profile"], "White");
    assert_eq!(report["runs"][0]["seed"], 1);
    assert_eq!(report["runs"][5]["profile"], "Saint");
}

#[test]
fn cli_writes_spoilers() {
    let exe = env!("CARGO_BIN_EXE_rainfill");
    let spoiler_dir = temp_path("spoilers");
    let output_path = temp_path("spoiler-report");
    let status = Command::new(exe)
        .args(["--profiles", "Gourmand", "--seeds", "7", "--spoiler-dir"])
        .arg(&spoiler_dir)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let spoiler = std::fs::read_to_string(spoiler_dir.join("Gourmand-7.json")).expect("spoiler");
    let generation: serde_json::Value = serde_json::from_str(&spoiler).expect("parse spoiler");
    assert_eq!(generation["seed"], 7);
    assert_eq!(generation["profile"], "Gourmand");
    assert!(generation["assignments"].as_object().is_some_and(|a| !a.is_empty()));
    let _ = std::fs::remove_dir_all(spoiler_dir);
}

#[test]
fn cli_exits_nonzero_when_a_run_fails() {
    let exe = env!("CARGO_BIN_EXE_rainfill");
    let catalog_path = temp_path("disconnected.json");
    std::fs::write(
        &catalog_path,
        r#"{
            "profiles": ["White"],
            "regions": [{ "id": "A" }, { "id": "B" }],
            "locations": [{ "id": "LocB", "kind": "misc", "region": "B" }],
            "default_starts": { "White": "A" },
            "filler_items": ["Rock"]
        }"#,
    )
    .expect("write catalog");
    let config_path = temp_path("config.json");
    std::fs::write(&config_path, r#"{ "starting_karma": 1, "max_karma": 1 }"#)
        .expect("write config");
    let output_path = temp_path("failed-report");

    let status = Command::new(exe)
        .arg("--catalog")
        .arg(&catalog_path)
        .arg("--config")
        .arg(&config_path)
        .args(["--report", "markdown", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert_eq!(status.code(), Some(1));
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("- **Failed**: 1"));
    assert!(content.contains("placing progression"));
}

#[test]
fn cli_rejects_unknown_profile() {
    let exe = env!("CARGO_BIN_EXE_rainfill");
    let output = Command::new(exe)
        .args(["--profiles", "Hunter"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown profile: Hunter"));
}
