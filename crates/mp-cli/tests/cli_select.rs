use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_monophoton"))
}

fn repo_root() -> PathBuf {
    // crates/mp-cli -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures/monophoton").join(name)
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("monophoton_cli_{}_{}_{}", std::process::id(), nanos, name));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn select_json(extra: &[&str]) -> serde_json::Value {
    let cfg = fixture_path("config.yaml");
    let input = fixture_path("events.jsonl");
    let mut args = vec![
        "select",
        "--config",
        cfg.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    let out = run(&args);
    assert!(
        out.status.success(),
        "select should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON")
}

#[test]
fn select_reports_cumulative_cutflow() {
    let v = select_json(&[]);

    let counts: Vec<u64> =
        v["counts"].as_array().unwrap().iter().map(|c| c.as_u64().unwrap()).collect();
    assert_eq!(counts, vec![6, 5, 4, 3, 3]);
    assert_eq!(v["selected"], 3);
    assert_eq!(v["malformed"], 2);

    assert_eq!(v["labels"][0], "All Events");
    assert_eq!(v["display_labels"][1], "N Photons >= 1");
    assert_eq!(v["display_labels"][3], "Photon Eta <= 2.4");

    assert_eq!(v["photon_et"]["name"], "hPhotonEt");
    assert_eq!(v["photon_et"]["entries"], 3);
    assert_eq!(v["met_et"]["bin_content"].as_array().unwrap().len(), 400);
}

#[test]
fn select_threads_match_sequential() {
    let seq = select_json(&[]);
    let par = select_json(&["--threads", "2", "--chunk-size", "2"]);
    assert_eq!(seq, par);
}

#[test]
fn select_writes_output_file() {
    let dir = tmp_dir("select_output");
    std::fs::create_dir_all(&dir).unwrap();
    let out_path = dir.join("cutflow.json");

    let cfg = fixture_path("cuts_only.yaml");
    let input = fixture_path("events.jsonl");
    let out = run(&[
        "select",
        "--config",
        cfg.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
        "--output",
        out_path.to_str().unwrap(),
    ]);
    assert!(
        out.status.success(),
        "select should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(out.stdout.is_empty(), "summary should go to the output file");

    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&out_path).unwrap()).unwrap();
    assert_eq!(v["selected"], 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn select_logs_selected_count_at_info() {
    let cfg = fixture_path("cuts_only.yaml");
    let input = fixture_path("events.jsonl");
    let out = run(&[
        "--log-level",
        "info",
        "select",
        "--config",
        cfg.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let logs = format!("{stdout}{stderr}");
    assert!(logs.contains("selected events: 3"), "logs={logs}");
}

#[test]
fn select_rejects_invalid_config() {
    let cfg = fixture_path("invalid.yaml");
    let input = fixture_path("events.jsonl");
    let out =
        run(&["select", "--config", cfg.to_str().unwrap(), "--input", input.to_str().unwrap()]);
    assert!(!out.status.success(), "invalid config must fail");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("max_photon_eta"), "stderr={stderr}");
}

#[test]
fn validate_config_reports_reduction_readiness() {
    let out = run(&["validate-config", "--config", fixture_path("config.yaml").to_str().unwrap()]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["valid"], true);
    assert_eq!(v["reduction_ready"], true);
    assert_eq!(v["lumi_scale"], 2.0);

    let cuts_only = fixture_path("cuts_only.yaml");
    let out = run(&["validate-config", "--config", cuts_only.to_str().unwrap()]);
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["reduction_ready"], false);
    assert!(v["reduction_error"].as_str().unwrap().contains("photon_id"));
}
