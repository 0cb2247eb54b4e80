use std::path::{Path, PathBuf};
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

fn read_records(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("record line should be JSON"))
        .collect()
}

fn reduce(name: &str, extra: &[&str]) -> (serde_json::Value, Vec<serde_json::Value>) {
    let dir = tmp_dir(name);
    std::fs::create_dir_all(&dir).unwrap();
    let records = dir.join("records.jsonl");

    let cfg = fixture_path("config.yaml");
    let input = fixture_path("events.jsonl");
    let mut args = vec![
        "reduce",
        "--config",
        cfg.to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
        "--records",
        records.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    let out = run(&args);
    assert!(
        out.status.success(),
        "reduce should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );

    let summary = serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON");
    let recs = read_records(&records);
    let _ = std::fs::remove_dir_all(&dir);
    (summary, recs)
}

fn close(v: &serde_json::Value, expected: f64) -> bool {
    (v.as_f64().unwrap() - expected).abs() < 1e-9
}

#[test]
fn reduce_emits_weighted_records() {
    let (summary, recs) = reduce("reduce_records", &[]);

    assert_eq!(summary["events"], 8);
    assert_eq!(summary["emitted"], 4);
    assert_eq!(summary["selected_photons"], 3);
    assert_eq!(summary["fake_photons"], 1);
    assert_eq!(summary["dropped_no_candidate"], 1);
    assert_eq!(summary["dropped_separation"], 1);
    assert_eq!(summary["malformed"], 2);
    assert!(close(&summary["sum_weight"], 10.8), "{}", summary["sum_weight"]);
    assert!(close(&summary["sum_weight_pu_up"], 11.04));
    assert!(close(&summary["sum_weight_pu_down"], 10.56));

    let indices: Vec<u64> = recs.iter().map(|r| r["event_index"].as_u64().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2, 7]);

    let first = &recs[0];
    assert_eq!(first["label"], "selected");
    assert!(close(&first["kfactor"], 1.2));
    assert!(close(&first["weight"], 2.4));
    assert!(close(&first["weight_pu_down"], 3.84));
    assert!(close(&first["dphi_photon_met"], -3.0));
}

#[test]
fn reduce_labels_fake_photon_and_clamps_pileup() {
    let (_, recs) = reduce("reduce_fake", &[]);
    let fake = recs.iter().find(|r| r["event_index"] == 2).unwrap();
    assert_eq!(fake["label"], "fake");
    // npu = 200 lies beyond the table and takes the last bin.
    assert!(close(&fake["pu_weight"], 1.0));
    assert!(close(&fake["weight_pu_up"], 4.8));
    assert!(close(&fake["weight_pu_down"], 2.4));
    assert!(close(&fake["dphi_photon_met"], 3.0));
}

#[test]
fn reduce_threads_match_sequential() {
    let (seq_summary, seq) = reduce("reduce_seq", &[]);
    let (par_summary, par) = reduce("reduce_par", &["--threads", "3", "--chunk-size", "2"]);
    assert_eq!(seq, par);
    assert_eq!(seq_summary["emitted"], par_summary["emitted"]);
    assert_eq!(seq_summary["malformed"], par_summary["malformed"]);
    assert!(close(&par_summary["sum_weight"], 10.8));
}

#[test]
fn reduce_requires_photon_id() {
    let dir = tmp_dir("reduce_no_id");
    std::fs::create_dir_all(&dir).unwrap();
    let records = dir.join("records.jsonl");
    let out = run(&[
        "reduce",
        "--config",
        fixture_path("cuts_only.yaml").to_str().unwrap(),
        "--input",
        fixture_path("events.jsonl").to_str().unwrap(),
        "--records",
        records.to_str().unwrap(),
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("photon_id"), "stderr={stderr}");
    let _ = std::fs::remove_dir_all(&dir);
}
