use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

const SALITY_PEER_EXCHANGE: &str = "390c17005d4d18a0c6950925e043f28e84d2145f7704e06e6f9a24";
const ZEROACCESS_GET_L: &str = "cc3a060828948dabc9c0d199a548bf8c";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("botshark"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn sample_capture() -> std::path::PathBuf {
    repo_root()
        .join("tests")
        .join("fixtures")
        .join("c2_sample")
        .join("input.pcapng")
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn help_supports_analyse_and_analyze() {
    cmd().args(["pcap", "analyse", "--help"]).assert().success();
    cmd().args(["pcap", "analyze", "--help"]).assert().success();
}

#[test]
fn long_version_mentions_build_metadata() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("botshark"));
    cmd()
        .arg("-V")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn decode_sality_prints_fields() {
    let assert = cmd()
        .args(["decode", "sality", SALITY_PEER_EXCHANGE])
        .assert()
        .success();
    let json = stdout_json(&assert);
    assert_eq!(json["protocol"], "sality");
    assert_eq!(json["command"], "Peer Exchange");
    assert_eq!(json["fields"]["header"]["urlpackid"], 390);
    assert_eq!(json["fields"]["payload"]["peer_ip"], "200.84.139.52");
    assert_eq!(json["peers"][0], "200.84.139.52:8361");
}

#[test]
fn decode_zeroaccess_summary_line() {
    cmd()
        .args(["decode", "zeroaccess", ZEROACCESS_GET_L, "--summary"])
        .assert()
        .success()
        .stdout("Checksum: 0x6e724afe, Command: getL, Flag: 0x0, Payload: 0x36c91cbf\n");
}

#[test]
fn decode_joins_split_hex() {
    let assert = cmd()
        .args(["decode", "zero-access", "cc3a0608 28948dab", "c9c0d199a548bf8c"])
        .assert()
        .success();
    assert_eq!(stdout_json(&assert)["fields"]["checksum"], 1852984062u64);
}

#[test]
fn decode_rejection_shows_error_and_hint() {
    let mutated = SALITY_PEER_EXCHANGE.replacen("84d2", "84d3", 1);
    cmd()
        .args(["decode", "sality", &mutated])
        .assert()
        .code(2)
        .stderr(contains("error: sality message rejected: checksum mismatch").and(contains("hint:")));
}

#[test]
fn decode_rejects_bad_hex_and_unknown_protocol() {
    cmd()
        .args(["decode", "sality", "zz"])
        .assert()
        .code(2)
        .stderr(contains("invalid hex input"));
    cmd()
        .args(["decode", "conficker", "00"])
        .assert()
        .failure()
        .stderr(contains("unknown protocol"));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.pcapng");
    let report = temp.path().join("report.json");

    cmd()
        .args(["pcap", "analyze"])
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn stdout_outputs_report_json() {
    let assert = cmd()
        .args(["pcap", "analyse"])
        .arg(sample_capture())
        .arg("--stdout")
        .assert()
        .success();
    let json = stdout_json(&assert);
    assert_eq!(json["tool"]["name"], "botshark");
    assert_eq!(json["capture_summary"]["decoded_messages"], 5);
    assert_eq!(json["messages"].as_array().unwrap().len(), 5);
    assert_eq!(json["peers"].as_array().unwrap().len(), 17);
}

#[test]
fn protocol_filter_is_applied() {
    let assert = cmd()
        .args(["pcap", "analyse"])
        .arg(sample_capture())
        .args(["--stdout", "--protocol", "sality"])
        .assert()
        .success();
    let json = stdout_json(&assert);
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m["protocol"] == "sality"));
}

#[test]
fn report_file_is_written() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("out").join("report.json");

    cmd()
        .args(["pcap", "analyse"])
        .arg(sample_capture())
        .arg("-o")
        .arg(&report)
        .arg("--pretty")
        .assert()
        .success()
        .stderr(contains("OK: 5 messages"));
    let written = std::fs::read_to_string(&report).expect("report written");
    assert!(written.contains("\n  \"report_version\": 1"));
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .args(["pcap", "analyze"])
        .arg(sample_capture())
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    cmd()
        .args(["pcap", "analyze"])
        .arg(sample_capture())
        .args(["--stdout", "--pretty", "--compact"])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .args(["pcap", "analyze"])
        .arg(sample_capture())
        .arg("-o")
        .arg(&report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());
    assert!(report.exists());
}

#[test]
fn refuses_to_overwrite_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.pcapng");
    std::fs::copy(sample_capture(), &input).expect("copy fixture");

    cmd()
        .args(["pcap", "analyse"])
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .code(2)
        .stderr(contains("report path must differ from input"));
}

#[test]
fn glob_must_match_exactly_one_file() {
    let temp = TempDir::new().expect("tempdir");
    for name in ["a.pcapng", "b.pcapng"] {
        std::fs::copy(sample_capture(), temp.path().join(name)).expect("copy fixture");
    }
    let pattern = temp.path().join("*.pcapng");

    cmd()
        .args(["pcap", "analyse"])
        .arg(&pattern)
        .arg("--stdout")
        .assert()
        .code(2)
        .stderr(contains("multiple files match pattern").and(contains("hint:")));

    let single = temp.path().join("a.pcap*");
    cmd()
        .args(["pcap", "analyse"])
        .arg(&single)
        .arg("--stdout")
        .assert()
        .success();
}

#[test]
fn verbose_logging_goes_to_stderr() {
    let assert = cmd()
        .args(["-vv", "pcap", "analyse"])
        .arg(sample_capture())
        .arg("--stdout")
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(contains("payload rejected"));
    let _ = stdout_json(&assert);
}
