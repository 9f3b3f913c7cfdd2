use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_rollsync").to_string()
}

fn run(args: &[&Path], flags: &[&str]) -> Output {
    Command::new(bin())
        .args(flags)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn cli_signature_delta_patch_roundtrip() {
    let dir = tempdir().unwrap();
    let basis = dir.path().join("basis.bin");
    let new = dir.path().join("new.bin");
    let sig = dir.path().join("basis.sig");
    let delta = dir.path().join("new.delta");
    let output = dir.path().join("output.bin");

    std::fs::write(&basis, b"abcde12345abcde12345").unwrap();
    std::fs::write(&new, b"abcdeXXXXXabcde12345!").unwrap();

    let out = run(&[&basis, &sig], &["--block-size", "5", "signature"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    // Four blocks of 24 bytes after the count.
    assert_eq!(std::fs::metadata(&sig).unwrap().len(), 4 + 4 * 24);

    let out = run(&[&sig, &new, &delta], &["--block-size", "5", "delta"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = run(&[&basis, &delta, &output], &["--block-size", "5", "patch"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(&new).unwrap()
    );
}

#[test]
fn cli_refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let basis = dir.path().join("basis.bin");
    let sig = dir.path().join("basis.sig");
    std::fs::write(&basis, b"some basis content").unwrap();
    std::fs::write(&sig, b"existing").unwrap();

    let out = run(&[&basis, &sig], &["signature"]);
    assert!(!out.status.success());
    assert_eq!(std::fs::read(&sig).unwrap(), b"existing");

    let out = run(&[&basis, &sig], &["--force", "signature"]);
    assert!(out.status.success());
    assert_ne!(std::fs::read(&sig).unwrap(), b"existing");
}

#[test]
fn cli_json_stats() {
    let dir = tempdir().unwrap();
    let basis = dir.path().join("basis.bin");
    let sig = dir.path().join("basis.sig");
    std::fs::write(&basis, vec![7u8; 4096]).unwrap();

    let out = run(&[&basis, &sig], &["--json", "-b", "1K", "signature"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(json["command"], "signature");
    assert_eq!(json["block_size"], 1024);
    assert_eq!(json["blocks"], 4);
    assert_eq!(json["basis_size"], 4096);
}

#[test]
fn cli_patch_checks_expected_digest() {
    let dir = tempdir().unwrap();
    let basis = dir.path().join("basis.bin");
    let new = dir.path().join("new.bin");
    let sig = dir.path().join("basis.sig");
    let delta = dir.path().join("new.delta");
    let output = dir.path().join("output.bin");
    std::fs::write(&basis, b"0123456789abcdef").unwrap();
    std::fs::write(&new, b"89abcdef01234567").unwrap();

    assert!(run(&[&basis, &sig], &["-b", "8", "signature"]).status.success());
    assert!(run(&[&sig, &new, &delta], &["-b", "8", "delta"]).status.success());

    let wrong = "00".repeat(32);
    let out = run(
        &[&basis, &delta, &output],
        &["-b", "8", "patch", "--expect-sha256", &wrong],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("mismatch"));
}

#[test]
fn cli_patch_rejects_malformed_digest() {
    let dir = tempdir().unwrap();
    let basis = dir.path().join("basis.bin");
    let sig = dir.path().join("basis.sig");
    let delta = dir.path().join("basis.delta");
    let output = dir.path().join("output.bin");
    std::fs::write(&basis, b"0123456789abcdef").unwrap();

    assert!(run(&[&basis, &sig], &["-b", "8", "signature"]).status.success());
    assert!(run(&[&sig, &basis, &delta], &["-b", "8", "delta"]).status.success());

    let out = run(
        &[&basis, &delta, &output],
        &["-b", "8", "patch", "--expect-sha256", "not-a-digest"],
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid digest"), "{stderr}");
    assert!(!stderr.contains("mismatch"), "{stderr}");
}

#[test]
fn cli_patch_rejects_corrupt_delta() {
    let dir = tempdir().unwrap();
    let basis = dir.path().join("basis.bin");
    let delta = dir.path().join("bad.delta");
    let output = dir.path().join("output.bin");
    std::fs::write(&basis, b"basis").unwrap();
    std::fs::write(&delta, [0x07u8, 0, 0]).unwrap();

    let out = run(&[&basis, &delta, &output], &["patch"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown delta instruction tag"));
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
}
