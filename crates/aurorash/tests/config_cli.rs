use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn aurorash(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aurorash"))
        .args(args)
        .env("AURORASH_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run aurorash")
}

#[test]
fn config_print_merges_file_and_flags() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(
        temp.path().join("config.toml"),
        "[effect]\namplitude = 2.5\nspeed = 1.0\n\n[render]\nantialias = 4\n",
    )
    .expect("write config");

    let output = aurorash(temp.path(), &["--speed", "0.5", "config", "print"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("amplitude = 2.5"), "stdout: {stdout}");
    assert!(stdout.contains("speed = 0.5"), "stdout: {stdout}");
    assert!(stdout.contains("antialias = 4"), "stdout: {stdout}");
    assert!(stdout.contains("[watch]"), "stdout: {stdout}");
}

#[test]
fn config_print_without_a_file_shows_defaults() {
    let temp = TempDir::new().expect("tempdir");

    let output = aurorash(temp.path(), &["config", "print"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("version = 1"), "stdout: {stdout}");
    assert!(stdout.contains("#3d4c85ff"), "stdout: {stdout}");
    assert!(stdout.contains("fade_curve = \"ease-in-out\""), "stdout: {stdout}");
}

#[test]
fn invalid_config_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(
        temp.path().join("config.toml"),
        "[effect]\ncolor_stops = [\"#zzzzzz\"]\n",
    )
    .expect("write config");

    let output = aurorash(temp.path(), &["config", "print"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
}

#[test]
fn config_where_reports_the_override_directory() {
    let temp = TempDir::new().expect("tempdir");

    let output = aurorash(temp.path(), &["config", "where"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected = temp.path().join("config.toml");
    assert!(
        stdout.contains(&expected.display().to_string()),
        "stdout: {stdout}"
    );
    assert!(stdout.contains("missing, using defaults"), "stdout: {stdout}");
}
