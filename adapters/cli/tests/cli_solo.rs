use std::process::Command;

#[test]
fn solo_run_prints_banner_and_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_tower-duel"))
        .args(["solo", "--frames", "1200", "--seed", "7"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run tower-duel");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Welcome to Tower Duel."));
    assert!(stdout.contains("solo: wave "));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("INFO"), "info logs leaked past RUST_LOG=warn: {stderr}");
}

#[test]
fn info_logs_are_shown_without_rust_log() {
    let output = Command::new(env!("CARGO_BIN_EXE_tower-duel"))
        .args(["solo", "--frames", "60", "--seed", "7"])
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run tower-duel");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("INFO"));
    assert!(stderr.contains("wave started"));
}

#[test]
fn missing_config_file_is_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_tower-duel"))
        .args(["--config", "/nonexistent/tower-duel.toml", "solo"])
        .output()
        .expect("failed to run tower-duel");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read config file"));
}
