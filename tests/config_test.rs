//! Integration tests for configuration loading and validation.

use modelmate::{MatchConfig, Side};
use std::io::Write;
use std::path::PathBuf;

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("modelmate.toml");
    let mut file = std::fs::File::create(&path).expect("create config file");
    file.write_all(content.as_bytes()).expect("write config");
    (dir, path)
}

#[test]
fn defaults_match_the_documented_values() {
    let config = MatchConfig::default();
    assert_eq!(config.white_model(), "deepseek-r1:1.5b");
    assert_eq!(config.black_model(), "deepseek-r1:1.5b");
    assert_eq!(*config.max_attempts(), 5);
    assert_eq!(config.invoke_with(), &["ollama".to_string(), "run".to_string()]);
    assert_eq!(*config.move_timeout_secs(), 30);
    assert_eq!(*config.retry_delay_ms(), 1000);
    assert_eq!(*config.move_delay_ms(), 1000);
    assert_eq!(*config.human_side(), Side::Black);
    assert_eq!(*config.games(), 1);
    assert_eq!(config.log_path(), &PathBuf::from("modelmate.log"));
    assert!(config.validate().is_ok());
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let (_dir, path) = write_config(
        r#"
white_model = "llama3.2:3b"
games = 4
"#,
    );

    let config = MatchConfig::from_file(&path).expect("load config");
    assert_eq!(config.white_model(), "llama3.2:3b");
    assert_eq!(config.black_model(), "deepseek-r1:1.5b");
    assert_eq!(*config.games(), 4);
    assert_eq!(*config.max_attempts(), 5);
}

#[test]
fn full_file_overrides_everything() {
    let (_dir, path) = write_config(
        r#"
white_model = "qwen2.5:7b"
black_model = "llama3.2:3b"
max_attempts = 3
invoke_with = ["docker", "exec", "-i", "ollama", "ollama", "run"]
move_timeout_secs = 60
retry_delay_ms = 250
move_delay_ms = 0
human_side = "white"
games = 10
log_path = "/tmp/match.log"
"#,
    );

    let config = MatchConfig::from_file(&path).expect("load config");
    assert_eq!(config.white_model(), "qwen2.5:7b");
    assert_eq!(config.black_model(), "llama3.2:3b");
    assert_eq!(*config.max_attempts(), 3);
    assert_eq!(config.invoke_with().len(), 6);
    assert_eq!(*config.move_timeout_secs(), 60);
    assert_eq!(*config.retry_delay_ms(), 250);
    assert_eq!(*config.move_delay_ms(), 0);
    assert_eq!(*config.human_side(), Side::White);
    assert_eq!(*config.games(), 10);
    assert_eq!(config.log_path(), &PathBuf::from("/tmp/match.log"));
}

#[test]
fn zero_max_attempts_is_rejected() {
    let (_dir, path) = write_config("max_attempts = 0\n");
    let err = MatchConfig::from_file(&path).expect_err("should fail validation");
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn zero_games_is_rejected() {
    let (_dir, path) = write_config("games = 0\n");
    let err = MatchConfig::from_file(&path).expect_err("should fail validation");
    assert!(err.to_string().contains("games"));
}

#[test]
fn empty_invoke_command_is_rejected() {
    let (_dir, path) = write_config("invoke_with = []\n");
    let err = MatchConfig::from_file(&path).expect_err("should fail validation");
    assert!(err.to_string().contains("invoke_with"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("does-not-exist.toml");
    let err = MatchConfig::from_file(&path).expect_err("should fail to read");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn malformed_toml_is_an_error() {
    let (_dir, path) = write_config("white_model = [not toml\n");
    let err = MatchConfig::from_file(&path).expect_err("should fail to parse");
    assert!(err.to_string().contains("Failed to parse config"));
}
