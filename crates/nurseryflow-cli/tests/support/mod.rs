#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

pub fn new_command_with_temp_home() -> (Command, tempfile::TempDir) {
    let temp_home = tempfile::tempdir().expect("temp home");
    let command = command_for_home(temp_home.path());
    (command, temp_home)
}

pub fn command_for_home(home: &Path) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("nurseryflow");
    let mut command = Command::new(binary);
    command.env("HOME", home);
    command.env("XDG_CONFIG_HOME", home.join(".config"));
    command.env_remove("RUST_LOG");
    command
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join(".config").join("nurseryflow").join("config.toml")
}

pub fn default_ledger_path(home: &Path) -> PathBuf {
    home.join(".local")
        .join("share")
        .join("nurseryflow")
        .join("ledger.toml")
}

pub fn write_valid_config(home: &Path) {
    write_config(
        home,
        r#"
version = 1

[operator]
name = "Sam"
"#,
    );
}

pub fn write_config(home: &Path, raw: &str) {
    let path = config_path(home);
    fs::create_dir_all(path.parent().expect("config dir")).expect("create config dir");
    fs::write(path, raw).expect("write config");
}

pub fn assert_timestamp_log_names(entries: &[std::fs::DirEntry]) {
    assert!(!entries.is_empty(), "expected at least one diagnostics log");

    for entry in entries {
        let name = entry
            .file_name()
            .into_string()
            .expect("diagnostics filename utf8");
        assert!(
            name.ends_with(".log"),
            "diagnostics file should end with .log: {name}"
        );
        let stem = name
            .strip_suffix(".log")
            .expect("diagnostics filename .log suffix");
        assert!(
            !stem.is_empty() && stem.chars().all(|character| character.is_ascii_digit()),
            "diagnostics filename must be <timestamp>.log, got: {name}"
        );
    }
}
