#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::Builder;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn copy_fixture_to_temp_java(name: &str) -> PathBuf {
    let source = fixture_path(name);
    let content = fs::read_to_string(&source).expect("fixture should be readable");
    write_temp_java(&content)
}

pub fn write_temp_java(content: &str) -> PathBuf {
    let mut temp_file = Builder::new()
        .suffix(".java")
        .tempfile()
        .expect("temp java file should be created");
    temp_file
        .write_all(content.as_bytes())
        .expect("temp fixture write should succeed");
    temp_file.keep().expect("temp file should persist").1
}

pub fn run_testmigrate(args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_testmigrate"));
    command.env_remove("TESTMIGRATE_LOG");
    command.args(args);
    command.output().expect("failed to run testmigrate binary")
}

pub fn run_testmigrate_in(directory: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_testmigrate"));
    command.env_remove("TESTMIGRATE_LOG");
    command.current_dir(directory);
    command.args(args);
    command.output().expect("failed to run testmigrate binary")
}

pub fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|error| {
        panic!(
            "stdout should be valid JSON ({error}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

pub fn path_arg(path: &Path) -> &str {
    path.to_str().expect("path should be utf-8")
}
