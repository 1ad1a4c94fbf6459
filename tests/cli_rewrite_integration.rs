use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

mod common;

use common::{
    copy_fixture_to_temp_java, fixture_path, path_arg, run_testmigrate, run_testmigrate_in,
    stdout_json,
};

#[test]
fn rewrite_without_write_reports_new_text_and_leaves_file() {
    let file = copy_fixture_to_temp_java("clock_expectations_test.java");
    let before = fs::read_to_string(&file).expect("fixture copy should be readable");

    let output = run_testmigrate(&["rewrite", path_arg(&file)]);
    assert!(
        output.status.success(),
        "rewrite failed: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    let response = stdout_json(&output);

    assert_eq!(response["written"], false);
    assert_eq!(response["summary"]["files_scanned"], 1);
    assert_eq!(response["summary"]["files_changed"], 1);
    assert_eq!(response["summary"]["constructs_rewritten"], 1);
    assert_eq!(response["summary"]["assertions_collapsed"], 2);

    let report = &response["files"][0];
    assert_eq!(report["changed"], true);
    assert_ne!(report["old_hash"], report["new_hash"]);
    let new_text = report["new_text"].as_str().expect("new_text should be present");
    assert!(new_text.contains("try (MockedStatic mockStaticClock = mockStatic(Clock.class)) {"));
    assert!(new_text.contains("mockStaticClock.when(() -> Clock.now()).thenReturn(42L);"));
    assert!(new_text.contains("import org.mockito.MockedStatic;"));
    assert!(new_text.contains("import static org.mockito.Mockito.*;"));
    assert!(!new_text.contains("mockit."), "jmockit imports should be dropped");
    assert!(new_text.contains(
        "            assertThat(value)\n                    .isPositive()\n                    .isEqualTo(42L);"
    ));

    let after = fs::read_to_string(&file).expect("fixture copy should be readable");
    assert_eq!(after, before);
}

#[test]
fn rewrite_with_write_commits_and_second_run_is_a_no_op() {
    let file = copy_fixture_to_temp_java("clock_mockup_setup_test.java");

    let first = run_testmigrate(&["rewrite", "--write", path_arg(&file)]);
    assert!(first.status.success());
    let response = stdout_json(&first);
    assert_eq!(response["written"], true);
    assert_eq!(response["files"][0]["changed"], true);
    assert!(response["files"][0].get("new_text").is_none());

    let written = fs::read_to_string(&file).expect("rewritten file should be readable");
    assert!(written.contains("private MockedConstruction mockConsClock;"));
    assert!(written.contains(
        "mockConsClock = mockConstructionWithAnswer(Clock.class, delegatesTo(mockObjClock));"
    ));
    assert!(written.contains("@After\n    public void tearDown() {"));
    assert!(written.contains("mockConsClock.closeOnDemand();"));
    assert!(written.contains("import org.junit.After;"));
    assert!(!written.contains("new MockUp<Clock>()"));

    let second = run_testmigrate(&["rewrite", "--write", path_arg(&file)]);
    assert!(second.status.success());
    let response = stdout_json(&second);
    assert_eq!(response["summary"]["files_changed"], 0);
    assert_eq!(
        fs::read_to_string(&file).expect("file should be readable"),
        written
    );
}

#[test]
fn assertion_runs_collapse_per_subject() {
    let file = copy_fixture_to_temp_java("assertion_runs_test.java");

    let output = run_testmigrate(&["rewrite", path_arg(&file)]);
    assert!(output.status.success());
    let response = stdout_json(&output);

    assert_eq!(response["summary"]["constructs_rewritten"], 0);
    assert_eq!(response["summary"]["assertions_collapsed"], 2);
    assert_eq!(
        response["files"][0]["new_text"],
        r#"package demo;

import java.util.List;

import static org.assertj.core.api.Assertions.assertThat;

public class NamesTest {
    void checksNames(List<String> names, String first) {
        assertThat(names)
                .isNotNull()
                .hasSize(2);
        assertThat(first).startsWith("a");
    }
}
"#
    );
}

#[test]
fn unsupported_construct_is_reported_as_skipped() {
    let file = copy_fixture_to_temp_java("interface_mockup_test.java");

    let output = run_testmigrate(&["rewrite", path_arg(&file)]);
    assert!(output.status.success());
    let response = stdout_json(&output);

    assert_eq!(response["summary"]["files_changed"], 0);
    assert_eq!(response["summary"]["constructs_skipped"], 1);
    let skipped = &response["files"][0]["skipped"][0];
    assert_eq!(skipped["construct"], "MockUp<Clock>");
    assert_eq!(skipped["line"], 13);
    assert_eq!(skipped["reason"]["kind"], "unresolved_target");
}

#[test]
fn pass_flag_limits_the_run_to_one_pass() {
    let file = copy_fixture_to_temp_java("clock_expectations_test.java");

    let output = run_testmigrate(&["rewrite", "--pass", "assertj", path_arg(&file)]);
    assert!(output.status.success());
    let response = stdout_json(&output);

    assert_eq!(response["summary"]["constructs_rewritten"], 0);
    assert_eq!(response["summary"]["assertions_collapsed"], 2);
    let new_text = response["files"][0]["new_text"]
        .as_str()
        .expect("new_text should be present");
    assert!(new_text.contains("new Expectations() {{"));
}

#[test]
fn check_exit_status_tracks_pending_changes() {
    let pending = copy_fixture_to_temp_java("assertion_runs_test.java");
    let output = run_testmigrate(&["check", path_arg(&pending)]);
    assert_eq!(output.status.code(), Some(1));
    let response = stdout_json(&output);
    assert_eq!(response["files_scanned"], 1);
    assert_eq!(response["would_change"][0], path_arg(&pending));

    let clean = copy_fixture_to_temp_java("already_migrated_test.java");
    let output = run_testmigrate(&["check", path_arg(&clean)]);
    assert_eq!(output.status.code(), Some(0));
    let response = stdout_json(&output);
    assert_eq!(response["would_change"], serde_json::json!([]));
}

#[test]
fn directory_argument_walks_java_files() {
    let directory = tempdir().expect("tempdir should be created");
    let nested = directory.path().join("src").join("test");
    fs::create_dir_all(&nested).expect("nested dirs should be created");
    fs::copy(
        fixture_path("assertion_runs_test.java"),
        nested.join("NamesTest.java"),
    )
    .expect("fixture copy should succeed");
    fs::copy(
        fixture_path("already_migrated_test.java"),
        directory.path().join("DoneTest.java"),
    )
    .expect("fixture copy should succeed");
    fs::write(directory.path().join("README.md"), "assertThat(x).isNull();")
        .expect("write should succeed");

    let output = run_testmigrate(&["rewrite", path_arg(directory.path())]);
    assert!(output.status.success());
    let response = stdout_json(&output);

    assert_eq!(response["summary"]["files_scanned"], 2);
    assert_eq!(response["summary"]["files_changed"], 1);
}

#[test]
fn implicit_config_file_is_picked_up_from_working_directory() {
    let directory = tempdir().expect("tempdir should be created");
    fs::copy(
        fixture_path("clock_expectations_test.java"),
        directory.path().join("ClockTest.java"),
    )
    .expect("fixture copy should succeed");
    fs::write(
        directory.path().join("testmigrate.toml"),
        "passes = [\"jmockit\"]\nindent = 4\n",
    )
    .expect("config write should succeed");

    let output = run_testmigrate_in(directory.path(), &["rewrite", "ClockTest.java"]);
    assert!(output.status.success());
    let response = stdout_json(&output);

    assert_eq!(response["summary"]["constructs_rewritten"], 1);
    assert_eq!(response["summary"]["assertions_collapsed"], 0);
}

#[test]
fn invalid_config_is_a_json_error() {
    let directory = tempdir().expect("tempdir should be created");
    let config = directory.path().join("bad.toml");
    fs::write(&config, "unknown_key = true\n").expect("config write should succeed");
    let file = copy_fixture_to_temp_java("assertion_runs_test.java");

    let output = run_testmigrate(&["rewrite", "--config", path_arg(&config), path_arg(&file)]);
    assert!(!output.status.success());
    let response = stdout_json(&output);
    assert_eq!(response["error"]["type"], "invalid_config");
    assert!(response["error"]["suggestion"].is_string());
}

#[test]
fn parse_failure_is_reported_per_file() {
    let broken = common::write_temp_java("class Broken {\n");
    let fine = copy_fixture_to_temp_java("assertion_runs_test.java");

    let output = run_testmigrate(&["rewrite", path_arg(&broken), path_arg(&fine)]);
    assert!(output.status.success());
    let response = stdout_json(&output);

    assert_eq!(response["summary"]["files_failed"], 1);
    assert_eq!(response["summary"]["files_changed"], 1);
    assert_eq!(response["files"][0]["error"]["type"], "parse_failure");
    assert_eq!(response["files"][0]["changed"], false);
}

#[test]
fn missing_path_is_rejected_by_argument_parsing() {
    let output = run_testmigrate(&["rewrite"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("PATH"));
}
