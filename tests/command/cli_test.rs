//! End-to-end tests of the `mach` binary.

use assert_cmd::prelude::*;
use mach::cli;
use serial_test::serial;

use super::*;

const COMMANDS: &str = r#"
[[command]]
name = "build"
description = "Build the tree"
category = "build"
run = "echo building {target}"

[[command.argument]]
name = "target"
kind = "string"
required = true

[[command]]
name = "fail"
run = "echo broken >&2; exit 9"
"#;

fn tree() -> Tree {
    let tree = Tree::new();
    tree.write("mach.toml", "modules = [\"commands.toml\"]\n");
    tree.write("commands.toml", COMMANDS);
    tree
}

#[test]
fn test_runs_declared_command() {
    let tree = tree();
    let output = mach(tree.path())
        .args(["build", "--target", "all"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "building all\n");
    assert!(output.stderr.is_empty());
}

#[test]
fn test_login_shell_does_not_affect_templates() {
    let tree = tree();
    let output = mach(tree.path())
        .env("SHELL", "/nonexistent/bin/fish")
        .args(["build", "--target", "line one\nline two"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "building line one\nline two\n"
    );
}

#[test]
fn test_dispatch_errors_exit_two() {
    let tree = tree();
    let output = mach(tree.path()).arg("deploy").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "error: deploy: unknown command\n");

    let output = mach(tree.path()).arg("build").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr),
        "error: build: missing required argument: --target\n"
    );
}

#[test]
fn test_structured_exit_is_forwarded() {
    let tree = tree();
    mach(tree.path()).arg("fail").assert().code(9);
}

#[test]
fn test_root_found_from_subdirectory() {
    let tree = tree();
    let nested = tree.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();

    let output = mach(&nested).args(["build", "x"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "building x\n");
}

#[test]
fn test_root_flag_and_env() {
    let tree = tree();
    let elsewhere = Tree::new();

    mach(elsewhere.path())
        .arg("--root")
        .arg(tree.path())
        .args(["build", "x"])
        .assert()
        .success();

    mach(elsewhere.path())
        .env("MACH_ROOT", tree.path())
        .args(["build", "x"])
        .assert()
        .success();
}

#[test]
fn test_general_help() {
    let tree = tree();
    for args in [&[][..], &["help"][..]] {
        let output = mach(tree.path()).args(args).output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("usage: mach"), "{stdout}");
        assert!(stdout.contains("build commands:"), "{stdout}");
        assert!(stdout.contains("misc commands:"), "{stdout}");
        assert!(stdout.contains("other commands:"), "{stdout}");
    }
}

#[test]
fn test_command_help() {
    let tree = tree();
    let expected = "usage: mach build --target <string> [ARGS...]";

    for args in [&["help", "build"][..], &["build", "--help"][..]] {
        let output = mach(tree.path()).args(args).output().unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).starts_with(expected));
    }

    let output = mach(tree.path()).args(["help", "deploy"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(String::from_utf8_lossy(&output.stderr), "error: deploy: unknown command\n");
}

#[test]
fn test_settings_unknown_command_exits_two() {
    let tree = tree();
    let output = mach(tree.path())
        .args(["settings", "--command", "deploy"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr),
        "error: settings: no such command: deploy\n"
    );
}

#[test]
fn test_load_error_exits_one() {
    let tree = Tree::new();
    tree.write("mach.toml", "modules = [\"missing.toml\"]\n");

    let output = mach(tree.path()).arg("environment").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: failed to load commands from"), "{stderr}");
    assert_eq!(stderr.lines().count(), 1);
}

#[test]
fn test_mach_commands_lists_registration_order() {
    let tree = tree();
    let output = mach(tree.path()).arg("mach-commands").output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "mach-commands\nenvironment\nsettings\nbuild\nfail\n"
    );

    let output = mach(tree.path()).args(["mach-commands", "--json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[3]["name"], "build");
    assert_eq!(value[3]["category"], "build");
}

#[test]
fn test_environment_reports_root() {
    let tree = tree();
    let output = mach(tree.path())
        .args(["environment", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let root = tree.path().canonicalize().unwrap();
    assert_eq!(value["root"], root.to_string_lossy().as_ref());
    assert_eq!(value["commands"], 5);
    assert_eq!(value["modules"], serde_json::json!(["commands.toml"]));
}

#[tokio::test]
#[serial]
async fn test_parse_async_in_process() {
    let tree = tree();
    let root = tree.path().to_string_lossy().into_owned();

    let code = cli::parse_async(Some(&["mach", "--root", &root, "fail"])).await.unwrap();
    assert_eq!(code, 9);

    let code = cli::parse_async(Some(&["mach", "--root", &root, "nope"])).await.unwrap();
    assert_eq!(code, 2);

    let err = cli::parse_async(Some(&["mach", "--root", "/definitely/not/here", "build"]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid source-tree root"), "{err}");
}
