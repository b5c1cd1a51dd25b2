use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const SHADER: &str = "#version 300 es\nprecision mediump float;\nuniform vec4 vA;\nout vec4 P;\nvoid main() {\n    P = vA * 1.0;\n}\n";

fn glslight() -> Command {
    let mut cmd = Command::cargo_bin("glslight").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_optimize_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.frag");
    fs::write(&input, SHADER).unwrap();

    glslight()
        .arg("optimize")
        .arg(&input)
        .arg("--verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("void main(){P=vA;}"));
}

#[test]
fn test_optimize_to_file_with_beautify() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.frag");
    let output = dir.path().join("out.frag");
    fs::write(&input, SHADER).unwrap();

    glslight()
        .args(["optimize", "--beautify", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("void main() {\n  P = vA;\n}\n"), "{}", text);
}

#[test]
fn test_optimize_withholds_output_on_errors() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.frag");
    fs::write(&input, "#version 300 es\nprecision mediump float;\nout vec4 P;\nvoid main(){P=missing;}\n").unwrap();

    glslight()
        .arg("optimize")
        .arg(&input)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("UndeclaredIdentifier"));
}

#[test]
fn test_validate_directory_with_limits_override() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ok.frag"), SHADER).unwrap();
    fs::write(
        dir.path().join("dynamic.frag"),
        "#version 300 es\nprecision mediump float;\nuniform int n;\nout vec4 P;\nvoid main(){float a[4];a[n]=1.;P=vec4(a[0]);}\n",
    )
    .unwrap();
    fs::write(dir.path().join("readme.txt"), "not a shader").unwrap();

    glslight().arg("validate").arg(dir.path()).assert().success().stderr(predicate::str::contains("2 ファイル"));

    let limits = dir.path().join("limits.json");
    fs::write(&limits, r#"{ "limits_generalVariableIndexing": 0 }"#).unwrap();
    glslight()
        .arg("validate")
        .arg(dir.path())
        .arg("--limits")
        .arg(&limits)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("NonConstantIndexNotSupported"));
}

#[test]
fn test_validate_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.frag");
    fs::write(&input, SHADER).unwrap();

    let assert = glslight().args(["validate", "--json"]).arg(&input).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report[0]["stage"], "fragment");
    assert_eq!(report[0]["diagnostics"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_limits_dump_and_unknown_key() {
    glslight()
        .args(["limits", "--format", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("maxDrawBuffers = "));

    let dir = tempfile::tempdir().unwrap();
    let limits = dir.path().join("limits.toml");
    fs::write(&limits, "maxDrawBufers = 4\n").unwrap();
    glslight()
        .arg("limits")
        .arg("--limits")
        .arg(&limits)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("maxDrawBufers"));
}

#[test]
fn test_config_file_sets_emit_options() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shader.frag");
    let config = dir.path().join("glslight.toml");
    fs::write(
        &input,
        "#version 300 es\nprecision mediump float;uniform vec4 vA;out vec4 P;void main(){P=vA;P.x=1.;}",
    )
    .unwrap();
    fs::write(&config, "[emit]\nminify = true\n").unwrap();

    glslight()
        .arg("--config")
        .arg(&config)
        .arg("optimize")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("void main(){P=vA,P.x=1.;}"));
}
