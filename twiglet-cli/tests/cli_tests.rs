use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn twiglet_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("twiglet"));
    cmd.arg("--root").arg(root).env("RUST_LOG", "warn");
    cmd
}

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

fn fixture() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "button/button.twig",
        "<button{{ attributes }}>{% trans %}Buy{% endtrans %} {{ label }}</button>",
    );
    write(
        dir.path(),
        "button/button.config.yml",
        "label: Button\ncontext:\n  label: now\n  attributes:\n    class: btn\nvariants:\n  - name: primary\n    context:\n      attributes:\n        class: btn--primary\n",
    );
    dir
}

#[test]
fn list_prints_every_handle() {
    let dir = fixture();
    twiglet_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("@button").and(contains("@button--primary")));
}

#[test]
fn list_json_is_machine_readable() {
    let dir = fixture();
    let output = twiglet_cmd(dir.path()).args(["list", "--json"]).output().expect("run");
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert!(rows
        .as_array()
        .expect("array")
        .iter()
        .any(|row| row["handle"] == "@button--primary" && row["kind"] == "variant"));
}

#[test]
fn render_prints_the_component() {
    let dir = fixture();
    twiglet_cmd(dir.path())
        .args(["render", "@button--primary", "--context", r#"{"label": "today"}"#])
        .assert()
        .success()
        .stdout(contains(r#"<button class="btn btn--primary">Buy today</button>"#));
}

#[test]
fn render_uses_the_catalog() {
    let dir = fixture();
    write(dir.path(), "de.po", "msgid \"Buy\"\nmsgstr \"Kaufen\"\n");
    twiglet_cmd(dir.path())
        .arg("--catalog")
        .arg(dir.path().join("de.po"))
        .args(["render", "@button"])
        .assert()
        .success()
        .stdout(contains("Kaufen now"));
}

#[test]
fn render_unknown_handle_fails() {
    let dir = fixture();
    twiglet_cmd(dir.path())
        .args(["render", "@ghost"])
        .assert()
        .failure()
        .stderr(contains("Unable to render '@ghost' - component not found."));
}

#[test]
fn invalid_context_is_rejected() {
    let dir = fixture();
    twiglet_cmd(dir.path())
        .args(["render", "@button", "--context", "[1]"])
        .assert()
        .failure()
        .stderr(contains("--context must be a JSON object"));
}
