use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn evaluate(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_evaluate"))
        .args(args)
        .current_dir(cwd)
        .env_remove("VRIKZO_MODEL")
        .env_remove("VRIKZO_LABELS")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn no_arguments_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    let output = evaluate(dir.path(), &[]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("USAGE:"));
    assert!(out.contains("--auto"));
    assert!(!out.contains("Loading model"));
}

#[test]
fn missing_path_reports_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = evaluate(dir.path(), &["no_such_leaf.jpg"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains(r#""error": "Path not found: no_such_leaf.jpg""#));
    assert!(!out.contains("Loading model"));
}

#[test]
fn auto_without_test_folders_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let output = evaluate(dir.path(), &["--auto"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Skipping missing folder: mini/Aloe_dataset/test"));
    assert!(out.contains("Skipping missing folder: mini/tomato_dataset/test"));
    assert!(out.contains("No test folders found"));
    assert!(!out.contains("Loading model"));
    assert!(!dir.path().join("test_results.json").exists());
}

#[test]
fn auto_treats_a_file_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("mini")).unwrap();
    fs::write(dir.path().join("mini/hibiscus_dataset"), "not a folder").unwrap();
    let output = evaluate(dir.path(), &["--auto"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Skipping missing folder: mini/hibiscus_dataset"));
    assert!(out.contains("No test folders found"));
}

#[test]
fn existing_image_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::new(4, 4).save(dir.path().join("leaf.png")).unwrap();
    let output = evaluate(dir.path(), &["leaf.png"]);

    assert!(!output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Loading model"));
    assert!(out.contains(r#""error": "#));
}
