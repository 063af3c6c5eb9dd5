use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(args: &[&str]) -> Output {
    Command::new("cargo")
        .arg("run")
        .arg("--")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_check_reports_missing_placeholders() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();

    let catalog_path = temp_path.join("catalog.txt");
    fs::write(&catalog_path, "{{Title}}\n{{Subtitle}}\n{{Body}}\n")
        .expect("Failed to write catalog file");

    let content_path = temp_path.join("content.txt");
    fs::write(&content_path, "{{Title}} Knowing Yourself\n{{Body}} All the details\n")
        .expect("Failed to write content file");

    let output = run_command(&[
        "check",
        "--input",
        content_path.to_str().unwrap(),
        "--catalog",
        catalog_path.to_str().unwrap(),
    ]);

    assert!(
        !output.status.success(),
        "check must fail when placeholders are missing"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Matched 2 of 3 placeholders."));
    assert!(stdout.contains("missing: {{Subtitle}}"));
    assert!(!stdout.contains("missing: {{Title}}"));
}

#[test]
fn test_check_accepts_complete_content() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let temp_path = temp_dir.path();

    let catalog_path = temp_path.join("catalog.txt");
    fs::write(&catalog_path, "{{Title}}\n{{Subtitle}}\n").expect("Failed to write catalog file");

    // Sloppy brace counts and a next-line value, as pasted text tends to be.
    let content_path = temp_path.join("content.txt");
    fs::write(
        &content_path,
        "Here you go:\n{Title} Knowing Yourself\n{{{Subtitle}}}\n\nWhy it matters\n",
    )
    .expect("Failed to write content file");

    let output = run_command(&[
        "check",
        "--input",
        content_path.to_str().unwrap(),
        "--catalog",
        catalog_path.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("All placeholders present."));
}
