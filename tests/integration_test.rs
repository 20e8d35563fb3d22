use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sitzplan"))
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn setup() {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
}

fn cleanup_file(name: &str) {
    let path = output_dir().join(name);
    if path.exists() {
        fs::remove_file(&path).ok();
    }
}

fn assert_pdf(name: &str) {
    let path = output_dir().join(name);
    assert!(path.exists(), "PDF file was not created");
    let metadata = fs::metadata(&path).expect("Failed to get file metadata");
    assert!(metadata.len() > 1000, "PDF file is too small, likely empty or corrupt");
}

#[test]
fn test_export_with_roster() {
    setup();
    let output_file = "test-roster.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "export",
            "-n", "Klasse 5a",
            "--rows", "3",
            "--columns", "4",
            "--seats", "2",
            "--roster", &fixture("roster.json"),
            "--seed", "7",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(output_file);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Seated: 8 of 24"), "{}", stdout);
    assert!(stdout.contains("16 freie Plätze"), "{}", stdout);
}

#[test]
fn test_default_filename() {
    setup();
    let dir = output_dir().join("default-name");
    fs::create_dir_all(&dir).expect("Failed to create output directory");
    let expected = dir.join("Sitzplan_Klasse_7b_Mathe.pdf");
    if expected.exists() {
        fs::remove_file(&expected).ok();
    }

    let output = cargo_bin()
        .current_dir(&dir)
        .args(["export", "-n", "Klasse 7b Mathe", "--numbered", "20", "-t", "monochrome"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(expected.exists(), "PDF with default name was not created");
}

#[test]
fn test_combined_sources_save_and_reload() {
    setup();
    let first_pdf = "test-combined.pdf";
    let second_pdf = "test-reloaded.pdf";
    let chart = output_dir().join("test-chart.json");
    cleanup_file(first_pdf);
    cleanup_file(second_pdf);

    let output = cargo_bin()
        .args([
            "export",
            "-n", "Kurs 9",
            "-r", "2",
            "-c", "2",
            "-s", "3",
            "--spreadsheet", &fixture("klasse.csv"),
            "--first-name-col", "2",
            "--last-name-col", "1",
            "--bulk", &fixture("bulk.txt"),
            "--exclude", "bulk-S2",
            "--theme", "ink-saving",
            "--seed", "3",
            "--save", chart.to_str().unwrap(),
            "-o", &format!("tests/output/{}", first_pdf),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(first_pdf);

    // 3 spreadsheet rows + 1 valid bulk line (S2 excluded) on 12 seats
    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&chart).expect("chart file")).expect("chart json");
    let seated: usize = saved["desks"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap())
        .map(|desk| desk["students"].as_array().unwrap().len())
        .sum();
    assert_eq!(seated, 4);
    // The row nearest the board is stored last and filled first.
    let front: usize = saved["desks"][1]
        .as_array()
        .unwrap()
        .iter()
        .map(|desk| desk["students"].as_array().unwrap().len())
        .sum();
    assert_eq!(front, 4);

    let output = cargo_bin()
        .args([
            "export",
            "--chart", chart.to_str().unwrap(),
            "--no-fill",
            "-o", &format!("tests/output/{}", second_pdf),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(second_pdf);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Class: Kurs 9"));
}

#[test]
fn test_overbooked_classroom_warns_but_exports() {
    setup();
    let output_file = "test-overbooked.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "export",
            "-n", "Voll",
            "-r", "1",
            "-c", "2",
            "-s", "2",
            "--numbered", "6",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(output_file);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("⚠ 2 Schüler:innen haben keinen Platz"), "{}", stdout);
}

#[test]
fn test_pick_without_animation() {
    let output = cargo_bin()
        .args([
            "pick",
            "--roster", &fixture("roster.json"),
            "-k", "3",
            "--seed", "11",
            "--no-animation",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim().split(", ").count(), 3, "{}", stdout);
}

#[test]
fn test_pick_groups() {
    let output = cargo_bin()
        .args([
            "pick",
            "--roster", &fixture("roster.json"),
            "--groups", "3",
            "--no-animation",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().filter(|l| l.starts_with("Gruppe ")).count(), 3);
}

#[test]
fn test_invalid_roster_file() {
    let output = cargo_bin()
        .args([
            "export",
            "-n", "Test",
            "--roster", "nonexistent.json",
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed for missing roster");
}

#[test]
fn test_invalid_date_format() {
    let output = cargo_bin()
        .args([
            "export",
            "-n", "Test",
            "-d", "not-a-date",
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed for invalid date");
}

#[test]
fn test_spreadsheet_requires_column_mapping() {
    let output = cargo_bin()
        .args([
            "export",
            "-n", "Test",
            "--spreadsheet", &fixture("klasse.csv"),
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed without column mapping");
}

#[test]
fn test_excel_workbook_import() {
    setup();
    let output_file = "test-workbook.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "export",
            "-n", "Test",
            "-r", "1",
            "-c", "2",
            "-s", "1",
            "--spreadsheet", &fixture("klasse.xlsx"),
            "--first-name-col", "2",
            "--last-name-col", "1",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(output_file);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Seated: 2 of 2"), "{}", stdout);
}

#[test]
fn test_export_with_logo_and_german_date() {
    setup();
    let output_file = "test-logo.pdf";
    cleanup_file(output_file);

    let output = cargo_bin()
        .args([
            "export",
            "-n", "Klasse 10a",
            "--numbered", "12",
            "--logo", &fixture("logo.png"),
            "-d", "03.03.2025",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_pdf(output_file);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Date: 03.03.2025"), "{}", stdout);
}

#[test]
fn test_missing_logo_fails() {
    let output = cargo_bin()
        .args([
            "export",
            "-n", "Test",
            "--logo", "nonexistent.png",
            "-o", "tests/output/should-not-exist.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Command should have failed for a missing logo");
}

#[test]
fn test_group_animation_shows_only_groups() {
    let output = cargo_bin()
        .args([
            "pick",
            "--roster", &fixture("roster.json"),
            "--groups", "3",
            "--seed", "5",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().count() > 3, "{}", stdout);
    assert!(stdout.lines().all(|l| l.contains("Gruppe ")), "{}", stdout);

    let last: Vec<&str> = stdout.lines().rev().take(3).collect();
    assert!(last[2].contains("Gruppe 1:") && last[0].starts_with("Gruppe 3:"), "{}", stdout);
}
