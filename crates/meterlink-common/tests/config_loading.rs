//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "tests"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Configuration discovery tests."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::io::Write;
use std::time::Duration;

use meterlink_common::AppConfig;
use tempfile::tempdir;

#[test]
fn first_existing_candidate_wins() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("meterlink.toml");
    let mut file = std::fs::File::create(&present).unwrap();
    writeln!(file, "[emission]\ncadence_ms = 1500\nwindow_capacity = 4").unwrap();

    let loaded = AppConfig::load_with_source(&[missing, present.clone()]).unwrap();
    assert_eq!(loaded.source, present);
    assert_eq!(loaded.config.emission.cadence, Duration::from_millis(1500));
    assert_eq!(loaded.config.emission.window_capacity, 4);
}

#[test]
fn no_candidates_reports_inspected_paths() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nowhere.toml");
    let err = AppConfig::load(&[missing]).unwrap_err();
    assert!(err.to_string().contains("nowhere.toml"));
}

#[test]
fn invalid_file_is_reported_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[emission]\nwindow_capacity = 0\n").unwrap();
    let err = AppConfig::load(&[path]).unwrap_err();
    assert!(format!("{err:#}").contains("window_capacity"));
}
