#![forbid(unsafe_code)]
use shift_roster::{io, ShiftCode, SolveResponse};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn small_response() -> SolveResponse {
    let mut schedule = BTreeMap::new();
    schedule.insert(
        "alice".to_string(),
        vec![Some(ShiftCode::Night), Some(ShiftCode::NightRest), Some(ShiftCode::Paid)],
    );
    schedule.insert(
        "bob".to_string(),
        vec![Some(ShiftCode::Early), Some(ShiftCode::Late), None],
    );
    SolveResponse {
        schedule,
        diagnostics: vec!["bob: day(s) 3 left unassigned".to_string()],
        year: 2025,
        month: 2,
        days_in_month: 3,
        penalty: 0,
        attempts: 1,
    }
}

#[test]
fn schedule_csv_layout() {
    let mut out = Vec::new();
    io::write_schedule_csv(&mut out, &small_response()).unwrap();
    let text = String::from_utf8(out).unwrap();
    insta::assert_snapshot!(text.trim_end(), @r"
    name,1,2,3
    alice,夜,・,有
    bob,早,遅,
    ");
}

#[test]
fn response_file_is_written_atomically_and_reloads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.json");
    let response = small_response();
    io::write_response_json(&path, &response).unwrap();

    let back = io::load_response_json(&path).unwrap();
    assert_eq!(back, response);
    assert_eq!(back.schedule["bob"][2], None);

    // seul le fichier final reste dans le dossier
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn partial_config_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tuning.json");
    std::fs::write(&path, r#"{"penaltyNightMissing": 900, "minDayStaff": 4}"#).unwrap();

    let config = io::load_config_json(&path).unwrap();
    assert_eq!(config.penalty_night_missing, 900);
    assert_eq!(config.min_day_staff, 4);
    assert_eq!(config.penalty_early_missing, 300);
}
