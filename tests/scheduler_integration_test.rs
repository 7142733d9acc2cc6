use chrono::{TimeZone, Utc};
use std::path::Path;
use station_series::config::Config;
use station_series::scheduler::{RefreshOutcome, Scheduler};
use tokio::sync::watch;
use tokio_test::assert_ok;

const STATIONS: &str = r#"{
    "YCTIM": {
        "station_id": "YCTIM",
        "station_name": "Timberline",
        "table": {
            "headers": ["Date/Time (MST)", "Temperature (F)", "Snow Depth (in)"],
            "rows": [
                ["Jan 14, 1:00 pm", "10", "30"],
                ["Jan 15, 12:00 pm", "12", "31"],
                ["Jan 15, 1:00 pm", "14", "32"]
            ]
        }
    },
    "YCGBR": {
        "station_id": "YCGBR",
        "station_name": "Great Bear",
        "data": "<pre>Date/Time      Temp   Snow Depth\nJan 15 1:00 pm   20   45\n</pre>"
    },
    "YCBAS": {"station_id": "YCBAS", "station_name": "Base", "error": "timeout"}
}"#;

fn metadata(last_updated: &str) -> String {
    format!(
        r#"{{"last_updated": "{}", "stations": ["YCTIM", "YCGBR", "YCBAS"], "hours_of_data": 168}}"#,
        last_updated
    )
}

fn config(data_dir: &Path, out_dir: &Path, extra: &str) -> Config {
    let yaml = format!(
        "source:\n  data_dir: {}\nscheduler:\n  interval_minutes: 10\noutput:\n  dir: {}\ndisplay:\n  utc_offset_hours: -7\n  window_hours: 6\n{}",
        data_dir.display(),
        out_dir.display(),
        extra
    );
    Config::from_yaml(&yaml).expect("config")
}

fn write_data(dir: &Path, last_updated: &str) {
    std::fs::write(dir.join("all_stations.json"), STATIONS).unwrap();
    std::fs::write(dir.join("metadata.json"), metadata(last_updated)).unwrap();
}

/// 2025-01-15 21:00 UTC is 14:00 at UTC-7.
fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 21, 0, 0).unwrap()
}

/// Test a full refresh writes the output document
#[tokio::test]
async fn test_refresh_writes_document() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_data(data.path(), "2025-01-15T20:55:00");

    let (_tx, rx) = watch::channel(false);
    let mut scheduler = Scheduler::new(config(data.path(), out.path(), ""), rx).unwrap();

    let outcome = assert_ok!(scheduler.refresh_at(now()).await);
    assert_eq!(outcome, RefreshOutcome::Updated { stations: 3 });
    assert_eq!(scheduler.series()["YCTIM"].len(), 3);
    assert_eq!(scheduler.series()["YCGBR"].len(), 1);
    assert!(scheduler.series()["YCBAS"].is_empty());

    let written = std::fs::read_to_string(out.path().join("series.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();

    assert_eq!(doc["windowHours"], 6);
    // Jan 14 reading is outside the 6 hour window
    assert_eq!(doc["stations"]["YCTIM"]["series"]["timestamps"].as_array().unwrap().len(), 2);
    assert_eq!(doc["stations"]["YCGBR"]["name"], "Great Bear");
    assert_eq!(doc["aggregate"]["activeStations"], 2);
    assert_eq!(doc["aggregate"]["maxSnowDepth"], 45.0);
    assert_eq!(doc["aggregate"]["avgTemperature"], 17.0);
    assert!(!out.path().join("series.json.tmp").exists());
}

/// Test an unchanged last_updated skips reprocessing
#[tokio::test]
async fn test_unchanged_metadata_is_skipped() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_data(data.path(), "2025-01-15T20:55:00");

    let (_tx, rx) = watch::channel(false);
    let mut scheduler = Scheduler::new(config(data.path(), out.path(), ""), rx).unwrap();

    assert_ok!(scheduler.refresh_at(now()).await);
    let second = assert_ok!(scheduler.refresh_at(now()).await);
    assert_eq!(second, RefreshOutcome::Unchanged);

    write_data(data.path(), "2025-01-15T21:55:00");
    let third = assert_ok!(scheduler.refresh_at(now()).await);
    assert!(matches!(third, RefreshOutcome::Updated { .. }));
    assert_eq!(
        scheduler.last_updated().map(|t| t.to_string()),
        Some("2025-01-15 21:55:00".to_string())
    );
}

/// Test the station selection narrows the aggregate only
#[tokio::test]
async fn test_station_selection() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_data(data.path(), "2025-01-15T20:55:00");

    let (_tx, rx) = watch::channel(false);
    let extra = "stations:\n  ids: [YCTIM]\n";
    let mut scheduler = Scheduler::new(config(data.path(), out.path(), extra), rx).unwrap();
    assert_ok!(scheduler.refresh_at(now()).await);

    let written = std::fs::read_to_string(out.path().join("series.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["selected"], serde_json::json!(["YCTIM"]));
    assert_eq!(doc["aggregate"]["maxSnowDepth"], 32.0);
    assert_eq!(doc["stations"].as_object().unwrap().len(), 3);
}

/// Test a failed refresh keeps the previous state
#[tokio::test]
async fn test_failed_refresh_keeps_previous_state() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_data(data.path(), "2025-01-15T20:55:00");

    let (_tx, rx) = watch::channel(false);
    let mut scheduler = Scheduler::new(config(data.path(), out.path(), ""), rx).unwrap();
    assert_ok!(scheduler.refresh_at(now()).await);

    std::fs::write(data.path().join("metadata.json"), metadata("2025-01-15T22:00:00")).unwrap();
    std::fs::write(data.path().join("all_stations.json"), "{ truncated").unwrap();

    assert!(scheduler.refresh_at(now()).await.is_err());
    assert_eq!(scheduler.series().len(), 3);
    assert_eq!(
        scheduler.last_updated().map(|t| t.to_string()),
        Some("2025-01-15 20:55:00".to_string())
    );
}
