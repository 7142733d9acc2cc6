use station_series::error::AppError;
use station_series::fetcher::{DataSource, Fetcher};
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const METADATA: &str = r#"{"last_updated": "2025-01-15T14:05:00.123456", "stations": ["YCTIM", "YCAND"], "hours_of_data": 168}"#;

const STATIONS: &str = r#"{
    "YCTIM": {
        "station_id": "YCTIM",
        "station_name": "Timberline",
        "table": {"headers": ["Date/Time", "Temp"], "rows": [["Jan 15, 1:00 pm", "21"]]}
    },
    "YCAND": {"station_id": "YCAND", "station_name": "Andesite", "error": "net::ERR_TIMED_OUT"}
}"#;

/// Test reading both documents from a mock file host
#[tokio::test]
async fn test_fetch_documents_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/metadata.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(METADATA))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/all_stations.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STATIONS))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&format!("{}/data/", mock_server.uri())).expect("fetcher");
    let source = DataSource::Http(fetcher);

    let metadata = assert_ok!(source.metadata("metadata.json").await);
    assert_eq!(metadata.hours_of_data, 168);
    assert_eq!(metadata.stations.len(), 2);

    let stations = assert_ok!(source.stations("all_stations.json").await);
    assert_eq!(stations.len(), 2);
    assert!(stations["YCAND"].is_error());
    assert_eq!(stations["YCTIM"].station_name, "Timberline");
}

/// Test retry logic with transient failures
#[tokio::test]
async fn test_fetcher_retries_on_server_error() {
    let mock_server = MockServer::start().await;

    // First two requests fail with 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/metadata.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/metadata.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(METADATA))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&mock_server.uri()).expect("fetcher");
    let body = fetcher.download("metadata.json").await;
    assert_eq!(assert_ok!(body), METADATA);
}

/// Test that client errors are not retried
#[tokio::test]
async fn test_fetcher_does_not_retry_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&mock_server.uri()).expect("fetcher");
    let result = fetcher.download("metadata.json").await;

    match result {
        Err(AppError::Http(e)) => assert_eq!(e.status().map(|s| s.as_u16()), Some(404)),
        other => panic!("Expected HTTP 404 error, got: {:?}", other),
    }
}

/// Test that retries stop after the configured limit
#[tokio::test]
async fn test_fetcher_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&mock_server.uri())
        .expect("fetcher")
        .with_max_retries(1);
    let result = fetcher.download("metadata.json").await;
    assert!(matches!(result, Err(AppError::Http(_))));
}

/// Test that a malformed document is reported as invalid data
#[tokio::test]
async fn test_malformed_document_is_invalid_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let source = DataSource::Http(Fetcher::new(&mock_server.uri()).expect("fetcher"));
    match source.metadata("metadata.json").await {
        Err(AppError::InvalidData(msg)) => assert!(msg.contains("metadata.json")),
        other => panic!("Expected InvalidData error, got: {:?}", other),
    }
}

/// Test reading documents from a local directory
#[tokio::test]
async fn test_local_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("metadata.json"), METADATA).unwrap();

    let source = DataSource::Local(dir.path().to_path_buf());
    let metadata = assert_ok!(source.metadata("metadata.json").await);
    assert_eq!(metadata.stations, vec!["YCTIM", "YCAND"]);

    assert!(matches!(
        source.stations("all_stations.json").await,
        Err(AppError::Io(_))
    ));
}
