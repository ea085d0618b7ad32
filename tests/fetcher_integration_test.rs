use argo_feed::config::Config;
use argo_feed::error::AppError;
use argo_feed::fetcher::Fetcher;
use std::io::Write;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test successful download with mock server
#[tokio::test]
async fn test_fetcher_downloads_successfully() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id": 1}]"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new("argo-feed-test").expect("Failed to create fetcher");
    let url = Url::parse(&format!("{}/posts", mock_server.uri())).unwrap();

    let body = fetcher.download(&url, Duration::from_secs(2)).await;
    tokio_test::assert_ok!(&body);
    assert_eq!(body.unwrap(), r#"[{"id": 1}]"#);
}

/// Non-2xx responses are errors, and are not retried
#[tokio::test]
async fn test_fetcher_rejects_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new("argo-feed-test").unwrap();
    let url = Url::parse(&format!("{}/flaky.json", mock_server.uri())).unwrap();

    match fetcher.download(&url, Duration::from_secs(2)).await {
        Err(AppError::Http(e)) => {
            assert_eq!(e.status().map(|s| s.as_u16()), Some(500));
        }
        other => panic!("Expected HTTP error, got: {:?}", other),
    }
}

/// Slow responses are cut off at the per-request timeout
#[tokio::test]
async fn test_fetcher_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow.csv"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new("argo-feed-test").unwrap();
    let url = Url::parse(&format!("{}/slow.csv", mock_server.uri())).unwrap();

    match fetcher.download(&url, Duration::from_millis(300)).await {
        Err(AppError::Http(e)) => assert!(e.is_timeout()),
        other => panic!("Expected timeout, got: {:?}", other),
    }
}

/// Config files load from disk with environment substitution
#[test]
fn test_config_loads_from_file() {
    std::env::set_var("ARGO_FEED_TEST_PROBE_URL", "https://jsonplaceholder.typicode.com/posts");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
sources:
  primary:
    - name: ifremer
      base_url: https://erddap.ifremer.fr/erddap/tabledap/ArgoFloats
  alternative:
    name: probe
    base_url: ${{ARGO_FEED_TEST_PROBE_URL}}
query:
  time_range: All Time
"#
    )
    .unwrap();

    let config = Config::load(file.path()).expect("config should load");
    assert_eq!(
        config.sources.alternative.unwrap().base_url,
        "https://jsonplaceholder.typicode.com/posts"
    );
}

/// Missing config files surface as configuration errors
#[test]
fn test_config_missing_file() {
    let result = Config::load("/definitely/not/here.yaml");
    assert!(matches!(result, Err(AppError::Config(_))));
}
