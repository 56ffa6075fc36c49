use std::collections::HashMap;
use std::time::Duration;

use acp_analyst::domain::errors::UpstreamError;
use acp_analyst::domain::models::ServiceKind;
use acp_analyst::domain::ports::AnalysisSource;
use acp_analyst::infrastructure::upstream::{UpstreamClient, UpstreamClientConfig};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout: Duration) -> UpstreamClient {
    UpstreamClient::new(UpstreamClientConfig {
        base_url: server.uri(),
        timeout,
        endpoints: HashMap::new(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_returns_json_body() {
    let mock_server = MockServer::start().await;
    let body = serde_json::json!({"score": 75, "analysis": "calm"});

    Mock::given(method("GET"))
        .and(path(ServiceKind::BlackSwan.default_endpoint()))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let value = client.fetch(ServiceKind::BlackSwan).await.unwrap();

    assert_eq!(value, body);
}

#[tokio::test]
async fn test_fetch_uses_configured_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/peak"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"score": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = UpstreamClient::new(UpstreamClientConfig {
        base_url: mock_server.uri(),
        timeout: Duration::from_secs(5),
        endpoints: HashMap::from([(ServiceKind::MarketPeak, "/v2/peak".to_string())]),
    })
    .unwrap();

    let value = client.fetch(ServiceKind::MarketPeak).await.unwrap();
    assert_eq!(value["score"], 1);
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch(ServiceKind::MarketPeak).await.unwrap_err();

    assert_eq!(
        err,
        UpstreamError::Status {
            status: 503,
            body: "maintenance".to_string()
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_invalid_json_maps_to_decode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch(ServiceKind::BlackSwan).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Decode(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_slow_upstream_maps_to_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_millis(200));
    let err = client.fetch(ServiceKind::BlackSwan).await.unwrap_err();

    assert_eq!(err, UpstreamError::Timeout(Duration::from_millis(200)));
}

#[tokio::test]
async fn test_unreachable_upstream_maps_to_network() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();
    drop(mock_server);

    let client = UpstreamClient::new(UpstreamClientConfig {
        base_url: uri,
        timeout: Duration::from_secs(2),
        endpoints: HashMap::new(),
    })
    .unwrap();
    let err = client.fetch(ServiceKind::BlackSwan).await.unwrap_err();

    assert!(matches!(err, UpstreamError::Network(_)));
}
