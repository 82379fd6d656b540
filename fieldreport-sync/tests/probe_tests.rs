use fieldreport_sync::{ConnectivityProbe, HttpProbe, ProbeConfig};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn probe_for(endpoint: String, timeout: Duration) -> HttpProbe {
    HttpProbe::new(ProbeConfig { endpoint, timeout })
}

#[tokio::test]
async fn reachable_endpoint_reports_online() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let probe = probe_for(server.uri(), Duration::from_secs(5));
    assert!(probe.probe().await);
}

#[tokio::test]
async fn server_error_reports_offline() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let probe = probe_for(server.uri(), Duration::from_secs(5));
    assert!(!probe.probe().await);
}

#[tokio::test]
async fn unreachable_endpoint_reports_offline() {
    // Nothing listens on the discard port.
    let probe = probe_for("http://127.0.0.1:9".into(), Duration::from_millis(500));
    assert!(!probe.probe().await);
}

#[tokio::test]
async fn slow_endpoint_times_out_as_offline() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let probe = probe_for(server.uri(), Duration::from_millis(100));
    assert!(!probe.probe().await);
}
