use std::time::Duration;

use catcher_core::{
    CapturedRecord, DownloadRequest, SessionKey, StateSnapshot, StitchRequest, StreamKind,
};
use catcher_engine::{FailureKind, HttpSink, NotificationSink, SinkSettings};
use chrono::DateTime;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sink_for(server: &MockServer) -> HttpSink {
    HttpSink::new(SinkSettings {
        endpoint: server.uri(),
        ..SinkSettings::default()
    })
    .expect("client")
}

fn record(url: &str) -> CapturedRecord {
    CapturedRecord {
        url: url.to_string(),
        source_page: "https://videos.example.com/watch".to_string(),
        source_title: "Watch".to_string(),
        session_key: SessionKey::new("https://videos.example.com/watch"),
        timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        kind: StreamKind::ManifestDash,
    }
}

#[tokio::test]
async fn capture_notice_uses_process_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/process"))
        .and(body_partial_json(json!({
            "streamUrl": "https://cdn.example.com/a.mpd",
            "sourcePage": "https://videos.example.com/watch",
            "timestamp": "2023-11-14T22:13:20+00:00",
            "type": "DASH manifest",
            "sessionKey": "https://videos.example.com/watch",
            "title": "Watch",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "received", "url": "https://cdn.example.com/a.mpd"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let receipt = sink_for(&server)
        .notify_capture(&record("https://cdn.example.com/a.mpd"))
        .await
        .expect("notify ok");
    assert_eq!(receipt.status, 200);
    assert_eq!(receipt.body.unwrap()["status"], "received");
}

#[tokio::test]
async fn download_request_posts_url_and_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_json(json!({"url": "https://cdn.example.com/a.m3u8", "title": "Show"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let request = DownloadRequest::new("https://cdn.example.com/a.m3u8", "Show").unwrap();
    let receipt = sink_for(&server).request_download(&request).await.unwrap();
    assert_eq!(receipt.status, 202);
    assert_eq!(receipt.body, None);
}

#[tokio::test]
async fn stitch_request_posts_session_and_urls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stitch"))
        .and(body_json(json!({
            "sessionKey": "https://videos.example.com/watch",
            "title": "Show",
            "urls": ["https://cdn.example.com/a.mpd"],
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = StateSnapshot::new(true, vec![record("https://cdn.example.com/a.mpd")]);
    let request =
        StitchRequest::for_session(&snapshot, "https://videos.example.com/watch", "Show").unwrap();
    sink_for(&server).request_stitch(&request).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let request = DownloadRequest::new("a.mpd", "t").unwrap();
    let err = sink_for(&server).request_download(&request).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test]
async fn slow_sink_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(250)))
        .mount(&server)
        .await;

    let sink = HttpSink::new(SinkSettings {
        endpoint: server.uri(),
        timeout: Duration::from_millis(50),
    })
    .unwrap();
    let err = sink.health().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn health_reports_status_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    // Trailing slash on the endpoint must not produce `//health`.
    let sink = HttpSink::new(SinkSettings {
        endpoint: format!("{}/", server.uri()),
        ..SinkSettings::default()
    })
    .unwrap();
    let receipt = sink.health().await.unwrap();
    assert_eq!(receipt.body, Some(json!({"status": "ok"})));
}

#[tokio::test]
async fn unparsable_endpoint_is_rejected() {
    let sink = HttpSink::new(SinkSettings {
        endpoint: "not a url".to_string(),
        ..SinkSettings::default()
    })
    .unwrap();
    let err = sink.health().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidEndpoint);
}
