use std::time::Duration;

use catcher_core::{CapturedRecord, DownloadRequest, StitchRequest};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::{FailureKind, SinkError, SinkReceipt};

#[derive(Debug, Clone)]
pub struct SinkSettings {
    /// Base URL of the download service, e.g. `http://localhost:5000`.
    pub endpoint: String,
    /// Upper bound for every sink call, connect included.
    pub timeout: Duration,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// External service that downloads and stitches captured media.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_capture(&self, record: &CapturedRecord) -> Result<SinkReceipt, SinkError>;
    async fn request_download(&self, request: &DownloadRequest) -> Result<SinkReceipt, SinkError>;
    async fn request_stitch(&self, request: &StitchRequest) -> Result<SinkReceipt, SinkError>;
    async fn health(&self) -> Result<SinkReceipt, SinkError>;
}

/// Body posted to `/process` for every new capture.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureNotice<'a> {
    stream_url: &'a str,
    source_page: &'a str,
    timestamp: String,
    #[serde(rename = "type")]
    kind: String,
    session_key: &'a str,
    title: &'a str,
}

impl<'a> From<&'a CapturedRecord> for CaptureNotice<'a> {
    fn from(record: &'a CapturedRecord) -> Self {
        Self {
            stream_url: &record.url,
            source_page: &record.source_page,
            timestamp: record.timestamp.to_rfc3339(),
            kind: record.kind.to_string(),
            session_key: record.session_key.as_str(),
            title: &record.source_title,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSink {
    settings: SinkSettings,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(settings: SinkSettings) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| SinkError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, SinkError> {
        let base = self.settings.endpoint.trim_end_matches('/');
        reqwest::Url::parse(&format!("{base}/{path}"))
            .map_err(|err| SinkError::new(FailureKind::InvalidEndpoint, err.to_string()))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<SinkReceipt, SinkError> {
        let url = self.url(path)?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| SinkError::new(FailureKind::Encoding, err.to_string()))?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        into_receipt(response).await
    }
}

#[async_trait::async_trait]
impl NotificationSink for HttpSink {
    async fn notify_capture(&self, record: &CapturedRecord) -> Result<SinkReceipt, SinkError> {
        self.post("process", &CaptureNotice::from(record)).await
    }

    async fn request_download(&self, request: &DownloadRequest) -> Result<SinkReceipt, SinkError> {
        self.post("download", request).await
    }

    async fn request_stitch(&self, request: &StitchRequest) -> Result<SinkReceipt, SinkError> {
        self.post("stitch", request).await
    }

    async fn health(&self) -> Result<SinkReceipt, SinkError> {
        let response = self
            .client
            .get(self.url("health")?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        into_receipt(response).await
    }
}

async fn into_receipt(response: reqwest::Response) -> Result<SinkReceipt, SinkError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SinkError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(SinkReceipt {
        status: status.as_u16(),
        body: serde_json::from_slice(&bytes).ok(),
    })
}

fn map_reqwest_error(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        return SinkError::new(FailureKind::Timeout, err.to_string());
    }
    SinkError::new(FailureKind::Network, err.to_string())
}
