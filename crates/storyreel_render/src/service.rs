//! The render server's HTTP contract.
//!
//! `POST /upload` stores one file, `POST /process` renders a timeline and
//! names the output, `GET /download/{name}` fetches it, and `GET /progress`
//! streams render progress as server-sent events.

use crate::config::ServerConfig;
use crate::error::{RenderError, Result};
use crate::progress::{ProgressParser, RenderProgress};
use crate::request::RenderRequest;
use crate::upload::LocalMedia;
use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_data: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// RenderService
// ---------------------------------------------------------------------------

/// The server operations the editor depends on.
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn upload(&self, media: &LocalMedia) -> Result<UploadResponse>;

    async fn process(&self, request: &RenderRequest) -> Result<ProcessResponse>;

    async fn download(&self, name: &str) -> Result<Vec<u8>>;

    /// Publish render progress until the server reports completion or the
    /// stream ends. Services without a progress feed return immediately.
    async fn watch_progress(&self, _tx: watch::Sender<RenderProgress>) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HttpRenderService
// ---------------------------------------------------------------------------

pub struct HttpRenderService {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpRenderService {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RenderError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(RenderError::InvalidUrl(config.base_url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RenderError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RenderService for HttpRenderService {
    async fn upload(&self, media: &LocalMedia) -> Result<UploadResponse> {
        let url = self.endpoint(&["upload"])?;
        let bytes = tokio::fs::read(&media.path).await?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(media.file_name.clone())
            .mime_str(media.mime_type.unwrap_or("application/octet-stream"))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(%url, file = %media.file_name, size = media.size, "uploading");
        let response = self.client.post(url).multipart(form).send().await?;
        json_body(response).await
    }

    async fn process(&self, request: &RenderRequest) -> Result<ProcessResponse> {
        let url = self.endpoint(&["process"])?;
        info!(%url, clips = request.timeline.len(), "submitting render");
        let response = self.client.post(url).json(request).send().await?;
        json_body(response).await
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&["download", name])?;
        debug!(%url, "downloading render output");
        let response = checked(self.client.get(url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn watch_progress(&self, tx: watch::Sender<RenderProgress>) -> Result<()> {
        let url = self.endpoint(&["progress"])?;
        let mut response = checked(
            self.client
                .get(url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send()
                .await?,
        )
        .await?;

        let mut parser = ProgressParser::default();
        while let Some(chunk) = response.chunk().await? {
            for progress in parser.feed(&chunk) {
                let done = progress.is_complete();
                if tx.send(progress).is_err() {
                    return Ok(());
                }
                if done {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// Turn a non-success status into `RenderError::Status`, using the server's
/// `{"error": ...}` body as the message when there is one.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text.trim().to_string()
            }
        });
    warn!(status = status.as_u16(), %message, "server returned an error");
    Err(RenderError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let response = checked(response).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}
