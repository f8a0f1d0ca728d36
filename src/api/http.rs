use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::VideoBackend;
use crate::config::BackendConfig;
use crate::error::{Result, VideoGenError};
use crate::models::{ApiResponse, GeneratedVideo, GenerationRequest, JobCreated, JobId};

/// reqwest client for the generation API
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

/// reqwest client honouring the configured request timeout
///
/// Used for API calls and video downloads alike.
pub fn build_client(config: &BackendConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;
    Ok(client)
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path)
    }

    fn resource(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url(), collection, urlencoding::encode(id))
    }

    /// Check the HTTP status and decode the envelope
    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VideoGenError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| VideoGenError::Malformed(format!("{} (body: {})", e, truncate(&text, 200))))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl VideoBackend for HttpBackend {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId> {
        let url = self.endpoint("generate");
        debug!("Submitting generation request to {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        let envelope: ApiResponse<JobCreated> = Self::read_envelope(response).await?;
        Ok(envelope.into_data()?.job_id)
    }

    async fn check_status(&self, job_id: &str) -> Result<GeneratedVideo> {
        let url = self.resource("status", job_id);
        debug!("Checking job status at {}", url);

        let response = self.client.get(&url).send().await?;
        let envelope: ApiResponse<GeneratedVideo> = Self::read_envelope(response).await?;
        envelope.into_data()
    }

    async fn history(&self) -> Result<Vec<GeneratedVideo>> {
        let url = self.endpoint("history");
        debug!("Fetching history from {}", url);

        let response = self.client.get(&url).send().await?;
        let envelope: ApiResponse<Vec<GeneratedVideo>> = Self::read_envelope(response).await?;
        envelope.into_data()
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        let url = self.resource("video", video_id);
        debug!("Deleting video at {}", url);

        let response = self.client.delete(&url).send().await?;
        let envelope: ApiResponse<()> = Self::read_envelope(response).await?;
        envelope.into_unit()
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
