//! Backend contract for the video generation service
//!
//! The service accepts generation requests, reports job status and keeps the
//! history of generated videos. `HttpBackend` talks to the real service;
//! `MockBackend` fabricates responses and is only used when mock mode is
//! switched on explicitly.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::config::BackendConfig;
use crate::error::Result;
use crate::models::{GeneratedVideo, GenerationRequest, JobId};

pub use http::{build_client, HttpBackend};
pub use mock::MockBackend;

/// Operations offered by the generation backend
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Submit a generation request and return the new job id
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId>;

    /// Current state of a job
    async fn check_status(&self, job_id: &str) -> Result<GeneratedVideo>;

    /// Previously generated videos, in backend order
    async fn history(&self) -> Result<Vec<GeneratedVideo>>;

    /// Remove a video from the backend
    async fn delete_video(&self, video_id: &str) -> Result<()>;

    /// Short name used in log lines
    fn name(&self) -> &'static str;
}

/// Create the backend selected by configuration
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn VideoBackend>> {
    if config.mock_mode {
        warn!("🧪 Mock mode enabled: responses are fabricated, nothing is sent to {}", config.base_url);
        return Ok(Arc::new(MockBackend::new()));
    }
    Ok(Arc::new(HttpBackend::new(config.clone())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_respects_mock_flag() {
        let mut config = BackendConfig::default();
        assert_eq!(create_backend(&config).unwrap().name(), "http");

        config.mock_mode = true;
        assert_eq!(create_backend(&config).unwrap().name(), "mock");
    }
}
