//! Submission and polling of generation jobs
//!
//! A generation runs as a small state machine:
//! `Idle → Submitting → Polling → {Completed, Failed, TimedOut}`.
//! The [`workflow`] supervisor drives it, owning the status poll loop and
//! the cosmetic progress timer, and cancels both on any terminal state.

pub mod poller;
pub mod progress;
pub mod workflow;

use tracing::{info, warn};

use crate::api::VideoBackend;
use crate::error::{Result, VideoGenError};
use crate::models::{GeneratedVideo, GenerationRequest, JobId};

pub use poller::{poll_job, PollSettings};
pub use progress::ProgressSimulator;
pub use workflow::{GenerationWorkflow, WorkflowHandle};

/// Observable state of a generation workflow
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    Submitting,
    Polling { job_id: JobId },
    Completed(GeneratedVideo),
    Failed(String),
    TimedOut,
    Cancelled,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::Failed(_) | Self::TimedOut | Self::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Submitting | Self::Polling { .. })
    }
}

/// How a generation ended
#[derive(Debug)]
pub enum GenerationOutcome {
    Completed(GeneratedVideo),
    Failed(VideoGenError),
    TimedOut { attempts: u32 },
    Cancelled,
}

impl GenerationOutcome {
    pub fn into_result(self) -> Result<GeneratedVideo> {
        match self {
            Self::Completed(video) => Ok(video),
            Self::Failed(e) => Err(e),
            Self::TimedOut { attempts } => Err(VideoGenError::Timeout { attempts }),
            Self::Cancelled => Err(VideoGenError::Cancelled),
        }
    }

    /// Terminal workflow state matching this outcome
    pub fn state(&self) -> WorkflowState {
        match self {
            Self::Completed(video) => WorkflowState::Completed(video.clone()),
            Self::Failed(e) => WorkflowState::Failed(e.user_message()),
            Self::TimedOut { .. } => WorkflowState::TimedOut,
            Self::Cancelled => WorkflowState::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Validate the request and send it, returning the job id
///
/// Invalid requests never reach the backend. A failed submission is not
/// retried.
pub async fn submit_generation(backend: &dyn VideoBackend, request: &GenerationRequest) -> Result<JobId> {
    request.validate()?;

    info!(
        "🎬 Submitting generation ({} • {} • {}s) to {} backend",
        request.resolution,
        request.aspect_ratio,
        request.duration,
        backend.name()
    );

    match backend.submit(request).await {
        Ok(job_id) => {
            info!("📨 Job accepted: {}", job_id);
            Ok(job_id)
        }
        Err(e) => {
            warn!("Generation request was rejected: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::error::ValidationError;

    #[tokio::test]
    async fn test_empty_prompt_makes_no_calls() {
        let backend = MockBackend::new();
        for prompt in ["", "   ", "\n\t "] {
            let err = submit_generation(&backend, &GenerationRequest::new(prompt))
                .await
                .unwrap_err();
            assert!(matches!(err, VideoGenError::Validation(ValidationError::EmptyPrompt)));
        }
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_submission_returns_job_id() {
        let backend = MockBackend::new();
        let job_id = submit_generation(&backend, &GenerationRequest::new("A cat playing in a garden"))
            .await
            .unwrap();
        assert!(!job_id.is_empty());
        assert_eq!(backend.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_submission_failure_is_not_retried() {
        let backend = MockBackend::new().failing_submissions("Ark API key not configured.");
        let err = submit_generation(&backend, &GenerationRequest::new("A cat"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(backend.submit_calls(), 1);
    }

    #[test]
    fn test_outcome_states() {
        assert_eq!(GenerationOutcome::TimedOut { attempts: 3 }.state(), WorkflowState::TimedOut);
        assert!(GenerationOutcome::Cancelled.state().is_terminal());
        assert!(!WorkflowState::Submitting.is_terminal());
        assert!(WorkflowState::Polling { job_id: "j".into() }.is_active());

        let err = GenerationOutcome::TimedOut { attempts: 150 }.into_result().unwrap_err();
        assert!(matches!(err, VideoGenError::Timeout { attempts: 150 }));
    }
}
