use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::poller::{poll_job, PollSettings};
use super::progress::{spawn_progress, ProgressSimulator};
use super::{submit_generation, GenerationOutcome, WorkflowState};
use crate::api::VideoBackend;
use crate::config::PollingConfig;
use crate::error::ValidationError;
use crate::models::GenerationRequest;

/// Starts generation workflows against one backend
#[derive(Clone)]
pub struct GenerationWorkflow {
    backend: Arc<dyn VideoBackend>,
    polling: PollingConfig,
}

impl GenerationWorkflow {
    pub fn new(backend: Arc<dyn VideoBackend>, polling: PollingConfig) -> Self {
        Self { backend, polling }
    }

    /// Validate and launch a workflow in the background
    ///
    /// Invalid requests are rejected here, before a task is spawned or any
    /// request is sent. Must be called inside a Tokio runtime.
    pub fn start(&self, request: GenerationRequest) -> Result<WorkflowHandle, ValidationError> {
        request.validate()?;

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(WorkflowState::Submitting);
        let (progress_tx, progress_rx) = watch::channel(0.0);

        let task = tokio::spawn(run_workflow(
            Arc::clone(&self.backend),
            request.clone(),
            self.polling.clone(),
            cancel.clone(),
            state_tx,
            progress_tx,
        ));

        Ok(WorkflowHandle {
            request,
            cancel,
            state: state_rx,
            progress: progress_rx,
            task: Some(task),
        })
    }
}

/// Handle to one running generation
///
/// Dropping the handle cancels the workflow, so its timers never outlive it.
#[derive(Debug)]
pub struct WorkflowHandle {
    request: GenerationRequest,
    cancel: CancellationToken,
    state: watch::Receiver<WorkflowState>,
    progress: watch::Receiver<f64>,
    task: Option<JoinHandle<GenerationOutcome>>,
}

impl WorkflowHandle {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Stop polling and the progress timer
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// Current cosmetic progress in percent
    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WorkflowState> {
        self.state.clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the terminal outcome
    pub async fn wait(mut self) -> GenerationOutcome {
        let Some(task) = self.task.take() else {
            return GenerationOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => GenerationOutcome::Cancelled,
        }
    }
}

impl Drop for WorkflowHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_workflow(
    backend: Arc<dyn VideoBackend>,
    request: GenerationRequest,
    polling: PollingConfig,
    cancel: CancellationToken,
    state: watch::Sender<WorkflowState>,
    progress: watch::Sender<f64>,
) -> GenerationOutcome {
    let submitted = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = submit_generation(backend.as_ref(), &request) => Some(result),
    };

    let job_id = match submitted {
        None => return finish(&state, GenerationOutcome::Cancelled),
        Some(Err(e)) => {
            error!("❌ Failed to start generation: {}", e);
            return finish(&state, GenerationOutcome::Failed(e));
        }
        Some(Ok(job_id)) => job_id,
    };

    state.send_replace(WorkflowState::Polling { job_id: job_id.clone() });

    let progress_cancel = cancel.child_token();
    let progress_task = spawn_progress(
        ProgressSimulator::from_config(&polling),
        polling.progress_tick(),
        progress,
        progress_cancel.clone(),
    );

    let outcome = poll_job(backend.as_ref(), &job_id, &PollSettings::from(&polling), &cancel).await;

    // Stop the progress timer before publishing the final value
    progress_cancel.cancel();
    match progress_task.await {
        Ok((mut simulator, progress)) if outcome.is_completed() => {
            progress.send_replace(simulator.complete());
        }
        Ok(_) => {}
        Err(e) => warn!("Progress timer for job {} ended abnormally: {}", job_id, e),
    }

    match &outcome {
        GenerationOutcome::Completed(video) => info!("🎉 Video ready: {}", video.video_url),
        GenerationOutcome::Failed(e) => error!("❌ Job {} failed: {}", job_id, e),
        GenerationOutcome::TimedOut { attempts } => {
            error!("⏰ Job {} did not finish after {} checks", job_id, attempts)
        }
        GenerationOutcome::Cancelled => info!("🛑 Job {} polling cancelled", job_id),
    }

    finish(&state, outcome)
}

fn finish(state: &watch::Sender<WorkflowState>, outcome: GenerationOutcome) -> GenerationOutcome {
    state.send_replace(outcome.state());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::error::VideoGenError;
    use std::time::Duration;

    fn fast_polling(max_attempts: u32) -> PollingConfig {
        PollingConfig {
            interval_ms: 1,
            max_attempts,
            progress_tick_ms: 1,
            ..PollingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_validation_rejects_before_spawn() {
        let backend = Arc::new(MockBackend::new());
        let workflow = GenerationWorkflow::new(backend.clone(), fast_polling(5));

        let result = workflow.start(GenerationRequest::new("  "));
        assert!(matches!(result, Err(ValidationError::EmptyPrompt)));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_completed_forces_full_progress() {
        let backend = Arc::new(MockBackend::new().with_pending_polls(3));
        let workflow = GenerationWorkflow::new(backend.clone(), fast_polling(10));

        let handle = workflow.start(GenerationRequest::new("A cat playing in a garden")).unwrap();
        let progress = handle.subscribe_progress();
        let state = handle.subscribe_state();
        let outcome = handle.wait().await;

        let video = outcome.into_result().unwrap();
        assert_eq!(video.prompt, "A cat playing in a garden");
        assert_eq!(*progress.borrow(), 100.0);
        assert!(matches!(*state.borrow(), WorkflowState::Completed(_)));
        assert_eq!(backend.submit_calls(), 1);
        assert_eq!(backend.status_calls(), 4);
    }

    #[tokio::test]
    async fn test_submission_failure_never_polls() {
        let backend = Arc::new(MockBackend::new().failing_submissions("quota exceeded"));
        let workflow = GenerationWorkflow::new(backend.clone(), fast_polling(10));

        let handle = workflow.start(GenerationRequest::new("A cat")).unwrap();
        let state = handle.subscribe_state();
        let progress = handle.subscribe_progress();
        let outcome = handle.wait().await;

        assert!(matches!(outcome, GenerationOutcome::Failed(VideoGenError::Backend(_))));
        assert!(matches!(*state.borrow(), WorkflowState::Failed(_)));
        assert_eq!(*progress.borrow(), 0.0);
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_progress_below_cap() {
        let backend = Arc::new(MockBackend::new().never_completing());
        let workflow = GenerationWorkflow::new(backend.clone(), PollingConfig::default());

        let handle = workflow.start(GenerationRequest::new("A cat")).unwrap();
        let mut progress = handle.subscribe_progress();
        let state = handle.subscribe_state();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while progress.changed().await.is_ok() {
                seen.push(*progress.borrow_and_update());
            }
            seen
        });

        let outcome = handle.wait().await;
        assert!(matches!(outcome, GenerationOutcome::TimedOut { attempts: 150 }));
        assert_eq!(*state.borrow(), WorkflowState::TimedOut);
        assert_eq!(backend.status_calls(), 150);

        let seen = watcher.await.unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.iter().all(|v| *v <= 95.0));
    }

    #[tokio::test]
    async fn test_cancel_stops_polling() {
        let backend = Arc::new(MockBackend::new().never_completing());
        let polling = PollingConfig {
            interval_ms: 50,
            progress_tick_ms: 50,
            ..PollingConfig::default()
        };
        let workflow = GenerationWorkflow::new(backend.clone(), polling);

        let handle = workflow.start(GenerationRequest::new("A cat")).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.cancel();
        let outcome = handle.wait().await;

        assert!(matches!(outcome, GenerationOutcome::Cancelled));
        let calls = backend.status_calls();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.status_calls(), calls);
    }

    #[tokio::test]
    async fn test_dropping_handle_cancels_workflow() {
        let backend = Arc::new(MockBackend::new().never_completing());
        let workflow = GenerationWorkflow::new(backend.clone(), fast_polling(1_000_000));

        let handle = workflow.start(GenerationRequest::new("A cat")).unwrap();
        let state = handle.subscribe_state();
        drop(handle);

        let mut state = state;
        while !state.borrow_and_update().is_terminal() {
            if state.changed().await.is_err() {
                break;
            }
        }
        assert_eq!(*state.borrow(), WorkflowState::Cancelled);
    }
}
