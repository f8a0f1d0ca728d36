use tracing::info;

use crate::display::{describe, progress_bar};
use crate::error::{ValidationError, MAX_PROMPT_CHARS};
use crate::generation::{GenerationOutcome, GenerationWorkflow, WorkflowHandle, WorkflowState};
use crate::models::{AspectRatio, GeneratedVideo, GenerationRequest, Resolution};

/// State of the generation form
///
/// Owns at most one live workflow. Starting a new generation cancels the
/// previous one first.
pub struct GenerateView {
    workflow: GenerationWorkflow,
    form: GenerationRequest,
    current: Option<WorkflowHandle>,
    result: Option<GeneratedVideo>,
    error: Option<String>,
}

impl GenerateView {
    pub fn new(workflow: GenerationWorkflow, form: GenerationRequest) -> Self {
        Self {
            workflow,
            form,
            current: None,
            result: None,
            error: None,
        }
    }

    pub fn form(&self) -> &GenerationRequest {
        &self.form
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.form.prompt = prompt.into();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.form.aspect_ratio = aspect_ratio;
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.form.resolution = resolution;
    }

    pub fn set_background_music(&mut self, enabled: bool) {
        self.form.background_music = enabled;
    }

    pub fn set_duration(&mut self, duration: u32) -> Result<(), ValidationError> {
        crate::models::validate_duration(duration)?;
        self.form.duration = duration;
        Ok(())
    }

    /// "42/2000 characters"
    pub fn prompt_counter(&self) -> String {
        format!("{}/{} characters", self.form.prompt.chars().count(), MAX_PROMPT_CHARS)
    }

    pub fn can_generate(&self) -> bool {
        !self.is_generating() && !self.form.prompt.trim().is_empty()
    }

    /// Validate the form and start a new workflow
    pub fn generate(&mut self) -> Result<(), ValidationError> {
        self.error = None;

        if let Err(e) = self.form.validate() {
            self.error = Some(e.to_string());
            return Err(e);
        }

        if let Some(previous) = self.current.take() {
            if previous.state().is_active() {
                info!("🛑 Cancelling previous generation before starting a new one");
            }
            previous.cancel();
        }

        let handle = self.workflow.start(self.form.clone())?;
        self.result = None;
        self.current = Some(handle);
        Ok(())
    }

    pub fn current(&self) -> Option<&WorkflowHandle> {
        self.current.as_ref()
    }

    pub fn state(&self) -> WorkflowState {
        self.current.as_ref().map_or(WorkflowState::Idle, |h| h.state())
    }

    pub fn is_generating(&self) -> bool {
        self.current.as_ref().map_or(false, |h| h.state().is_active())
    }

    pub fn progress(&self) -> Option<f64> {
        self.current.as_ref().map(|h| h.progress())
    }

    /// Cancel the running generation, if any
    pub fn cancel(&mut self) -> bool {
        match &self.current {
            Some(handle) if handle.state().is_active() => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for the current workflow and record its result
    pub async fn wait(&mut self) -> WorkflowState {
        let Some(handle) = self.current.take() else {
            return WorkflowState::Idle;
        };

        let outcome = handle.wait().await;
        let state = outcome.state();
        self.record(outcome);
        state
    }

    /// Collect a workflow that finished in the background
    pub async fn sync(&mut self) {
        if self.current.as_ref().map_or(false, |h| h.is_finished()) {
            self.wait().await;
        }
    }

    fn record(&mut self, outcome: GenerationOutcome) {
        match outcome.into_result() {
            Ok(video) => {
                self.result = Some(video);
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e.user_message());
            }
        }
    }

    pub fn result(&self) -> Option<&GeneratedVideo> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Text to Video AI\n");
        out.push_str(&format!(
            "Video Description: {}\n  {}\n",
            if self.form.prompt.is_empty() { "(empty)" } else { self.form.prompt.as_str() },
            self.prompt_counter()
        ));
        out.push_str(&format!(
            "Options: {} • {} • {}s (24 fps)\n",
            self.form.aspect_ratio.label(),
            self.form.resolution.label(),
            self.form.duration
        ));

        match self.state() {
            WorkflowState::Submitting => out.push_str("Submitting request...\n"),
            WorkflowState::Polling { job_id } => {
                out.push_str(&format!(
                    "Generating video (job {})... {}\n",
                    job_id,
                    progress_bar(self.progress().unwrap_or(0.0), 20)
                ));
            }
            _ => {}
        }

        if let Some(error) = &self.error {
            out.push_str(&format!("⚠ {}\n", error));
        }

        if let Some(video) = &self.result {
            out.push_str(&format!(
                "Generated Video\n  {}\n  {}\n  {}\n",
                video.prompt,
                describe(video),
                video.video_url
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::config::PollingConfig;
    use std::sync::Arc;

    fn view(backend: Arc<MockBackend>) -> GenerateView {
        let polling = PollingConfig {
            interval_ms: 1,
            progress_tick_ms: 1,
            max_attempts: 20,
            ..PollingConfig::default()
        };
        GenerateView::new(GenerationWorkflow::new(backend, polling), GenerationRequest::default())
    }

    #[tokio::test]
    async fn test_empty_prompt_sets_inline_error() {
        let backend = Arc::new(MockBackend::new());
        let mut view = view(backend.clone());

        assert!(!view.can_generate());
        assert_eq!(view.generate(), Err(ValidationError::EmptyPrompt));
        assert_eq!(view.error(), Some("Please enter a video description"));
        assert_eq!(view.state(), WorkflowState::Idle);
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_records_result() {
        let backend = Arc::new(MockBackend::new().with_pending_polls(2));
        let mut view = view(backend);
        view.set_prompt("A cat playing in a garden");
        view.set_duration(8).unwrap();

        view.generate().unwrap();
        let state = view.wait().await;

        assert!(matches!(state, WorkflowState::Completed(_)));
        let video = view.result().unwrap();
        assert_eq!(video.prompt, "A cat playing in a garden");
        assert!(view.error().is_none());
        assert!(view.render().contains("Generated Video"));
    }

    #[tokio::test]
    async fn test_timeout_message() {
        let backend = Arc::new(MockBackend::new().never_completing());
        let mut view = view(backend);
        view.set_prompt("A cat");

        view.generate().unwrap();
        assert_eq!(view.wait().await, WorkflowState::TimedOut);
        assert_eq!(view.error(), Some("Video generation timed out. Please try again."));
        assert!(view.result().is_none());
    }

    #[tokio::test]
    async fn test_new_generation_replaces_previous() {
        let backend = Arc::new(MockBackend::new().never_completing());
        let mut view = view(backend);
        view.set_prompt("First");
        view.generate().unwrap();
        let first_state = view.current().unwrap().subscribe_state();

        view.set_prompt("Second");
        view.generate().unwrap();
        assert_eq!(view.current().unwrap().request().prompt, "Second");

        let mut first_state = first_state;
        while !first_state.borrow_and_update().is_terminal() {
            if first_state.changed().await.is_err() {
                break;
            }
        }
        assert_eq!(*first_state.borrow(), WorkflowState::Cancelled);
        assert!(view.cancel());
    }

    #[test]
    fn test_duration_setter_validates() {
        let mut view = view(Arc::new(MockBackend::new()));

        assert!(view.set_duration(13).is_err());
        assert_eq!(view.form().duration, 8);
        assert!(view.set_duration(12).is_ok());
        assert_eq!(view.prompt_counter(), "0/2000 characters");
    }
}
