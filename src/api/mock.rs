use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

use super::VideoBackend;
use crate::error::{Result, VideoGenError};
use crate::models::{GeneratedVideo, GenerationRequest, JobId, VideoStatus};

const SAMPLE_VIDEO_URL: &str = "https://sample-videos.com/zip/10/mp4/SampleVideo_1280x720_1mb.mp4";

/// Scripted answer for one status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStatus {
    Generating,
    Completed,
    /// Reports completion but has no video URL yet
    CompletedWithoutUrl,
    Failed,
    /// The check fails at the transport level
    Unavailable,
}

#[derive(Debug, Default)]
struct MockState {
    job_counter: u64,
    jobs: HashMap<JobId, GenerationRequest>,
    status_script: VecDeque<MockStatus>,
    history: Vec<GeneratedVideo>,
}

#[derive(Debug, Default)]
struct CallCounts {
    submit: AtomicUsize,
    status: AtomicUsize,
    history: AtomicUsize,
    delete: AtomicUsize,
}

/// In-memory backend with fabricated data
///
/// Used for mock mode and as a scripted backend in tests. By default every
/// submitted job completes on its first status check.
#[derive(Debug)]
pub struct MockBackend {
    state: Mutex<MockState>,
    calls: CallCounts,
    never_complete: bool,
    submit_error: Option<String>,
    history_unavailable: bool,
    delete_unavailable: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                history: sample_history(),
                ..MockState::default()
            }),
            calls: CallCounts::default(),
            never_complete: false,
            submit_error: None,
            history_unavailable: false,
            delete_unavailable: false,
        }
    }

    /// Replace the stored history
    pub fn with_history(self, videos: Vec<GeneratedVideo>) -> Self {
        self.lock().history = videos;
        self
    }

    /// Answers for the next status checks, consumed in order
    pub fn with_status_script(self, script: impl IntoIterator<Item = MockStatus>) -> Self {
        self.lock().status_script = script.into_iter().collect();
        self
    }

    /// Report `generating` for the first `count` checks, then complete
    pub fn with_pending_polls(self, count: usize) -> Self {
        self.with_status_script(std::iter::repeat(MockStatus::Generating).take(count))
    }

    /// Jobs stay in `generating` once the script is exhausted
    pub fn never_completing(mut self) -> Self {
        self.never_complete = true;
        self
    }

    pub fn failing_submissions(mut self, message: impl Into<String>) -> Self {
        self.submit_error = Some(message.into());
        self
    }

    pub fn unavailable_history(mut self) -> Self {
        self.history_unavailable = true;
        self
    }

    pub fn unavailable_deletes(mut self) -> Self {
        self.delete_unavailable = true;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.calls.submit.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.calls.status.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.calls.history.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    /// Every call made against this backend
    pub fn total_calls(&self) -> usize {
        self.submit_calls() + self.status_calls() + self.history_calls() + self.delete_calls()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens in a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn unavailable() -> VideoGenError {
    VideoGenError::Status {
        status: 503,
        body: "mock backend unavailable".to_string(),
    }
}

fn job_video(job_id: &str, request: Option<&GenerationRequest>, status: VideoStatus, with_url: bool) -> GeneratedVideo {
    let default_request = GenerationRequest::new("A cat playing in a garden");
    let request = request.unwrap_or(&default_request);
    GeneratedVideo {
        id: job_id.to_string(),
        prompt: request.prompt.clone(),
        video_url: if with_url { SAMPLE_VIDEO_URL.to_string() } else { String::new() },
        thumbnail_url: String::new(),
        created_at: chrono::Utc::now().to_rfc3339(),
        duration: request.duration,
        aspect_ratio: request.aspect_ratio.to_string(),
        resolution: request.resolution.to_string(),
        status,
        progress: None,
    }
}

/// Canned history entries shown in mock mode
pub fn sample_history() -> Vec<GeneratedVideo> {
    let now = chrono::Utc::now();
    let entry = |id: &str, prompt: &str, days: i64, duration: u32, ratio: &str, resolution: &str, photo: u32| {
        GeneratedVideo {
            id: id.to_string(),
            prompt: prompt.to_string(),
            video_url: SAMPLE_VIDEO_URL.to_string(),
            thumbnail_url: format!(
                "https://images.pexels.com/photos/{photo}/pexels-photo-{photo}.jpeg?auto=compress&cs=tinysrgb&w=300"
            ),
            created_at: (now - chrono::Duration::days(days)).to_rfc3339(),
            duration,
            aspect_ratio: ratio.to_string(),
            resolution: resolution.to_string(),
            status: VideoStatus::Completed,
            progress: None,
        }
    };

    vec![
        entry("1", "A majestic eagle soaring through mountain peaks at sunset", 1, 10, "16:9", "1080p", 1624496),
        entry("2", "Ocean waves crashing against rocky cliffs during a storm", 2, 12, "9:16", "720p", 1367192),
        entry("3", "A bustling cyberpunk city street at night with neon lights", 3, 12, "16:9", "1080p", 2116475),
    ]
}

#[async_trait]
impl VideoBackend for MockBackend {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.submit_error {
            return Err(VideoGenError::Backend(message.clone()));
        }

        let mut state = self.lock();
        state.job_counter += 1;
        let job_id = format!("job_{}_{}", chrono::Utc::now().timestamp_millis(), state.job_counter);
        state.jobs.insert(job_id.clone(), request.clone());
        debug!("Mock backend accepted job {}", job_id);
        Ok(job_id)
    }

    async fn check_status(&self, job_id: &str) -> Result<GeneratedVideo> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);

        let mut state = self.lock();
        let scripted = state.status_script.pop_front();
        let next = match scripted {
            Some(status) => status,
            None if self.never_complete => MockStatus::Generating,
            None => MockStatus::Completed,
        };

        let request = state.jobs.get(job_id).cloned();
        let video = match next {
            MockStatus::Unavailable => return Err(unavailable()),
            MockStatus::Generating => job_video(job_id, request.as_ref(), VideoStatus::Generating, false),
            MockStatus::CompletedWithoutUrl => job_video(job_id, request.as_ref(), VideoStatus::Completed, false),
            MockStatus::Failed => job_video(job_id, request.as_ref(), VideoStatus::Failed, false),
            MockStatus::Completed => {
                let video = job_video(job_id, request.as_ref(), VideoStatus::Completed, true);
                if !state.history.iter().any(|v| v.id == video.id) {
                    state.history.insert(0, video.clone());
                }
                video
            }
        };
        Ok(video)
    }

    async fn history(&self) -> Result<Vec<GeneratedVideo>> {
        self.calls.history.fetch_add(1, Ordering::SeqCst);
        if self.history_unavailable {
            return Err(unavailable());
        }
        Ok(self.lock().history.clone())
    }

    async fn delete_video(&self, video_id: &str) -> Result<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        if self.delete_unavailable {
            return Err(unavailable());
        }

        let mut state = self.lock();
        let before = state.history.len();
        state.history.retain(|v| v.id != video_id);
        if state.history.len() == before {
            return Err(VideoGenError::Backend("Job not found".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_mock_completes_immediately() {
        let backend = MockBackend::new();
        let job_id = backend.submit(&GenerationRequest::new("A fox in the snow")).await.unwrap();
        assert!(job_id.starts_with("job_"));

        let video = backend.check_status(&job_id).await.unwrap();
        assert!(video.is_ready());
        assert_eq!(video.prompt, "A fox in the snow");

        let history = backend.history().await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].id, job_id);
    }

    #[tokio::test]
    async fn test_status_script_is_consumed_in_order() {
        let backend = MockBackend::new()
            .with_status_script([MockStatus::Generating, MockStatus::Unavailable])
            .never_completing();

        assert_eq!(backend.check_status("x").await.unwrap().status, VideoStatus::Generating);
        assert!(backend.check_status("x").await.is_err());
        assert_eq!(backend.check_status("x").await.unwrap().status, VideoStatus::Generating);
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_delete_unknown_video() {
        let backend = MockBackend::new();
        assert!(backend.delete_video("2").await.is_ok());
        assert!(matches!(
            backend.delete_video("2").await,
            Err(VideoGenError::Backend(_))
        ));
        assert_eq!(backend.delete_calls(), 2);
    }
}
