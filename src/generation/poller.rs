use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::GenerationOutcome;
use crate::api::VideoBackend;
use crate::config::PollingConfig;
use crate::error::VideoGenError;
use crate::models::VideoStatus;

/// Spacing and budget of the status poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Poll a job until it completes, fails, runs out of attempts or is cancelled
///
/// Checks are strictly sequential: the first one is issued immediately and
/// each following one `interval` after the previous result arrived. A check
/// that errors still uses up an attempt. No check is made after the last
/// attempt.
pub async fn poll_job(
    backend: &dyn VideoBackend,
    job_id: &str,
    settings: &PollSettings,
    cancel: &CancellationToken,
) -> GenerationOutcome {
    for attempt in 1..=settings.max_attempts {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return GenerationOutcome::Cancelled,
            result = backend.check_status(job_id) => result,
        };

        match result {
            Ok(video) if video.is_ready() => {
                info!("✅ Job {} completed after {} status checks", job_id, attempt);
                return GenerationOutcome::Completed(video);
            }
            Ok(video) if video.status == VideoStatus::Failed => {
                warn!("❌ Job {} reported failure by the backend", job_id);
                return GenerationOutcome::Failed(VideoGenError::JobFailed {
                    job_id: job_id.to_string(),
                });
            }
            Ok(video) if video.status == VideoStatus::Completed => {
                debug!("Job {} reports completion without a video URL yet", job_id);
            }
            Ok(video) => {
                debug!(
                    "Job {} still {:?} (check {}/{})",
                    job_id, video.status, attempt, settings.max_attempts
                );
            }
            Err(e) => {
                warn!(
                    "Status check {}/{} for job {} failed: {}",
                    attempt, settings.max_attempts, job_id, e
                );
            }
        }

        if attempt < settings.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return GenerationOutcome::Cancelled,
                _ = tokio::time::sleep(settings.interval) => {}
            }
        }
    }

    warn!(
        "⏰ Job {} timed out after {} status checks",
        job_id, settings.max_attempts
    );
    GenerationOutcome::TimedOut {
        attempts: settings.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockBackend, MockStatus};

    fn fast(max_attempts: u32) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_completes_after_pending_checks() {
        let backend = MockBackend::new().with_pending_polls(4);
        let outcome = poll_job(&backend, "job_1", &fast(10), &CancellationToken::new()).await;

        assert!(outcome.is_completed());
        assert_eq!(backend.status_calls(), 5);
    }

    #[tokio::test]
    async fn test_completion_requires_video_url() {
        let backend = MockBackend::new().with_status_script([
            MockStatus::CompletedWithoutUrl,
            MockStatus::CompletedWithoutUrl,
            MockStatus::Completed,
        ]);
        let outcome = poll_job(&backend, "job_1", &fast(10), &CancellationToken::new()).await;

        match outcome {
            GenerationOutcome::Completed(video) => assert!(!video.video_url.is_empty()),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_times_out_after_exact_budget() {
        let backend = MockBackend::new().never_completing();
        let outcome = poll_job(&backend, "job_1", &fast(7), &CancellationToken::new()).await;

        assert!(matches!(outcome, GenerationOutcome::TimedOut { attempts: 7 }));
        assert_eq!(backend.status_calls(), 7);
    }

    #[tokio::test]
    async fn test_errors_count_against_budget() {
        let backend = MockBackend::new()
            .with_status_script([MockStatus::Unavailable, MockStatus::Unavailable, MockStatus::Generating])
            .never_completing();
        let outcome = poll_job(&backend, "job_1", &fast(3), &CancellationToken::new()).await;

        assert!(matches!(outcome, GenerationOutcome::TimedOut { attempts: 3 }));
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_polling() {
        let backend = MockBackend::new()
            .with_status_script([MockStatus::Unavailable, MockStatus::Generating, MockStatus::Completed]);
        let outcome = poll_job(&backend, "job_1", &fast(5), &CancellationToken::new()).await;

        assert!(outcome.is_completed());
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_backend_reported_failure() {
        let backend = MockBackend::new().with_status_script([MockStatus::Generating, MockStatus::Failed]);
        let outcome = poll_job(&backend, "job_9", &fast(5), &CancellationToken::new()).await;

        match outcome {
            GenerationOutcome::Failed(VideoGenError::JobFailed { job_id }) => assert_eq!(job_id, "job_9"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(backend.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_check() {
        let backend = MockBackend::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poll_job(&backend, "job_1", &fast(5), &cancel).await;
        assert!(matches!(outcome, GenerationOutcome::Cancelled));
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_budget_spacing() {
        let backend = MockBackend::new().never_completing();
        let started = tokio::time::Instant::now();
        let outcome = poll_job(&backend, "job_1", &PollSettings::default(), &CancellationToken::new()).await;

        assert!(matches!(outcome, GenerationOutcome::TimedOut { attempts: 150 }));
        assert_eq!(backend.status_calls(), 150);
        // 149 waits of 5s between 150 checks
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(149 * 5));
        assert!(elapsed < Duration::from_secs(150 * 5));
    }
}
