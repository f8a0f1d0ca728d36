/// Result type for video generation client operations
pub type Result<T> = std::result::Result<T, VideoGenError>;

/// Maximum prompt length accepted by the generation form
pub const MAX_PROMPT_CHARS: usize = 2000;

/// Supported clip durations in seconds
pub const MIN_DURATION_SECS: u32 = 5;
pub const MAX_DURATION_SECS: u32 = 12;

/// Problems with user input, reported before any network call is made
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a video description")]
    EmptyPrompt,

    #[error("Video description is too long ({len}/{max} characters)")]
    PromptTooLong { len: usize, max: usize },

    #[error("Duration must be between {min} and {max} seconds (got {duration})")]
    DurationOutOfRange { duration: u32, min: u32, max: u32 },

    #[error("Unknown {field}: {value}")]
    UnknownOption { field: &'static str, value: String },
}

/// Error types for the video generation client
#[derive(thiserror::Error, Debug)]
pub enum VideoGenError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Job {job_id} failed on the backend")]
    JobFailed { job_id: String },

    #[error("Timed out after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Video {0} is not ready for download")]
    NotReady(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VideoGenError {
    /// Network failure, non-2xx status, or an envelope the client could not use
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Backend(_) | Self::Malformed(_)
        )
    }

    /// Message shown to the user in place of the raw error
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Timeout { .. } => "Video generation timed out. Please try again.".to_string(),
            Self::JobFailed { .. } => "Video generation failed on the server. Please try again.".to_string(),
            Self::Cancelled => "Video generation was cancelled.".to_string(),
            Self::NotReady(_) | Self::Config(_) => self.to_string(),
            _ => "Failed to generate video. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::EmptyPrompt.to_string(),
            "Please enter a video description"
        );
        let err = ValidationError::DurationOutOfRange { duration: 3, min: 5, max: 12 };
        assert_eq!(err.to_string(), "Duration must be between 5 and 12 seconds (got 3)");
    }

    #[test]
    fn test_user_messages() {
        let timeout = VideoGenError::Timeout { attempts: 150 };
        assert_eq!(timeout.user_message(), "Video generation timed out. Please try again.");
        assert!(!timeout.is_transport());

        let backend = VideoGenError::Backend("Job not found".to_string());
        assert!(backend.is_transport());
        assert_eq!(backend.user_message(), "Failed to generate video. Please try again.");

        let validation: VideoGenError = ValidationError::EmptyPrompt.into();
        assert_eq!(validation.user_message(), "Please enter a video description");
    }
}
