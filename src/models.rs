use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{
    Result, ValidationError, VideoGenError, MAX_DURATION_SECS, MAX_PROMPT_CHARS, MIN_DURATION_SECS,
};

/// Opaque job identifier assigned by the backend at submission time
pub type JobId = String;

/// Output aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 3] = [Self::Landscape, Self::Portrait, Self::Square];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }

    /// Label used in option listings
    pub fn label(&self) -> &'static str {
        match self {
            Self::Landscape => "16:9 (Landscape)",
            Self::Portrait => "9:16 (Portrait)",
            Self::Square => "1:1 (Square)",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "16:9" | "landscape" => Ok(Self::Landscape),
            "9:16" | "portrait" => Ok(Self::Portrait),
            "1:1" | "square" => Ok(Self::Square),
            other => Err(ValidationError::UnknownOption {
                field: "aspect ratio",
                value: other.to_string(),
            }),
        }
    }
}

/// Output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[serde(rename = "480p")]
    Sd480,
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Self::Sd480, Self::Hd720, Self::FullHd1080];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sd480 => "480p",
            Self::Hd720 => "720p",
            Self::FullHd1080 => "1080p",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sd480 => "480p",
            Self::Hd720 => "720p (HD)",
            Self::FullHd1080 => "1080p (Full HD)",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "480p" | "480" => Ok(Self::Sd480),
            "720p" | "720" => Ok(Self::Hd720),
            "1080p" | "1080" => Ok(Self::FullHd1080),
            other => Err(ValidationError::UnknownOption {
                field: "resolution",
                value: other.to_string(),
            }),
        }
    }
}

/// Parameters for a single generation submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub duration: u32,
    /// Sent to the backend but not exposed as an option yet
    pub background_music: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            duration: 8,
            background_music: false,
        }
    }
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Check the request before anything is sent
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }

        let len = self.prompt.chars().count();
        if len > MAX_PROMPT_CHARS {
            return Err(ValidationError::PromptTooLong { len, max: MAX_PROMPT_CHARS });
        }

        validate_duration(self.duration)
    }
}

pub fn validate_duration(duration: u32) -> std::result::Result<(), ValidationError> {
    if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
        return Err(ValidationError::DurationOutOfRange {
            duration,
            min: MIN_DURATION_SECS,
            max: MAX_DURATION_SECS,
        });
    }
    Ok(())
}

/// Job status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    #[serde(alias = "pending", alias = "queued", alias = "running")]
    Generating,
    #[serde(alias = "succeeded")]
    Completed,
    #[serde(alias = "error", alias = "cancelled")]
    Failed,
    #[serde(other)]
    #[default]
    Unknown,
}

/// A generated video, either the terminal state of a job or a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVideo {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    /// ISO-8601 text as produced by the backend (often without an offset)
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl GeneratedVideo {
    /// Finished and playable
    pub fn is_ready(&self) -> bool {
        self.status == VideoStatus::Completed && !self.video_url.trim().is_empty()
    }
}

/// Payload of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCreated {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
}

/// Envelope shared by every backend response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }

    /// Unwrap the envelope, requiring a payload
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(VideoGenError::Backend(
                self.error.unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| VideoGenError::Malformed("response is missing data".to_string()))
    }

    /// Unwrap an envelope that carries no payload
    pub fn into_unit(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(VideoGenError::Backend(
                self.error.unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerationRequest::new("A cat playing in a garden")
            .with_duration(8)
            .with_resolution(Resolution::Hd720);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["prompt"], "A cat playing in a garden");
        assert_eq!(json["aspectRatio"], "16:9");
        assert_eq!(json["resolution"], "720p");
        assert_eq!(json["duration"], 8);
        assert_eq!(json["backgroundMusic"], false);
    }

    #[test]
    fn test_validation() {
        assert_eq!(GenerationRequest::new("").validate(), Err(ValidationError::EmptyPrompt));
        assert_eq!(GenerationRequest::new("   \n\t").validate(), Err(ValidationError::EmptyPrompt));
        assert!(GenerationRequest::new("A cat").validate().is_ok());

        let long = GenerationRequest::new("x".repeat(MAX_PROMPT_CHARS + 1));
        assert!(matches!(long.validate(), Err(ValidationError::PromptTooLong { .. })));
        assert!(GenerationRequest::new("é".repeat(MAX_PROMPT_CHARS)).validate().is_ok());

        for duration in [4, 13, 0] {
            let request = GenerationRequest::new("A cat").with_duration(duration);
            assert!(matches!(
                request.validate(),
                Err(ValidationError::DurationOutOfRange { .. })
            ));
        }
        for duration in 5..=12 {
            assert!(GenerationRequest::new("A cat").with_duration(duration).validate().is_ok());
        }
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("9:16".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert_eq!("Square".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        assert_eq!("1080".parse::<Resolution>().unwrap(), Resolution::FullHd1080);
        assert!("4k".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_status_spellings() {
        let parse = |s: &str| serde_json::from_value::<VideoStatus>(serde_json::json!(s)).unwrap();
        assert_eq!(parse("completed"), VideoStatus::Completed);
        assert_eq!(parse("succeeded"), VideoStatus::Completed);
        assert_eq!(parse("generating"), VideoStatus::Generating);
        assert_eq!(parse("running"), VideoStatus::Generating);
        assert_eq!(parse("failed"), VideoStatus::Failed);
        assert_eq!(parse("something-new"), VideoStatus::Unknown);

        let video: GeneratedVideo = serde_json::from_value(serde_json::json!({ "id": "9" })).unwrap();
        assert_eq!(video.status, VideoStatus::Unknown);
        assert!(!video.is_ready());
    }

    #[test]
    fn test_video_from_backend_payload() {
        let payload = serde_json::json!({
            "success": true,
            "data": {
                "id": "cgt-2024",
                "prompt": "Ocean waves",
                "videoUrl": "",
                "thumbnailUrl": "",
                "createdAt": "2024-05-01T10:15:30.123456",
                "duration": 10,
                "aspectRatio": "9:16",
                "resolution": "720p",
                "status": "generating"
            }
        });
        let response: ApiResponse<GeneratedVideo> = serde_json::from_value(payload).unwrap();
        let video = response.into_data().unwrap();

        assert_eq!(video.id, "cgt-2024");
        assert_eq!(video.status, VideoStatus::Generating);
        assert!(!video.is_ready());
    }

    #[test]
    fn test_envelope_errors() {
        let failed: ApiResponse<JobCreated> =
            serde_json::from_str(r#"{"success": false, "error": "Ark API key not configured."}"#).unwrap();
        match failed.into_data() {
            Err(VideoGenError::Backend(msg)) => assert_eq!(msg, "Ark API key not configured."),
            other => panic!("unexpected: {:?}", other),
        }

        let empty: ApiResponse<JobCreated> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(empty.into_data(), Err(VideoGenError::Malformed(_))));

        let deleted: ApiResponse<()> = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(deleted.into_unit().is_ok());
    }
}
