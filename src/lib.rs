/// Video Generation Client
///
/// Submits text-to-video jobs to a generation backend, follows them to
/// completion with a simulated progress indicator, and manages the history
/// of generated videos.

pub mod api;
pub mod config;
pub mod display;
pub mod download;
pub mod error;
pub mod generation;
pub mod models;
pub mod shell;
pub mod views;

// Re-export main types for easy access
pub use crate::api::{build_client, create_backend, HttpBackend, MockBackend, VideoBackend};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Result, ValidationError, VideoGenError};
pub use crate::generation::{
    submit_generation, GenerationOutcome, GenerationWorkflow, WorkflowHandle, WorkflowState,
};
pub use crate::models::{AspectRatio, GeneratedVideo, GenerationRequest, Resolution, VideoStatus};
pub use crate::shell::{App, ActiveView};
pub use crate::views::{GenerateView, HistoryView};
