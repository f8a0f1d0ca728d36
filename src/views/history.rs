use tracing::{info, warn};

use crate::api::VideoBackend;
use crate::display::{describe, format_date, history_line};
use crate::error::Result;
use crate::models::GeneratedVideo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user did not confirm
    Declined,
    /// No entry with that id in the list
    NotFound,
}

/// Previously generated videos and the current preview selection
#[derive(Debug)]
pub struct HistoryView {
    videos: Vec<GeneratedVideo>,
    load_state: LoadState,
    selected: Option<String>,
    last_error: Option<String>,
}

impl Default for HistoryView {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryView {
    pub fn new() -> Self {
        Self {
            videos: Vec::new(),
            load_state: LoadState::NotLoaded,
            selected: None,
            last_error: None,
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn videos(&self) -> &[GeneratedVideo] {
        &self.videos
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetch the list the first time the view is shown
    pub async fn ensure_loaded(&mut self, backend: &dyn VideoBackend) {
        if self.load_state == LoadState::NotLoaded {
            self.reload(backend).await;
        }
    }

    /// Fetch the list again. A failed fetch leaves the list empty.
    pub async fn reload(&mut self, backend: &dyn VideoBackend) {
        self.load_state = LoadState::Loading;

        match backend.history().await {
            Ok(videos) => {
                info!("📚 Loaded {} videos from history", videos.len());
                self.videos = videos;
                self.last_error = None;
            }
            Err(e) => {
                warn!("Failed to load history: {}", e);
                self.videos.clear();
                self.last_error = Some(format!("Failed to load history: {}", e));
            }
        }

        let selection_gone = self
            .selected
            .as_ref()
            .map_or(false, |id| !self.videos.iter().any(|v| &v.id == id));
        if selection_gone {
            self.selected = None;
        }
        self.load_state = LoadState::Loaded;
    }

    /// Mark an entry as previewed
    pub fn select(&mut self, id: &str) -> Option<&GeneratedVideo> {
        let video = self.videos.iter().find(|v| v.id == id)?;
        self.selected = Some(video.id.clone());
        Some(video)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&GeneratedVideo> {
        let id = self.selected.as_ref()?;
        self.videos.iter().find(|v| &v.id == id)
    }

    /// Delete one entry after confirmation
    ///
    /// The local list only changes when the backend accepted the deletion.
    pub async fn delete<F>(&mut self, backend: &dyn VideoBackend, id: &str, confirm: F) -> Result<DeleteOutcome>
    where
        F: FnOnce(&GeneratedVideo) -> bool,
    {
        let Some(video) = self.videos.iter().find(|v| v.id == id) else {
            return Ok(DeleteOutcome::NotFound);
        };

        if !confirm(video) {
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(e) = backend.delete_video(id).await {
            warn!("Failed to delete video {}: {}", id, e);
            self.last_error = Some(format!("Failed to delete video: {}", e));
            return Err(e);
        }

        self.videos.retain(|v| v.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        info!("🗑️ Deleted video {}", id);
        Ok(DeleteOutcome::Deleted)
    }

    pub fn render(&self) -> String {
        if self.load_state != LoadState::Loaded {
            return "Loading your video history...\n".to_string();
        }

        let mut out = format!(
            "Video History\nYour previously generated videos ({})\n",
            self.videos.len()
        );

        if let Some(error) = &self.last_error {
            out.push_str(&format!("⚠ {}\n", error));
        }

        if self.videos.is_empty() {
            out.push_str("No videos generated yet\nStart creating amazing videos with AI!\n");
            return out;
        }

        for video in &self.videos {
            let selected = self.selected.as_deref() == Some(video.id.as_str());
            out.push_str(&history_line(video, selected));
            out.push('\n');
        }

        if let Some(video) = self.selected() {
            out.push_str(&format!(
                "\nPreview\n  {}\n  {}\n  Created {}\n  {}\n",
                video.prompt,
                describe(video),
                format_date(&video.created_at),
                video.video_url
            ));
        }
        out
    }
}
