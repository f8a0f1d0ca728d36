//! Text formatting for the terminal views

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::models::GeneratedVideo;

/// Parse the backend's timestamp, treating offset-less values as UTC
pub fn parse_created_at(created_at: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(created_at) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Short date like "May 1, 10:15 AM" in the given time zone
pub fn format_date_in<Tz: TimeZone>(created_at: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match parse_created_at(created_at) {
        Some(dt) => dt.with_timezone(tz).format("%b %-d, %I:%M %p").to_string(),
        None => created_at.to_string(),
    }
}

pub fn format_date(created_at: &str) -> String {
    format_date_in(created_at, &Local)
}

/// "720p • 16:9 • 8s"
pub fn describe(video: &GeneratedVideo) -> String {
    format!("{} • {} • {}s", video.resolution, video.aspect_ratio, video.duration)
}

pub fn progress_bar(percent: f64, width: usize) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:.0}%",
        "█".repeat(filled),
        "░".repeat(width.saturating_sub(filled)),
        percent
    )
}

/// Text offered when sharing a finished video
pub fn share_text(video: &GeneratedVideo) -> String {
    format!("Generated Video\n{}\n{}", video.prompt, video.video_url)
}

/// Single line used in history listings
pub fn history_line(video: &GeneratedVideo, selected: bool) -> String {
    let marker = if selected { "▶" } else { " " };
    let prompt: String = if video.prompt.chars().count() > 60 {
        format!("{}…", video.prompt.chars().take(59).collect::<String>())
    } else {
        video.prompt.clone()
    };
    format!(
        "{} [{}] {} ({}s, {}, {})",
        marker,
        video.id,
        prompt,
        video.duration,
        video.resolution,
        format_date(&video.created_at)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoStatus;

    fn video() -> GeneratedVideo {
        GeneratedVideo {
            id: "1".to_string(),
            prompt: "A cat playing in a garden".to_string(),
            video_url: "https://cdn.example.com/v/1.mp4".to_string(),
            thumbnail_url: String::new(),
            created_at: "2024-05-01T10:15:30.123456".to_string(),
            duration: 8,
            aspect_ratio: "16:9".to_string(),
            resolution: "720p".to_string(),
            status: VideoStatus::Completed,
            progress: None,
        }
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date_in("2024-05-01T10:15:30.123456", &Utc), "May 1, 10:15 AM");
        assert_eq!(format_date_in("2024-12-24T18:05:00+00:00", &Utc), "Dec 24, 06:05 PM");
        assert_eq!(format_date_in("yesterday", &Utc), "yesterday");
    }

    #[test]
    fn test_describe_and_share() {
        let video = video();
        assert_eq!(describe(&video), "720p • 16:9 • 8s");
        assert_eq!(
            share_text(&video),
            "Generated Video\nA cat playing in a garden\nhttps://cdn.example.com/v/1.mp4"
        );
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[░░░░] 0%");
        assert_eq!(progress_bar(50.0, 4), "[██░░] 50%");
        assert_eq!(progress_bar(120.0, 4), "[████] 100%");
    }

    #[test]
    fn test_history_line_marks_selection() {
        let line = history_line(&video(), true);
        assert!(line.starts_with("▶ [1] A cat playing in a garden"));
        assert!(history_line(&video(), false).starts_with("  [1]"));
    }
}
