use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{Result, VideoGenError};
use crate::models::GeneratedVideo;

/// File name used when saving a video
pub fn download_filename(video: &GeneratedVideo) -> String {
    let id: String = video
        .id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("generated-video-{}.mp4", id)
}

/// Stream a finished video into `dir`
///
/// Bytes land in a `.part` sibling that is renamed once the whole body has
/// been written; a failed transfer leaves nothing behind.
pub async fn download_video(client: &reqwest::Client, video: &GeneratedVideo, dir: &Path) -> Result<PathBuf> {
    if !video.is_ready() {
        return Err(VideoGenError::NotReady(video.id.clone()));
    }

    tokio::fs::create_dir_all(dir).await?;
    let filename = download_filename(video);
    let path = dir.join(&filename);
    let partial = dir.join(format!("{}.part", filename));

    debug!("Downloading {} to {}", video.video_url, path.display());
    let written = match fetch_to(client, &video.video_url, &partial).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove partial download {}: {}", partial.display(), cleanup);
                }
            }
            return Err(e);
        }
    };
    tokio::fs::rename(&partial, &path).await?;

    info!("💾 Saved {} ({} bytes)", path.display(), written);
    Ok(path)
}

async fn fetch_to(client: &reqwest::Client, url: &str, target: &Path) -> Result<usize> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VideoGenError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let mut file = tokio::fs::File::create(target).await?;
    let mut written = 0usize;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    Ok(written)
}
