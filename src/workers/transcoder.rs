//! Background conversion of queued media into audio artifacts.
//!
//! A drain loop claims jobs oldest-first on a fixed tick. Each claimed job
//! runs as its own task gated by the transcode pool, so queue depth never
//! translates into more than `transcode_pool_size` concurrent ffmpeg
//! processes. Output goes to a temp path and is renamed into place only
//! when ffmpeg succeeds, so readers never see a half-written file.

use std::path::Path;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::infrastructure::upstream::ResolveError;
use crate::modules::media::service::MediaService;
use crate::state::AppState;

#[derive(Debug, Error)]
enum ConvertError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("ffmpeg exited with {0}")]
    Ffmpeg(ExitStatus),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    fn is_permanent(&self) -> bool {
        matches!(self, ConvertError::Resolve(e) if e.is_permanent())
    }
}

pub async fn run(state: AppState) {
    info!(
        "Starting transcoder worker (pool size {}, tick {:?})",
        state.config.transcode_pool_size,
        state.config.convert_period()
    );
    let mut tick = tokio::time::interval(state.config.convert_period());
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        let Some(media_id) = state.queue.claim_next() else {
            continue;
        };
        let state = state.clone();
        tokio::spawn(async move {
            // The claim is already made; only execution waits for a slot.
            let permit = match state.transcodes.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            convert(&state, &media_id).await;
            drop(permit);
        });
    }
}

/// Runs one conversion end to end and cleans up after itself: the queue
/// entry is removed and any temp file deleted no matter how it went.
async fn convert(state: &AppState, media_id: &str) {
    info!("Converting: {}", media_id);
    let audio_file = state.artifacts.path(media_id);
    let temp_file = state.artifacts.temp_path(media_id);

    match transcode(state, media_id, &temp_file, &audio_file).await {
        Ok(()) => info!("Successfully converted: {}", media_id),
        Err(e) => {
            error!("Error converting {}: {}", media_id, e);
            if e.is_permanent() {
                MediaService::mark_unavailable(state, media_id);
            }
            if tokio::fs::metadata(&audio_file).await.is_ok() {
                if let Err(e2) = tokio::fs::remove_file(&audio_file).await {
                    error!("Error removing broken file: {}", e2);
                }
            }
        }
    }

    state.queue.remove(media_id);
    if tokio::fs::metadata(&temp_file).await.is_ok() {
        if let Err(e) = tokio::fs::remove_file(&temp_file).await {
            error!("Error removing temp file: {}", e);
        }
    }
}

async fn transcode(
    state: &AppState,
    media_id: &str,
    temp_file: &Path,
    audio_file: &Path,
) -> Result<(), ConvertError> {
    let media = MediaService::resolve(state, media_id).await?;

    let status = Command::new("ffmpeg")
        .args([
            "-loglevel",
            "panic",
            "-y",
            "-i",
            &media.url,
            "-f",
            "mp3",
        ])
        .arg(temp_file)
        .status()
        .await?;
    if !status.success() {
        return Err(ConvertError::Ffmpeg(status));
    }

    // The rename is what makes the artifact visible to requests.
    tokio::fs::rename(temp_file, audio_file).await?;
    Ok(())
}
