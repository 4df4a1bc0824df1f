//! Periodic cache maintenance.
//!
//! Each pass expires the in-memory tables, then walks the artifact
//! directory oldest-first. Files past the age limit always go; once free
//! space has been seen below the start threshold the pass keeps deleting
//! regardless of age until free space clears the stop threshold, so the
//! sweep does not oscillate around a single boundary.

use std::path::Path;
use std::time::{Duration, SystemTime};
use sysinfo::Disks;
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::infrastructure::artifacts::ArtifactStore;
use crate::state::AppState;

/// Free bytes on the volume holding `path`. Abstracted so tests can apply
/// disk pressure without filling a real disk.
pub trait FreeSpace: Send + Sync {
    fn free_bytes(&self, path: &Path) -> u64;
}

pub struct SystemFreeSpace;

impl FreeSpace for SystemFreeSpace {
    fn free_bytes(&self, path: &Path) -> u64 {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space())
            // No matching mount: report no pressure rather than guessing.
            .unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub files_deleted: usize,
    pub bytes_freed: u64,
}

pub async fn run(state: AppState) {
    info!(
        "Starting janitor (every {:?}, artifact max age {:?})",
        state.config.cleanup_period(),
        state.config.audio_expiration()
    );
    let mut tick = tokio::time::interval(state.config.cleanup_period());
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        sweep(&state).await;
    }
}

pub async fn sweep(state: &AppState) {
    let now = OffsetDateTime::now_utc();
    let caches = &state.caches;

    let cleaned = caches.media_links.sweep(now);
    if cleaned > 0 {
        info!("Cleaned {} items from the media link cache", cleaned);
    }
    let cleaned = caches.channel_feeds.sweep(now);
    if cleaned > 0 {
        info!("Cleaned {} items from the channel feed cache", cleaned);
    }
    let cleaned = caches.playlist_feeds.sweep(now);
    if cleaned > 0 {
        info!("Cleaned {} items from the playlist feed cache", cleaned);
    }
    let cleaned = caches.channel_names.sweep(now);
    if cleaned > 0 {
        info!("Cleaned {} items from the channel name cache", cleaned);
    }

    let artifacts = state.artifacts.clone();
    let max_age = state.config.audio_expiration();
    let start_free = state.config.cleanup_start_free_bytes;
    let stop_free = state.config.cleanup_stop_free_bytes;
    let stats = tokio::task::spawn_blocking(move || {
        sweep_artifacts(&artifacts, max_age, start_free, stop_free, &SystemFreeSpace)
    })
    .await
    .unwrap_or_default();
    if stats.files_deleted > 0 {
        info!(
            "Deleted {} artifact(s), freed {} bytes",
            stats.files_deleted, stats.bytes_freed
        );
    }
}

/// One oldest-first eviction pass over the artifact directory.
///
/// Age and space pressure are evaluated together: an expired file is always
/// deleted; space pressure, once observed, keeps the pass deleting until
/// free space exceeds `stop_free`. The pass ends at the first file that no
/// pressure applies to, which on a creation-time-sorted listing means
/// everything younger survives.
pub fn sweep_artifacts(
    artifacts: &ArtifactStore,
    max_age: Duration,
    start_free: u64,
    stop_free: u64,
    probe: &dyn FreeSpace,
) -> SweepStats {
    let mut stats = SweepStats::default();
    let expired_before = SystemTime::now() - max_age;
    let mut size_clean = false;

    for file in artifacts.list() {
        if !size_clean {
            size_clean = probe.free_bytes(artifacts.dir()) < start_free;
        }
        let time_clean = file.created <= expired_before;
        if !time_clean && !size_clean {
            break;
        }
        match std::fs::remove_file(&file.path) {
            Ok(()) => {
                info!("Deleted {}", file.path.display());
                stats.files_deleted += 1;
                stats.bytes_freed += file.size;
            }
            Err(e) => {
                error!("Error removing file {}: {}", file.path.display(), e);
                continue;
            }
        }
        // Space pressure ends the moment the stop threshold is cleared;
        // age-expired files keep falling regardless.
        if size_clean && probe.free_bytes(artifacts.dir()) > stop_free {
            size_clean = false;
        }
    }
    stats
}
