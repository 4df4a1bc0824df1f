use time::OffsetDateTime;
use tracing::{info, warn};

use crate::infrastructure::upstream::{MediaLink, ResolveError, ResolvedMedia};
use crate::state::AppState;

pub struct MediaService;

impl MediaService {
    /// Whether `media_id` currently carries the negative marker.
    pub fn is_unavailable(state: &AppState, media_id: &str) -> bool {
        matches!(
            state.caches.media_links.get(&media_id.to_string()),
            Some(MediaLink::Unavailable)
        )
    }

    /// Records that `media_id` cannot be produced. The marker expires on its
    /// own so the source gets another chance later.
    pub fn mark_unavailable(state: &AppState, media_id: &str) {
        warn!("Marking {} unavailable", media_id);
        state.caches.media_links.put(
            media_id.to_string(),
            MediaLink::Unavailable,
            state.config.unavailable_ttl(),
        );
    }

    /// Resolves the direct stream URL for `media_id`, going to the upstream
    /// only on a cache miss. A cached negative marker short-circuits into
    /// `ResolveError::Unavailable` without touching the network.
    pub async fn resolve(state: &AppState, media_id: &str) -> Result<ResolvedMedia, ResolveError> {
        match state.caches.media_links.get(&media_id.to_string()) {
            Some(MediaLink::Ready(media)) => return Ok(media),
            Some(MediaLink::Unavailable) => {
                return Err(ResolveError::Unavailable(format!(
                    "{media_id} is marked unavailable"
                )));
            }
            None => {}
        }

        let media = state.upstream.resolve_media(media_id).await?;
        info!("Resolved media URL for {}", media_id);
        let expires_at = media
            .expires_at
            .filter(|deadline| *deadline > OffsetDateTime::now_utc())
            .unwrap_or_else(|| {
                OffsetDateTime::now_utc() + state.config.media_link_fallback_ttl()
            });
        state.caches.media_links.put_until(
            media_id.to_string(),
            MediaLink::Ready(media.clone()),
            expires_at,
        );
        Ok(media)
    }
}
