use anyhow::{Context, Result};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::rss::{self, FeedEntry, FeedMeta};
use crate::infrastructure::upstream::MediaItem;
use crate::state::AppState;

/// Which artifact link a feed's enclosures point at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedKind {
    Video,
    Audio,
}

impl FeedKind {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("video") => Some(FeedKind::Video),
            Some("audio") => Some(FeedKind::Audio),
            Some(_) => None,
        }
    }

    fn handler_path(self) -> &'static str {
        match self {
            FeedKind::Video => "/video/",
            FeedKind::Audio => "/audio/",
        }
    }

    fn enclosure_type(self) -> &'static str {
        match self {
            FeedKind::Video => "video/mp4",
            FeedKind::Audio => "audio/mpeg",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            FeedKind::Video => "video",
            FeedKind::Audio => "audio",
        }
    }
}

pub struct FeedService;

impl FeedService {
    /// Builds (or returns the memoized) RSS document for a channel's
    /// uploads. `base` is the externally visible scheme://host of this
    /// server, used for enclosure links.
    pub async fn channel_feed(
        state: &AppState,
        channel_ref: &str,
        kind: FeedKind,
        base: &str,
        max_pages: Option<usize>,
    ) -> Result<String> {
        let cache_key = format!("{}/{}", channel_ref, kind.as_str());
        if let Some(feed) = state.caches.channel_feeds.get(&cache_key) {
            return Ok(feed);
        }

        let mut calls = 1usize;
        let channel = match state.upstream.channel(channel_ref).await {
            Ok(channel) => channel,
            Err(first_err) => {
                // Some subscribers hand us a channel name where an id
                // belongs; try the name lookup before giving up.
                calls += 1;
                state.upstream.channel_by_name(channel_ref).await.map_err(|_| {
                    anyhow::anyhow!("channel lookup failed for {channel_ref}: {first_err}")
                })?
            }
        };
        info!("Channel: {} ({})", channel.id, channel.title);

        let (items, page_calls) = Self::collect_items(
            state,
            &channel.uploads_playlist,
            max_pages,
        )
        .await?;
        calls += page_calls;

        let meta = FeedMeta {
            title: channel.title.clone(),
            link: format!("{base}/channel/{}", channel.id),
            description: channel.description.clone(),
            author: channel.title.clone(),
            image: channel.thumbnail.clone(),
        };
        let feed = rss::render(&meta, &Self::entries(&items, kind, base));

        // The more upstream calls a feed took, the longer it stays cached.
        let ttl = Duration::from_secs(3600 * calls as u64);
        state
            .caches
            .channel_feeds
            .put(cache_key, feed.clone(), ttl);
        if channel.id != channel_ref {
            // Cache under the canonical id as well so both spellings hit.
            let canonical_key = format!("{}/{}", channel.id, kind.as_str());
            state.caches.channel_feeds.put(canonical_key, feed.clone(), ttl);
        }

        Self::autoload_newest(state, &items, kind).await;
        Ok(feed)
    }

    /// Same as [`channel_feed`], for a playlist.
    pub async fn playlist_feed(
        state: &AppState,
        playlist_id: &str,
        kind: FeedKind,
        base: &str,
        max_pages: Option<usize>,
    ) -> Result<String> {
        let cache_key = format!("{}/{}", playlist_id, kind.as_str());
        if let Some(feed) = state.caches.playlist_feeds.get(&cache_key) {
            return Ok(feed);
        }

        let mut calls = 1usize;
        let playlist = state
            .upstream
            .playlist(playlist_id)
            .await
            .with_context(|| format!("playlist lookup failed for {playlist_id}"))?;
        info!("Playlist: {} ({})", playlist_id, playlist.title);

        let (items, page_calls) = Self::collect_items(state, playlist_id, max_pages).await?;
        calls += page_calls;

        let meta = FeedMeta {
            title: playlist.title.clone(),
            link: format!("{base}/playlist/{playlist_id}"),
            description: playlist.description.clone(),
            author: playlist.author.clone().unwrap_or(playlist.title),
            image: playlist.thumbnail.clone(),
        };
        let feed = rss::render(&meta, &Self::entries(&items, kind, base));

        let ttl = Duration::from_secs(3600 * calls as u64);
        state
            .caches
            .playlist_feeds
            .put(cache_key, feed.clone(), ttl);

        Self::autoload_newest(state, &items, kind).await;
        Ok(feed)
    }

    /// Maps a channel name to its canonical id, memoized.
    pub async fn channel_id_for_name(state: &AppState, name: &str) -> Option<String> {
        if let Some(id) = state.caches.channel_names.get(&name.to_string()) {
            return Some(id);
        }
        match state.upstream.channel_by_name(name).await {
            Ok(channel) => {
                state.caches.channel_names.put(
                    name.to_string(),
                    channel.id.clone(),
                    state.config.channel_name_ttl(),
                );
                Some(channel.id)
            }
            Err(e) => {
                warn!("Failed to resolve channel name {}: {}", name, e);
                None
            }
        }
    }

    async fn collect_items(
        state: &AppState,
        playlist_id: &str,
        max_pages: Option<usize>,
    ) -> Result<(Vec<MediaItem>, usize)> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut calls = 0usize;
        loop {
            if max_pages.is_some_and(|max| calls >= max) {
                info!("Reached the page cap for {}; stopping here", playlist_id);
                break;
            }
            let page = state
                .upstream
                .playlist_items(playlist_id, page_token.as_deref())
                .await
                .with_context(|| format!("item listing failed for {playlist_id}"))?;
            calls += 1;
            items.extend(
                page.items
                    .into_iter()
                    // Private entries carry no playable media.
                    .filter(|item| !item.title.to_lowercase().contains("private")),
            );
            match page.next_page {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        info!("Got {} items from {} page(s)", items.len(), calls);
        Ok((items, calls))
    }

    fn entries(items: &[MediaItem], kind: FeedKind, base: &str) -> Vec<FeedEntry> {
        items
            .iter()
            .map(|item| FeedEntry {
                guid: item.media_id.clone(),
                title: item.title.clone(),
                link: format!("{base}/video/{}", item.media_id),
                description: item.description.clone(),
                author: item.author.clone().unwrap_or_default(),
                image: item.thumbnail.clone(),
                published_at: item.published_at.clone(),
                enclosure_url: format!("{base}{}{}", kind.handler_path(), item.media_id),
                enclosure_type: kind.enclosure_type().to_string(),
            })
            .collect()
    }

    /// Kicks off conversion of the newest feed entry so the artifact is warm
    /// before any subscriber asks for it.
    async fn autoload_newest(state: &AppState, items: &[MediaItem], kind: FeedKind) {
        if kind != FeedKind::Audio || !state.config.autoload_newest_audio {
            return;
        }
        let newest = items.iter().max_by_key(|item| {
            OffsetDateTime::parse(&item.published_at, &Rfc3339)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        });
        let Some(newest) = newest else { return };
        if !state.artifacts.exists(&newest.media_id).await
            && state.queue.enqueue(&newest.media_id)
        {
            info!("Autoloading newest item {}", newest.media_id);
        }
    }
}
