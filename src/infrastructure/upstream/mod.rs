//! HTTP client for the upstream metadata API.
//!
//! Everything the service knows about remote media comes through here:
//! channel and playlist listings for the feed endpoints, and the
//! short-lived stream URL the transcoder pulls from.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use crate::config::settings::AppConfig;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The source can never be produced (removed, region-locked, or a live
    /// broadcast). Callers record a negative marker instead of retrying.
    #[error("media unavailable: {0}")]
    Unavailable(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl ResolveError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, ResolveError::Unavailable(_))
    }
}

/// A usable stream location, valid until `expires_at` when the upstream
/// embeds a deadline in the signed URL.
#[derive(Clone, Debug)]
pub struct ResolvedMedia {
    pub url: String,
    pub expires_at: Option<OffsetDateTime>,
}

/// Value stored in the media link cache.
#[derive(Clone, Debug)]
pub enum MediaLink {
    Ready(ResolvedMedia),
    Unavailable,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub uploads_playlist: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MediaItem {
    pub media_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// RFC 3339 publication timestamp as sent by the upstream.
    pub published_at: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ItemPage {
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub next_page: Option<String>,
}

#[derive(Deserialize)]
struct StreamManifest {
    url: String,
    #[serde(default)]
    live: bool,
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: config.upstream_api_base.trim_end_matches('/').to_string(),
            api_key: config.upstream_api_key.clone(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.get(format!("{}{}", self.base, path));
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key)]);
        }
        req
    }

    pub async fn channel(&self, id: &str) -> Result<ChannelInfo, ResolveError> {
        let resp = self
            .request(&format!("/channels/{id}"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn channel_by_name(&self, name: &str) -> Result<ChannelInfo, ResolveError> {
        let resp = self
            .request(&format!("/channels/by-name/{name}"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn playlist(&self, id: &str) -> Result<PlaylistInfo, ResolveError> {
        let resp = self
            .request(&format!("/playlists/{id}"))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn playlist_items(
        &self,
        id: &str,
        page: Option<&str>,
    ) -> Result<ItemPage, ResolveError> {
        let mut req = self.request(&format!("/playlists/{id}/items"));
        if let Some(token) = page {
            req = req.query(&[("page", token)]);
        }
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Fetches the direct stream location for one media id, classifying the
    /// outcome so the worker can tell "try again later" from "never".
    pub async fn resolve_media(&self, media_id: &str) -> Result<ResolvedMedia, ResolveError> {
        let resp = self
            .request(&format!("/media/{media_id}/manifest"))
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                return Err(ResolveError::Unavailable(format!(
                    "upstream returned {} for {}",
                    resp.status(),
                    media_id
                )));
            }
            _ => {}
        }
        let manifest: StreamManifest = resp.error_for_status()?.json().await?;
        if manifest.live {
            return Err(ResolveError::Unavailable(format!(
                "{media_id} is a live broadcast"
            )));
        }
        if manifest.url.is_empty() {
            return Err(ResolveError::Malformed(format!(
                "empty stream url for {media_id}"
            )));
        }
        let expires_at = url_expiry(&manifest.url);
        debug!("Resolved {} (expires: {:?})", media_id, expires_at);
        Ok(ResolvedMedia {
            url: manifest.url,
            expires_at,
        })
    }
}

/// Signed stream URLs carry their deadline as an `expire` query parameter
/// holding unix seconds. Absent or unparseable means the caller falls back
/// to a configured lifetime.
fn url_expiry(raw: &str) -> Option<OffsetDateTime> {
    let url = Url::parse(raw).ok()?;
    let expire = url
        .query_pairs()
        .find(|(name, _)| name == "expire")
        .map(|(_, value)| value.into_owned())?;
    let secs: i64 = expire.parse().ok()?;
    OffsetDateTime::from_unix_timestamp(secs).ok()
}
