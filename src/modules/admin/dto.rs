use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-domain clear instruction: `NONE` (default), `ALL`, or one key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ClearSelector {
    #[default]
    None,
    All,
    Key(String),
}

impl ClearSelector {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("NONE") => ClearSelector::None,
            Some("ALL") => ClearSelector::All,
            Some(key) => ClearSelector::Key(key.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ClearSelector::None)
    }
}

#[derive(Deserialize)]
pub struct ClearCacheQuery {
    pub media_links: Option<String>,
    pub channel_feeds: Option<String>,
    pub playlist_feeds: Option<String>,
    pub channel_names: Option<String>,
    pub audio_files: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ClearedCounts {
    pub media_links: usize,
    pub channel_feeds: usize,
    pub playlist_feeds: usize,
    pub channel_names: usize,
    pub audio_files: usize,
}

#[derive(Serialize, ToSchema)]
pub struct AudioFileView {
    pub name: String,
    pub size_bytes: u64,
}

/// Snapshot of everything still cached, returned after a clear so the
/// caller can see what survived.
#[derive(Serialize, ToSchema)]
pub struct CacheView {
    pub cleared: ClearedCounts,
    pub media_links: Vec<String>,
    pub channel_feeds: Vec<String>,
    pub playlist_feeds: Vec<String>,
    pub channel_names: Vec<String>,
    /// Oldest first, matching eviction order.
    pub audio_files: Vec<AudioFileView>,
}
