use utoipa::OpenApi;

use crate::modules::admin::dto::{AudioFileView, CacheView, ClearedCounts};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::audio::handler::get_audio,
        crate::modules::audio::handler::head_audio,
        crate::modules::media::handler::get_video,
        crate::modules::feed::handler::channel_feed,
        crate::modules::feed::handler::channel_feed_kind,
        crate::modules::feed::handler::playlist_feed,
        crate::modules::feed::handler::playlist_feed_kind,
        crate::modules::feed::handler::user_feed,
        crate::modules::admin::handler::clear_cache,
    ),
    components(
        schemas(CacheView, ClearedCounts, AudioFileView)
    ),
    tags(
        (name = "Audio", description = "Transcoded audio artifacts"),
        (name = "Media", description = "Direct media resolution"),
        (name = "Feeds", description = "Channel and playlist RSS feeds"),
        (name = "Admin", description = "Cache administration")
    )
)]
pub struct ApiDoc;
