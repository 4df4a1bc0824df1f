use crate::config::env::{self, EnvKey};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub audio_dir: PathBuf,
    pub upstream_api_base: String,
    pub upstream_api_key: Option<String>,
    /// How often the conversion queue is drained, in milliseconds.
    pub convert_period_ms: u64,
    /// How often the janitor sweeps caches and the artifact directory, in seconds.
    pub cleanup_period_secs: u64,
    /// Artifacts older than this are always eligible for deletion, in seconds.
    pub audio_expiration_secs: u64,
    /// Free-space floor: eviction under space pressure starts below this.
    pub cleanup_start_free_bytes: u64,
    /// Free-space ceiling: eviction under space pressure stops above this.
    pub cleanup_stop_free_bytes: u64,
    /// Maximum number of concurrently running ffmpeg transcodes.
    pub transcode_pool_size: usize,
    /// Lifetime of the negative marker recorded for unresolvable media, in seconds.
    pub unavailable_ttl_secs: u64,
    /// Media link cache lifetime when the upstream URL carries no expiry, in seconds.
    pub media_link_fallback_ttl_secs: u64,
    pub channel_name_ttl_secs: u64,
    /// Upper bound on how long a request may wait for a conversion, in seconds.
    pub audio_wait_timeout_secs: u64,
    pub autoload_newest_audio: bool,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 15000),
            audio_dir: PathBuf::from(env::get_or(EnvKey::AudioDir, "./audio")),
            upstream_api_base: env::get(EnvKey::UpstreamApiBase)?,
            upstream_api_key: env::get(EnvKey::UpstreamApiKey).ok(),
            convert_period_ms: env::get_parsed(EnvKey::ConvertPeriodMs, 1000),
            cleanup_period_secs: env::get_parsed(EnvKey::CleanupPeriodSecs, 600),
            audio_expiration_secs: env::get_parsed(EnvKey::AudioExpirationSecs, 259_200),
            cleanup_start_free_bytes: env::get_parsed(EnvKey::CleanupStartFreeBytes, 536_870_912),
            cleanup_stop_free_bytes: env::get_parsed(EnvKey::CleanupStopFreeBytes, 16_106_127_360),
            transcode_pool_size: env::get_parsed(EnvKey::TranscodePoolSize, 2),
            unavailable_ttl_secs: env::get_parsed(EnvKey::UnavailableTtlSecs, 21_600),
            media_link_fallback_ttl_secs: env::get_parsed(EnvKey::MediaLinkFallbackTtlSecs, 3600),
            channel_name_ttl_secs: env::get_parsed(EnvKey::ChannelNameTtlSecs, 86_400),
            audio_wait_timeout_secs: env::get_parsed(EnvKey::AudioWaitTimeoutSecs, 600),
            autoload_newest_audio: env::get_bool(EnvKey::AutoloadNewestAudio, true),
        })
    }

    pub fn convert_period(&self) -> Duration {
        Duration::from_millis(self.convert_period_ms)
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_period_secs)
    }

    pub fn audio_expiration(&self) -> Duration {
        Duration::from_secs(self.audio_expiration_secs)
    }

    pub fn unavailable_ttl(&self) -> Duration {
        Duration::from_secs(self.unavailable_ttl_secs)
    }

    pub fn media_link_fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.media_link_fallback_ttl_secs)
    }

    pub fn channel_name_ttl(&self) -> Duration {
        Duration::from_secs(self.channel_name_ttl_secs)
    }

    pub fn audio_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.audio_wait_timeout_secs)
    }
}
