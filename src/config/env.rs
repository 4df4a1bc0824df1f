use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    AudioDir,
    UpstreamApiBase,
    UpstreamApiKey,
    ConvertPeriodMs,
    CleanupPeriodSecs,
    AudioExpirationSecs,
    CleanupStartFreeBytes,
    CleanupStopFreeBytes,
    TranscodePoolSize,
    UnavailableTtlSecs,
    MediaLinkFallbackTtlSecs,
    ChannelNameTtlSecs,
    AudioWaitTimeoutSecs,
    AutoloadNewestAudio,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::AudioDir => "AUDIO_DIR",
            EnvKey::UpstreamApiBase => "UPSTREAM_API_BASE",
            EnvKey::UpstreamApiKey => "UPSTREAM_API_KEY",
            EnvKey::ConvertPeriodMs => "CONVERT_PERIOD_MS",
            EnvKey::CleanupPeriodSecs => "CLEANUP_PERIOD_SECS",
            EnvKey::AudioExpirationSecs => "AUDIO_EXPIRATION_SECS",
            EnvKey::CleanupStartFreeBytes => "CLEANUP_START_FREE_BYTES",
            EnvKey::CleanupStopFreeBytes => "CLEANUP_STOP_FREE_BYTES",
            EnvKey::TranscodePoolSize => "TRANSCODE_POOL_SIZE",
            EnvKey::UnavailableTtlSecs => "UNAVAILABLE_TTL_SECS",
            EnvKey::MediaLinkFallbackTtlSecs => "MEDIA_LINK_FALLBACK_TTL_SECS",
            EnvKey::ChannelNameTtlSecs => "CHANNEL_NAME_TTL_SECS",
            EnvKey::AudioWaitTimeoutSecs => "AUDIO_WAIT_TIMEOUT_SECS",
            EnvKey::AutoloadNewestAudio => "AUTOLOAD_NEWEST_AUDIO",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

pub fn get_bool(key: EnvKey, default: bool) -> bool {
    match get(key) {
        Ok(val) => matches!(
            val.to_lowercase().as_str(),
            "1" | "true" | "t" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}
