use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::settings::AppConfig;
use crate::infrastructure::artifacts::ArtifactStore;
use crate::infrastructure::cache::Caches;
use crate::infrastructure::queue::ConversionQueue;
use crate::infrastructure::upstream::UpstreamClient;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub caches: Arc<Caches>,
    pub queue: Arc<ConversionQueue>,
    pub artifacts: ArtifactStore,
    /// Bounds how many ffmpeg transcodes run at once.
    pub transcodes: Arc<Semaphore>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let caches = Arc::new(Caches::new());
        let queue = Arc::new(ConversionQueue::new());
        let artifacts = ArtifactStore::new(config.audio_dir.clone());
        let transcodes = Arc::new(Semaphore::new(config.transcode_pool_size));
        let upstream = UpstreamClient::new(&config);
        Self {
            config,
            caches,
            queue,
            artifacts,
            transcodes,
            upstream,
        }
    }
}
