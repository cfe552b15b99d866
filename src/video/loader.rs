use async_trait::async_trait;
use std::time::Duration;

use crate::core::FeedError;

/// Backend that prepares a media source for playback.
#[async_trait]
pub trait MediaLoader: Send + Sync + 'static {
    async fn load(&self, source_uri: &str) -> Result<(), FeedError>;
}

/// Stand-in backend for headless runs: waits a fixed latency and accepts any
/// http(s) or file source.
#[derive(Debug, Clone)]
pub struct SimulatedLoader {
    latency: Duration,
}

impl SimulatedLoader {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl MediaLoader for SimulatedLoader {
    async fn load(&self, source_uri: &str) -> Result<(), FeedError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let supported = ["https://", "http://", "file://"]
            .iter()
            .any(|scheme| source_uri.starts_with(scheme));
        if supported {
            Ok(())
        } else {
            Err(FeedError::MediaLoad {
                uri: source_uri.to_string(),
                reason: "unsupported source".to_string(),
            })
        }
    }
}
