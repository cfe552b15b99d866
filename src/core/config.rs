use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Fraction of an item that must be on screen for it to count as viewable.
    pub visibility_threshold: f32,
    /// Remaining items after the visible one at which the next batch is requested.
    pub end_reached_threshold: usize,
    pub initial_num_to_render: usize,
    /// Number of items kept mounted around the focused one.
    pub window_size: usize,
    /// Height of one feed row in pixels.
    pub item_extent: f32,
    pub feed_file: Option<PathBuf>,
    pub simulated_load_latency_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            end_reached_threshold: 3,
            initial_num_to_render: 5,
            window_size: 10,
            item_extent: 300.0,
            feed_file: None,
            simulated_load_latency_ms: 250,
        }
    }
}

impl FeedConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config.sanitized())
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config.save_to(config_path)
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reel-feed")
            .join("config.json")
    }

    /// Pulls hand-edited values back into a usable range.
    pub fn sanitized(mut self) -> Self {
        if !(self.visibility_threshold > 0.0 && self.visibility_threshold <= 1.0) {
            log::warn!(
                "visibility_threshold {} out of range, using 0.5",
                self.visibility_threshold
            );
            self.visibility_threshold = 0.5;
        }
        if !(self.item_extent > 0.0) {
            log::warn!("item_extent {} out of range, using 300", self.item_extent);
            self.item_extent = 300.0;
        }
        self.window_size = self.window_size.max(1);
        self.initial_num_to_render = self.initial_num_to_render.max(1);
        self
    }
}
