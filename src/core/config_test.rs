#[cfg(test)]
mod tests {

    use crate::core::FeedConfig;

    #[test]
    fn test_feed_config_default() {
        let config = FeedConfig::default();
        assert_eq!(config.visibility_threshold, 0.5);
        assert_eq!(config.end_reached_threshold, 3);
        assert_eq!(config.initial_num_to_render, 5);
        assert_eq!(config.window_size, 10);
        assert!(config.feed_file.is_none());
    }

    #[test]
    fn test_config_backward_compatibility() {
        // Older files only carried the viewability settings
        let old_config_json = r#"{
            "visibility_threshold": 0.6,
            "end_reached_threshold": 2
        }"#;

        let config: FeedConfig = serde_json::from_str(old_config_json).expect("Failed to parse old config");

        assert_eq!(config.visibility_threshold, 0.6);
        assert_eq!(config.end_reached_threshold, 2);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.item_extent, 300.0);
    }

    #[test]
    fn test_sanitized_clamps_bad_values() {
        let mut config = FeedConfig::default();
        config.visibility_threshold = 1.5;
        config.window_size = 0;
        config.item_extent = -4.0;

        let config = config.sanitized();
        assert_eq!(config.visibility_threshold, 0.5);
        assert_eq!(config.window_size, 1);
        assert_eq!(config.item_extent, 300.0);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");

        let config = FeedConfig::load_from(&path).expect("Failed to load config");
        assert_eq!(config.end_reached_threshold, 3);
        assert!(path.exists());
    }

    #[test]
    fn test_load_replaces_corrupt_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").expect("Failed to write config");

        let config = FeedConfig::load_from(&path).expect("Failed to load config");
        assert_eq!(config.window_size, 10);

        let rewritten = std::fs::read_to_string(&path).expect("Failed to read config");
        assert!(serde_json::from_str::<FeedConfig>(&rewritten).is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");

        let mut config = FeedConfig::default();
        config.window_size = 4;
        config.simulated_load_latency_ms = 10;
        config.save_to(&path).expect("Failed to save config");

        let reloaded = FeedConfig::load_from(&path).expect("Failed to load config");
        assert_eq!(reloaded.window_size, 4);
        assert_eq!(reloaded.simulated_load_latency_ms, 10);
    }
}
