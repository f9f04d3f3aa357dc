use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upstream feed URL is set and the descriptor URL carries `{id}`
/// - At least one announce template, each carrying `{token}`
/// - Sync interval and feed limit are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.upstream.feed_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "upstream.feed_url cannot be empty".to_string(),
        ));
    }

    if !config.upstream.descriptor_url.contains("{id}") {
        return Err(ConfigError::ValidationError(
            "upstream.descriptor_url must contain the {id} placeholder".to_string(),
        ));
    }

    if config.trackers.announce.is_empty() {
        return Err(ConfigError::ValidationError(
            "trackers.announce needs at least one URL template".to_string(),
        ));
    }

    if let Some(bad) = config
        .trackers
        .announce
        .iter()
        .find(|t| !t.contains("{token}"))
    {
        return Err(ConfigError::ValidationError(format!(
            "announce template is missing the {{token}} placeholder: {}",
            bad
        )));
    }

    if config.sync.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sync.interval_secs cannot be 0".to_string(),
        ));
    }

    if config.sync.feed_limit == 0 {
        return Err(ConfigError::ValidationError(
            "sync.feed_limit cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[upstream]
feed_url = "https://tracker.example/rss.xml"
descriptor_url = "https://tracker.example/download.php?id={id}"

[trackers]
announce = ["http://bt.example/announce.php?uk={token}"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_descriptor_url_without_placeholder_fails() {
        let mut config = valid_config();
        config.upstream.descriptor_url = "https://tracker.example/download.php".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_announce_fails() {
        let mut config = valid_config();
        config.trackers.announce.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_announce_without_token_fails() {
        let mut config = valid_config();
        config
            .trackers
            .announce
            .push("http://static.example/announce".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("static.example"));
    }

    #[test]
    fn test_validate_zero_feed_limit_fails() {
        let mut config = valid_config();
        config.sync.feed_limit = 0;
        assert!(validate_config(&config).is_err());
    }
}
