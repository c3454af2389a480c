use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use slackvault_slack::client::DEFAULT_API_BASE;

/// Everything a sync run needs to know, passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub token: String,
    pub data_dir: PathBuf,
    pub channel: String,
    pub api_base: String,
    pub http_timeout: Duration,
}

impl ArchiveConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. An unset token is left empty
    /// for the caller to reject.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs: u64 = match lookup("SLACKVAULT_HTTP_TIMEOUT_SECS") {
            Some(v) => v.parse()?,
            None => 30,
        };

        Ok(Self {
            token: lookup("SLACK_TOKEN").unwrap_or_default(),
            data_dir: lookup("SLACKVAULT_DATA_DIR")
                .unwrap_or_else(|| "data".into())
                .into(),
            channel: lookup("SLACKVAULT_CHANNEL").unwrap_or_else(|| "general".into()),
            api_base: lookup("SLACKVAULT_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        slackvault_db::db_path(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = ArchiveConfig::from_lookup(|_| None).unwrap();
        assert!(config.token.is_empty());
        assert_eq!(config.channel, "general");
        assert_eq!(config.db_path(), PathBuf::from("data/slack.db"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn overrides_are_read() {
        let env: HashMap<&str, &str> = [
            ("SLACK_TOKEN", "xoxp-1"),
            ("SLACKVAULT_DATA_DIR", "/srv/archive"),
            ("SLACKVAULT_CHANNEL", "random"),
            ("SLACKVAULT_HTTP_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();
        let config = ArchiveConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.token, "xoxp-1");
        assert_eq!(config.channel, "random");
        assert_eq!(config.db_path(), PathBuf::from("/srv/archive/slack.db"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let result = ArchiveConfig::from_lookup(|k| {
            (k == "SLACKVAULT_HTTP_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
