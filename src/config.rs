// src/config.rs
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::cards::DEFAULT_CARD_SELECTORS;
use crate::extract::Source;
use crate::fetch::DEFAULT_USER_AGENT;
use crate::store::DEFAULT_DATA_FILE;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_TOKEN: &str = "TG_TOKEN";
pub const ENV_CHAT_IDS: &str = "TG_CHAT_IDS";
pub const ENV_INTERVAL: &str = "POLL_INTERVAL_SECS";

fn default_interval_secs() -> u64 {
    60
}
fn default_alert_threshold() -> u32 {
    10
}
fn default_fetch_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    2_000
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_expiry_secs() -> u64 {
    60
}
fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}
fn default_status_command() -> String {
    "/vps".to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_card_selectors() -> Vec<String> {
    DEFAULT_CARD_SELECTORS.iter().map(|s| s.to_string()).collect()
}

/// Everything the monitor needs at startup.
///
/// Regions and tunables come from TOML; the bot token and recipients come
/// from the environment (`TG_TOKEN`, `TG_CHAT_IDS`).
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Consecutive all-failed cycles before the operator alert.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u32,
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_expiry_secs")]
    pub stock_change_expiry_secs: u64,
    #[serde(default = "default_expiry_secs")]
    pub status_reply_expiry_secs: u64,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default)]
    pub debug_capture_dir: Option<PathBuf>,
    /// Also alert on listings without a tier requirement.
    #[serde(default)]
    pub notify_untiered: bool,
    #[serde(default = "default_status_command")]
    pub status_command: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_card_selectors")]
    pub card_selectors: Vec<String>,
    #[serde(default)]
    pub regions: Vec<Source>,

    #[serde(skip)]
    pub telegram_token: Option<String>,
    #[serde(skip)]
    pub chat_ids: Vec<String>,
}

impl MonitorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing monitor config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        Self::from_toml_str(&s)
    }

    /// `$MONITOR_CONFIG_PATH`, else `config/monitor.toml`; then env overrides
    /// and validation.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(t) = std::env::var(ENV_TOKEN) {
            let t = t.trim();
            if !t.is_empty() {
                self.telegram_token = Some(t.to_string());
            }
        }
        if let Ok(ids) = std::env::var(ENV_CHAT_IDS) {
            self.chat_ids = parse_chat_ids(&ids);
        }
        if let Some(secs) = std::env::var(ENV_INTERVAL)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.interval_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            bail!("no regions configured");
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be positive");
        }
        if self.alert_threshold == 0 {
            bail!("alert_threshold must be at least 1");
        }
        if self.fetch_attempts == 0 {
            bail!("fetch_attempts must be at least 1");
        }
        let mut seen = std::collections::HashSet::new();
        for r in &self.regions {
            if !seen.insert(r.region.as_str()) {
                bail!("region {} configured twice", r.region);
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn stock_change_expiry(&self) -> Duration {
        Duration::from_secs(self.stock_change_expiry_secs)
    }

    pub fn status_reply_expiry(&self) -> Duration {
        Duration::from_secs(self.status_reply_expiry_secs)
    }

    pub fn region_flags(&self) -> HashMap<String, String> {
        self.regions
            .iter()
            .filter_map(|r| r.flag.clone().map(|f| (r.region.clone(), f)))
            .collect()
    }
}

/// `"1, 2,,-100 "` -> `["1", "2", "-100"]`.
pub fn parse_chat_ids(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const SAMPLE: &str = r#"
        interval_secs = 30

        [[regions]]
        name = "白银区"
        url = "https://shop.example/cart?fid=1&gid=1"
        flag = "🥈"

        [[regions]]
        name = "黄金区"
        url = "https://shop.example/cart?fid=1&gid=2"
    "#;

    #[test]
    fn defaults_fill_in() {
        let cfg = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.interval_secs, 30);
        assert_eq!(cfg.alert_threshold, 10);
        assert_eq!(cfg.fetch_attempts, 3);
        assert_eq!(cfg.stock_change_expiry(), Duration::from_secs(60));
        assert_eq!(cfg.status_command, "/vps");
        assert_eq!(cfg.data_file, PathBuf::from("stock_data.json"));
        assert_eq!(cfg.card_selectors.len(), DEFAULT_CARD_SELECTORS.len());
        assert_eq!(cfg.regions[0].region, "白银区");
        assert_eq!(cfg.region_flags().get("白银区").map(String::as_str), Some("🥈"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(MonitorConfig::from_toml_str("").unwrap().validate().is_err());
        let mut cfg = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        cfg.alert_threshold = 0;
        assert!(cfg.validate().is_err());
        let dup = format!("{SAMPLE}\n[[regions]]\nname = \"黄金区\"\nurl = \"x\"\n");
        assert!(MonitorConfig::from_toml_str(&dup).unwrap().validate().is_err());
    }

    #[test]
    fn chat_ids_are_trimmed() {
        assert_eq!(parse_chat_ids(" 1, 2,,-100 "), vec!["1", "2", "-100"]);
        assert!(parse_chat_ids("").is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        env::set_var(ENV_TOKEN, " abc ");
        env::set_var(ENV_CHAT_IDS, "11,22");
        env::set_var(ENV_INTERVAL, "15");
        let mut cfg = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        cfg.apply_env();
        env::remove_var(ENV_TOKEN);
        env::remove_var(ENV_CHAT_IDS);
        env::remove_var(ENV_INTERVAL);

        assert_eq!(cfg.telegram_token.as_deref(), Some("abc"));
        assert_eq!(cfg.chat_ids, vec!["11", "22"]);
        assert_eq!(cfg.interval_secs, 15);
    }
}
