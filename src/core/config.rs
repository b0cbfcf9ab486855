use anyhow::{Context, Result};
use config::{Config as ConfigSource, Environment, File};
use serde::Deserialize;

/// Full runtime configuration.
///
/// Values are layered: coded defaults, then an optional `config.toml`
/// (path overridable via `WFM_CONFIG`), then `WFM`-prefixed environment
/// variables with `__` as the section separator, e.g.
/// `WFM_SNIPER__CHECK_INTERVAL_SECS=0.5`. The watch list itself can only
/// come from the file:
///
/// ```toml
/// [[sniper.items]]
/// name = "arcane_grace"
/// price_threshold = 50
/// quantity_min = 1
/// rank = 5
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub market: MarketConfig,
    pub sniper: SniperConfig,
    pub notify: NotifyConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub rate_limit_requests: usize,
    pub rate_limit_window_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SniperConfig {
    pub check_interval_secs: f64,
    #[serde(default)]
    pub items: Vec<WatchedItem>,
}

/// One entry of the watch list. Immutable after startup; every monitoring
/// run for the item reads the same value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchedItem {
    /// URL slug of the item as warframe.market knows it.
    pub name: String,
    /// Highest acceptable price, in platinum, inclusive.
    pub price_threshold: u32,
    /// Smallest acceptable stack size. Absent means any quantity.
    #[serde(default)]
    pub quantity_min: Option<u32>,
    /// Mod rank to filter on, sent as a query parameter when present.
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub ping_discord_ids: Vec<u64>,
    pub do_audio_notification: bool,
    pub sound_path: String,
    pub copy_to_clipboard: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub health_port: u16,
    pub log_level: String,
}

fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    ConfigSource::builder()
        .set_default("market.base_url", "https://api.warframe.market/v2")?
        .set_default("market.request_timeout_secs", 10)?
        .set_default("market.rate_limit_requests", 3)?
        .set_default("market.rate_limit_window_secs", 1.0)?
        .set_default("sniper.check_interval_secs", 1.0)?
        .set_default("notify.do_audio_notification", false)?
        .set_default("notify.sound_path", "assets/cash.ogg")?
        .set_default("notify.copy_to_clipboard", true)?
        .set_default("monitoring.health_port", 3000)?
        .set_default("monitoring.log_level", "info")
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let path = std::env::var("WFM_CONFIG").unwrap_or_else(|_| "config".to_string());

        let source = builder_with_defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("WFM").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        let config: Config = source.try_deserialize().context("Invalid configuration")?;

        anyhow::ensure!(
            !config.sniper.items.is_empty(),
            "No watched items configured; add [[sniper.items]] entries to {}.toml",
            path
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Config {
        builder_with_defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("");
        assert_eq!(config.market.base_url, "https://api.warframe.market/v2");
        assert_eq!(config.market.rate_limit_requests, 3);
        assert_eq!(config.market.rate_limit_window_secs, 1.0);
        assert_eq!(config.sniper.check_interval_secs, 1.0);
        assert!(config.sniper.items.is_empty());
        assert!(config.notify.webhook_url.is_none());
        assert!(!config.notify.do_audio_notification);
        assert!(config.notify.copy_to_clipboard);
        assert_eq!(config.monitoring.health_port, 3000);
    }

    #[test]
    fn test_items_parse() {
        let config = parse(
            r#"
            [[sniper.items]]
            name = "arcane_grace"
            price_threshold = 50
            quantity_min = 1
            rank = 5

            [[sniper.items]]
            name = "primed_continuity"
            price_threshold = 40
            "#,
        );

        assert_eq!(config.sniper.items.len(), 2);
        assert_eq!(
            config.sniper.items[0],
            WatchedItem {
                name: "arcane_grace".to_string(),
                price_threshold: 50,
                quantity_min: Some(1),
                rank: Some(5),
            }
        );
        assert_eq!(config.sniper.items[1].quantity_min, None);
        assert_eq!(config.sniper.items[1].rank, None);
    }

    #[test]
    fn test_notify_section() {
        let config = parse(
            r#"
            [notify]
            webhook_url = "https://discord.com/api/webhooks/1/abc"
            ping_discord_ids = [123, 456]
            do_audio_notification = true
            "#,
        );

        assert_eq!(
            config.notify.webhook_url.as_deref(),
            Some("https://discord.com/api/webhooks/1/abc")
        );
        assert_eq!(config.notify.ping_discord_ids, vec![123, 456]);
        assert!(config.notify.do_audio_notification);
    }
}
