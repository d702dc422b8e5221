// =============================================================================
// Runtime Configuration — chart service settings with atomic save
// =============================================================================
//
// Loaded from `quote_chart.json` at startup and written back on shutdown so
// the last symbol/period/indicator selection survives a restart.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// Environment overrides live only in memory: `save` writes back the file's
// own value for any field the environment replaced and nothing since changed.
//
// =============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chart_state::ChartConfig;
use crate::indicators::IndicatorParams;
use crate::types::{ChartType, IndicatorKind, Period};

pub const ENV_API_URL: &str = "QUOTE_CHART_API_URL";
pub const ENV_API_TOKEN: &str = "QUOTE_CHART_API_TOKEN";
pub const ENV_SYMBOL: &str = "QUOTE_CHART_SYMBOL";
pub const ENV_BIND_ADDR: &str = "QUOTE_CHART_BIND_ADDR";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_symbol() -> String {
    "AAPL".to_string()
}

fn default_indicators() -> BTreeSet<IndicatorKind> {
    [IndicatorKind::Vol].into_iter().collect()
}

fn default_auto_refresh_secs() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Data source ---------------------------------------------------------

    /// Base URL of the quote API; `/api/stock/{symbol}/chart` is appended.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token for the quote API. Never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Initial chart -------------------------------------------------------

    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    #[serde(default)]
    pub default_period: Period,

    #[serde(default)]
    pub default_chart_type: ChartType,

    #[serde(default = "default_indicators")]
    pub default_indicators: BTreeSet<IndicatorKind>,

    #[serde(default)]
    pub indicator_params: IndicatorParams,

    // --- Service -------------------------------------------------------------

    /// Seconds between background refreshes; 0 disables auto-refresh.
    #[serde(default = "default_auto_refresh_secs")]
    pub auto_refresh_secs: u64,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(skip)]
    env_overrides: EnvOverrides,
}

/// A value the environment replaced, alongside the one it replaced.
#[derive(Debug, Clone, PartialEq)]
struct Overridden {
    file: String,
    env: String,
}

impl Overridden {
    fn record(slot: &mut Option<Overridden>, field: &mut String, env: String) {
        let file = match slot.take() {
            Some(prev) => prev.file,
            None => std::mem::take(field),
        };
        *field = env.clone();
        *slot = Some(Overridden { file, env });
    }

    fn restore(slot: &Option<Overridden>, field: &mut String) {
        if let Some(o) = slot {
            if *field == o.env {
                *field = o.file.clone();
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct EnvOverrides {
    api_base_url: Option<Overridden>,
    default_symbol: Option<Overridden>,
    bind_addr: Option<Overridden>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            default_symbol: default_symbol(),
            default_period: Period::default(),
            default_chart_type: ChartType::default(),
            default_indicators: default_indicators(),
            indicator_params: IndicatorParams::default(),
            auto_refresh_secs: default_auto_refresh_secs(),
            bind_addr: default_bind_addr(),
            env_overrides: EnvOverrides::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.default_symbol,
            period = %config.default_period,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let mut on_disk = self.clone();
        let overrides = &self.env_overrides;
        Overridden::restore(&overrides.api_base_url, &mut on_disk.api_base_url);
        Overridden::restore(&overrides.default_symbol, &mut on_disk.default_symbol);
        Overridden::restore(&overrides.bind_addr, &mut on_disk.bind_addr);

        let content = serde_json::to_string_pretty(&on_disk)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `QUOTE_CHART_*` overrides through `lookup`. Blank values are
    /// ignored. Replaced values are remembered for [`RuntimeConfig::save`].
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let overrides = &mut self.env_overrides;
        if let Some(url) = get(ENV_API_URL) {
            Overridden::record(&mut overrides.api_base_url, &mut self.api_base_url, url);
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(symbol) = get(ENV_SYMBOL) {
            Overridden::record(
                &mut overrides.default_symbol,
                &mut self.default_symbol,
                symbol.to_uppercase(),
            );
        }
        if let Some(addr) = get(ENV_BIND_ADDR) {
            Overridden::record(&mut overrides.bind_addr, &mut self.bind_addr, addr);
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Chart configuration the service starts with.
    pub fn initial_chart(&self) -> ChartConfig {
        ChartConfig {
            symbol: self.default_symbol.trim().to_uppercase(),
            period: self.default_period,
            chart_type: self.default_chart_type,
            enabled_indicators: self.default_indicators.clone(),
        }
    }

    /// Carry the user's latest selection into the defaults for next start.
    pub fn remember(&mut self, chart: &ChartConfig) {
        self.default_symbol = chart.symbol.clone();
        self.default_period = chart.period;
        self.default_chart_type = chart.chart_type;
        self.default_indicators = chart.enabled_indicators.clone();
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        (self.auto_refresh_secs > 0).then(|| Duration::from_secs(self.auto_refresh_secs))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.default_symbol, "AAPL");
        assert_eq!(cfg.default_period, Period::SixMonths);
        assert_eq!(cfg.default_chart_type, ChartType::Candlestick);
        assert!(cfg.default_indicators.contains(&IndicatorKind::Vol));
        assert_eq!(cfg.indicator_params.ma_period, 20);
        assert_eq!(cfg.indicator_params.rsi_period, 14);
        assert!((cfg.indicator_params.bb_k - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.auto_refresh_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "default_symbol": "MSFT",
            "default_period": "1Y",
            "default_indicators": ["MA", "RSI"],
            "indicator_params": { "ma_period": 50 },
            "auto_refresh_secs": 0
        }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_symbol, "MSFT");
        assert_eq!(cfg.default_period, Period::OneYear);
        assert_eq!(cfg.default_indicators.len(), 2);
        assert_eq!(cfg.indicator_params.ma_period, 50);
        assert_eq!(cfg.indicator_params.bb_period, 20);
        assert_eq!(cfg.auto_refresh_interval(), None);
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
    }

    #[test]
    fn token_is_not_persisted() {
        let mut cfg = RuntimeConfig::default();
        cfg.api_token = Some("secret".to_string());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn env_overrides_apply_and_skip_blanks() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "https://quotes.example.com"),
            (ENV_SYMBOL, " tsla "),
            (ENV_BIND_ADDR, "   "),
        ]
        .into_iter()
        .collect();

        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.api_base_url, "https://quotes.example.com");
        assert_eq!(cfg.default_symbol, "TSLA");
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.api_token, None);
    }

    #[test]
    fn remember_round_trips_through_initial_chart() {
        let mut cfg = RuntimeConfig::default();
        let chart = ChartConfig {
            symbol: "NVDA".to_string(),
            period: Period::FiveYears,
            chart_type: ChartType::Line,
            enabled_indicators: [IndicatorKind::Bb].into_iter().collect(),
        };
        cfg.remember(&chart);
        assert_eq!(cfg.initial_chart(), chart);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("quote-chart-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quote_chart.json");

        let mut cfg = RuntimeConfig::default();
        cfg.default_symbol = "AMZN".to_string();
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.default_symbol, "AMZN");
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn save_keeps_file_values_under_env_overrides() {
        let dir = std::env::temp_dir().join(format!("quote-chart-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quote_chart.json");

        let mut on_file = RuntimeConfig::default();
        on_file.api_base_url = "https://file.example.com".to_string();
        on_file.default_symbol = "MSFT".to_string();
        on_file.save(&path).unwrap();

        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "https://env.example.com"),
            (ENV_SYMBOL, "tsla"),
            (ENV_BIND_ADDR, "127.0.0.1:9000"),
        ]
        .into_iter()
        .collect();
        let mut cfg = RuntimeConfig::load(&path).unwrap();
        cfg.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.default_symbol, "TSLA");
        cfg.save(&path).unwrap();

        let reloaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(reloaded.api_base_url, "https://file.example.com");
        assert_eq!(reloaded.default_symbol, "MSFT");
        assert_eq!(reloaded.bind_addr, "0.0.0.0:3001");

        // A symbol the user picked after startup is still remembered.
        let mut chart = cfg.initial_chart();
        chart.symbol = "NVDA".to_string();
        cfg.remember(&chart);
        cfg.save(&path).unwrap();
        let reloaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(reloaded.default_symbol, "NVDA");
        assert_eq!(reloaded.api_base_url, "https://file.example.com");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(RuntimeConfig::load("/nonexistent/quote_chart.json").is_err());
    }
}
