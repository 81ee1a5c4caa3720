use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Which strategy the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Z-score mean reversion with delta-targeted option entry.
    GammaSnap,
    /// Hourly cheap-straddle entry.
    Straddle,
}

/// The flat settings record persisted to `settings.json`.
///
/// All strategy knobs are mutable at runtime via `EngineCommand::ApplySettings`;
/// `save`/`load` round-trip the record without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub strategy: StrategyKind,
    /// Volatility index level above which new entries pause.
    pub vix_threshold: f64,
    /// Z-score rolling lookback in bars.
    pub z_score_period: usize,
    /// Entry trigger band in z-score units.
    pub z_score_threshold: f64,
    /// Span of the fast EMA used as the profit target.
    pub ema_span: usize,
    pub time_stop_minutes: i64,
    pub trade_qty: u32,
    /// Trading window, inclusive start hour to exclusive end hour.
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    /// Working orders are cancelled after this many seconds without a fill.
    pub order_timeout_secs: i64,
    /// Absolute delta magnitude targeted when selecting the entry contract.
    pub target_delta: f64,
    /// Ceiling on the ask price of each straddle leg.
    pub straddle_max_ask: f64,
    /// ATR lookback for the straddle leg supertrend exit.
    pub atr_period: usize,
    /// ATR multiple placed around the bar midpoint for the supertrend bands.
    pub chandelier_multiplier: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7497,
            strategy: StrategyKind::GammaSnap,
            vix_threshold: 25.0,
            z_score_period: 20,
            z_score_threshold: 2.5,
            ema_span: 9,
            time_stop_minutes: 5,
            trade_qty: 1,
            window_start_hour: 9,
            window_end_hour: 15,
            order_timeout_secs: 60,
            target_delta: 0.45,
            straddle_max_ask: 0.50,
            atr_period: 14,
            chandelier_multiplier: 3.0,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No settings file found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Persist settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Basic sanity checks on values that would break the indicator math.
    pub fn validate(&self) -> Result<()> {
        if self.z_score_period < 2 {
            return Err(Error::Config("z_score_period must be >= 2".into()));
        }
        if self.z_score_threshold <= 0.0 {
            return Err(Error::Config("z_score_threshold must be > 0".into()));
        }
        if self.ema_span == 0 {
            return Err(Error::Config("ema_span must be >= 1".into()));
        }
        if self.window_start_hour >= self.window_end_hour {
            return Err(Error::Config(
                "window_start_hour must be before window_end_hour".into(),
            ));
        }
        if self.atr_period < 2 {
            return Err(Error::Config("atr_period must be >= 2".into()));
        }
        Ok(())
    }
}

/// Process-level configuration read from the environment at startup.
/// Strategy knobs do not live here; they belong to [`Settings`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Path of the persisted settings record.
    pub settings_path: String,
    /// Strategy evaluation cadence in seconds.
    pub cycle_secs: u64,
}

impl ProcessConfig {
    /// Load from environment variables, reading `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Self {
            settings_path: std::env::var("SETTINGS_PATH")
                .unwrap_or_else(|_| "settings.json".to_string()),
            cycle_secs: std::env::var("CYCLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_is_lossless() {
        let mut settings = Settings::default();
        settings.z_score_threshold = 1.75;
        settings.strategy = StrategyKind::Straddle;
        settings.trade_qty = 3;

        let path = std::env::temp_dir().join("gammasnap_settings_roundtrip.json");
        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings, loaded);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let loaded = Settings::load("/nonexistent/settings.json").unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn defaults_match_reference_values() {
        let s = Settings::default();
        assert_eq!(s.z_score_period, 20);
        assert!((s.z_score_threshold - 2.5).abs() < f64::EPSILON);
        assert!((s.vix_threshold - 25.0).abs() < f64::EPSILON);
        assert_eq!(s.time_stop_minutes, 5);
        assert_eq!(s.trade_qty, 1);
        assert!((s.target_delta - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_degenerate_lookback() {
        let mut s = Settings::default();
        s.z_score_period = 1;
        assert!(s.validate().is_err());
        s.z_score_period = 20;
        s.z_score_threshold = 0.0;
        assert!(s.validate().is_err());
    }
}
