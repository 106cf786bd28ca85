use crate::simulator::CapitalMode;
use anyhow::{anyhow, Result};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_SHORT_WINDOW: usize = 5;
pub const DEFAULT_LONG_WINDOW: usize = 20;

/// Symbols tracked when TRACKER_SYMBOLS is not set.
pub const DEFAULT_SYMBOLS: [&str; 15] = [
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "NVDA", "META", "JPM", "V", "MA", "PYPL", "BAC",
    "DIS", "NFLX", "INTC",
];

/// Runtime settings, read from the environment after `dotenvy::dotenv()` has
/// merged any `.env` file. Every value has a default except the provider API
/// key, which is only required by commands that actually fetch.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub symbols: Vec<String>,
    pub initial_capital: f64,
    pub short_window: usize,
    pub long_window: usize,
    pub capital_mode: CapitalMode,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = optional_setting(&lookup, "ALPHA_VANTAGE_API_KEY");
        let base_url = optional_setting(&lookup, "TRACKER_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let data_dir = optional_setting(&lookup, "TRACKER_DATA_DIR")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
            .into();
        let symbols = match optional_setting(&lookup, "TRACKER_SYMBOLS") {
            Some(raw) => parse_symbol_list(&raw)?,
            None => DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };
        let initial_capital = setting_f64(
            &lookup,
            "TRACKER_INITIAL_CAPITAL",
            DEFAULT_INITIAL_CAPITAL,
            Some(0.0),
        )?;
        let short_window = setting_usize(&lookup, "TRACKER_SHORT_WINDOW", DEFAULT_SHORT_WINDOW, 1)?;
        let long_window = setting_usize(&lookup, "TRACKER_LONG_WINDOW", DEFAULT_LONG_WINDOW, 1)?;
        if short_window >= long_window {
            return Err(anyhow!(
                "TRACKER_SHORT_WINDOW ({}) must be < TRACKER_LONG_WINDOW ({})",
                short_window,
                long_window
            ));
        }
        let capital_mode = if setting_bool(&lookup, "TRACKER_POOL_CAPITAL", false)? {
            CapitalMode::Pooled
        } else {
            CapitalMode::LastBatch
        };

        Ok(Self {
            api_key,
            base_url,
            data_dir,
            symbols,
            initial_capital,
            short_window,
            long_window,
            capital_mode,
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Missing required setting ALPHA_VANTAGE_API_KEY"))
    }
}

/// Parses a comma-separated symbol list, trimming and uppercasing each entry.
pub fn parse_symbol_list(raw: &str) -> Result<Vec<String>> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(|part| part.trim().to_uppercase())
        .filter(|part| !part.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(anyhow!("Symbol list must contain at least one symbol"));
    }
    Ok(symbols)
}

fn optional_setting<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn setting_f64<F>(lookup: &F, key: &str, default: f64, min: Option<f64>) -> Result<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match optional_setting(lookup, key) {
        Some(raw) => raw,
        None => return Ok(default),
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() {
        return Err(anyhow!("Setting {} must be finite (value: {})", key, raw));
    }
    if let Some(min_value) = min {
        if value < min_value {
            return Err(anyhow!(
                "Setting {} must be >= {} (value: {})",
                key,
                min_value,
                raw
            ));
        }
    }
    Ok(value)
}

fn setting_usize<F>(lookup: &F, key: &str, default: usize, min: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match optional_setting(lookup, key) {
        Some(raw) => raw,
        None => return Ok(default),
    };
    let value = raw
        .parse::<usize>()
        .map_err(|_| anyhow!("Setting {} must be an integer (value: {})", key, raw))?;
    if value < min {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(value)
}

fn setting_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match optional_setting(lookup, key) {
        Some(raw) => raw,
        None => return Ok(default),
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(anyhow!(
            "Setting {} must be a boolean (value: {})",
            key,
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert!(settings.api_key.is_none());
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.symbols.len(), 15);
        assert_eq!(settings.symbols[0], "AAPL");
        assert!((settings.initial_capital - 10_000.0).abs() < 1e-9);
        assert_eq!(settings.short_window, 5);
        assert_eq!(settings.long_window, 20);
        assert_eq!(settings.capital_mode, CapitalMode::LastBatch);
        assert!(settings.require_api_key().is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("ALPHA_VANTAGE_API_KEY", "demo"),
            ("TRACKER_SYMBOLS", "aapl, msft"),
            ("TRACKER_INITIAL_CAPITAL", "2500"),
            ("TRACKER_SHORT_WINDOW", "3"),
            ("TRACKER_LONG_WINDOW", "7"),
            ("TRACKER_POOL_CAPITAL", "true"),
        ])
        .unwrap();
        assert_eq!(settings.require_api_key().unwrap(), "demo");
        assert_eq!(settings.symbols, vec!["AAPL", "MSFT"]);
        assert!((settings.initial_capital - 2500.0).abs() < 1e-9);
        assert_eq!(settings.short_window, 3);
        assert_eq!(settings.long_window, 7);
        assert_eq!(settings.capital_mode, CapitalMode::Pooled);
    }

    #[test]
    fn test_short_window_must_be_below_long() {
        let error = settings_from(&[("TRACKER_SHORT_WINDOW", "20")]).unwrap_err();
        assert!(error.to_string().contains("TRACKER_SHORT_WINDOW"));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(settings_from(&[("TRACKER_INITIAL_CAPITAL", "lots")]).is_err());
        assert!(settings_from(&[("TRACKER_INITIAL_CAPITAL", "-5")]).is_err());
        assert!(settings_from(&[("TRACKER_SHORT_WINDOW", "0")]).is_err());
        assert!(settings_from(&[("TRACKER_POOL_CAPITAL", "maybe")]).is_err());
    }

    #[test]
    fn test_symbol_list_parsing() {
        assert_eq!(
            parse_symbol_list("aapl, msft ,tsla").unwrap(),
            vec!["AAPL", "MSFT", "TSLA"]
        );
        assert!(parse_symbol_list(" , ,").is_err());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let settings = settings_from(&[("TRACKER_INITIAL_CAPITAL", "  ")]).unwrap();
        assert!((settings.initial_capital - 10_000.0).abs() < 1e-9);
    }
}
