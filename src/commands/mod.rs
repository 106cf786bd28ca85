pub mod fetch_data;
pub mod signals;
pub mod simulate;
pub mod summary;

use crate::config::{self, Settings};
use crate::quotes::QuoteClient;
use crate::store::CsvStore;
use anyhow::Result;
use log::warn;

/// Resolves the symbol list for a command: an explicit comma-separated
/// override wins, otherwise the configured list is used.
fn resolve_symbols(settings: &Settings, symbol_override: Option<&str>) -> Result<Vec<String>> {
    match symbol_override {
        Some(raw) => config::parse_symbol_list(raw),
        None => Ok(settings.symbols.clone()),
    }
}

/// Fetch-on-miss warmup for the symbols a command is about to read. Already
/// cached symbols are never refreshed, so the API key is only required when
/// something is actually missing. Returns the symbols that could not be
/// fetched.
async fn warm_history(
    settings: &Settings,
    store: &CsvStore,
    http: &reqwest::Client,
    symbols: &[String],
) -> Vec<String> {
    let missing: Vec<String> = symbols
        .iter()
        .filter(|symbol| !store.has_historical(symbol))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Vec::new();
    }

    let api_key = match settings.require_api_key() {
        Ok(key) => key,
        Err(error) => {
            warn!(
                "Cannot fetch history for {} uncached symbol(s): {}",
                missing.len(),
                error
            );
            return missing;
        }
    };

    let client = QuoteClient::new(http, &settings.base_url, api_key);
    let mut failed = Vec::new();
    for symbol in &missing {
        if let Err(error) = store.ensure_historical(&client, symbol).await {
            warn!("{}: history fetch failed: {}", symbol, error);
            failed.push(symbol.clone());
        }
    }
    failed
}
