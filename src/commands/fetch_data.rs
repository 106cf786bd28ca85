use crate::commands::resolve_symbols;
use crate::config::Settings;
use crate::quotes::QuoteClient;
use crate::store::CsvStore;
use anyhow::Result;
use log::{info, warn};

/// Refreshes the on-disk cache: one real-time quote per symbol into the
/// shared quotes file, and one rewritten daily history file per symbol.
/// Unlike the on-miss paths this always refetches.
pub async fn run(settings: &Settings, symbol_override: Option<&str>) -> Result<()> {
    let symbols = resolve_symbols(settings, symbol_override)?;
    let api_key = settings.require_api_key()?;
    let store = CsvStore::new(&settings.data_dir);
    let http = reqwest::Client::new();
    let client = QuoteClient::new(&http, &settings.base_url, api_key);

    info!(
        "Fetching quotes and daily history for {} symbol(s)",
        symbols.len()
    );

    let mut quotes = Vec::new();
    let mut failures = 0;
    for symbol in &symbols {
        match client.global_quote(symbol).await {
            Ok(quote) => {
                info!("{}: quote {:.2}", quote.symbol, quote.price);
                quotes.push(quote);
            }
            Err(error) => {
                warn!("{}: quote fetch failed: {}", symbol, error);
                failures += 1;
            }
        }
    }
    store.write_quotes(&quotes)?;

    let mut histories = 0;
    for symbol in &symbols {
        match client.daily_series(symbol).await {
            Ok(series) => {
                store.save_historical(&series)?;
                info!("{}: saved {} daily bar(s)", series.symbol(), series.len());
                histories += 1;
            }
            Err(error) => {
                warn!("{}: history fetch failed: {}", symbol, error);
                failures += 1;
            }
        }
    }

    info!(
        "Fetch completed into {}: {} quote(s), {} history file(s), {} failure(s)",
        store.data_dir().display(),
        quotes.len(),
        histories,
        failures
    );
    Ok(())
}
