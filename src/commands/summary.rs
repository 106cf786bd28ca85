use crate::commands::warm_history;
use crate::config::Settings;
use crate::errors::DataError;
use crate::performance::{portfolio_performance, PricePair};
use crate::portfolio::parse_portfolio;
use crate::quotes::QuoteClient;
use crate::store::CsvStore;
use anyhow::Result;
use log::warn;
use std::collections::HashMap;

/// Prints per-symbol and whole-portfolio gain/loss for the given holdings,
/// comparing the earliest cached open against the latest real-time quote.
pub async fn run(settings: &Settings, portfolio_raw: &str) -> Result<()> {
    let holdings = parse_portfolio(portfolio_raw)?;
    let store = CsvStore::new(&settings.data_dir);
    let http = reqwest::Client::new();
    let symbols: Vec<String> = holdings.iter().map(|held| held.symbol.clone()).collect();
    warm_history(settings, &store, &http, &symbols).await;

    let client = settings
        .api_key
        .as_deref()
        .map(|key| QuoteClient::new(&http, &settings.base_url, key));

    let mut prices: HashMap<String, PricePair> = HashMap::new();
    for symbol in &symbols {
        match resolve_pair(&store, client.as_ref(), symbol).await {
            Ok(pair) => {
                prices.insert(symbol.clone(), pair);
            }
            Err(error) => warn!("{}: no prices for summary: {}", symbol, error),
        }
    }

    let performance = portfolio_performance(&holdings, |symbol| prices.get(symbol).copied());

    println!("Portfolio Summary:");
    for entry in &performance.symbols {
        println!(
            "  {}: {} share(s), {:.2} -> {:.2} ({:+.2}%)",
            entry.symbol,
            entry.shares,
            entry.baseline_price,
            entry.current_price,
            entry.gain_loss_percent
        );
    }
    println!("Initial Value: ${:.2}", performance.initial_value);
    println!("Current Value: ${:.2}", performance.current_value);
    println!("Gain/Loss: {:+.2}%", performance.gain_loss_percent);

    if !performance.skipped_symbols.is_empty() {
        warn!(
            "Summary excludes {} symbol(s) with unresolved prices: {}",
            performance.skipped_symbols.len(),
            performance.skipped_symbols.join(", ")
        );
    }
    Ok(())
}

/// Baseline comes from the oldest cached daily bar; the current price from
/// the quotes cache, falling back to a provider fetch when a key is set.
async fn resolve_pair(
    store: &CsvStore,
    client: Option<&QuoteClient<'_>>,
    symbol: &str,
) -> Result<PricePair, DataError> {
    let series = store.load_historical(symbol)?;
    let baseline = series
        .first_bar()
        .map(|bar| bar.open)
        .ok_or_else(|| DataError::unavailable(symbol, "cached history is empty"))?;
    let current = match client {
        Some(client) => store.quote(client, symbol).await?.price,
        None => {
            store
                .cached_quote(symbol)?
                .ok_or_else(|| {
                    DataError::unavailable(
                        symbol,
                        "no cached quote and ALPHA_VANTAGE_API_KEY is not set",
                    )
                })?
                .price
        }
    };
    Ok(PricePair { baseline, current })
}
