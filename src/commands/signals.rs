use crate::commands::{resolve_symbols, warm_history};
use crate::config::Settings;
use crate::signals::generate_signals;
use crate::simulator::PriceSource;
use crate::store::CsvStore;
use anyhow::Result;
use log::{info, warn};

/// Prints crossover signals for each symbol's cached daily history, fetching
/// any history that is not cached yet.
pub async fn run(settings: &Settings, symbol_override: Option<&str>) -> Result<()> {
    let symbols = resolve_symbols(settings, symbol_override)?;
    let store = CsvStore::new(&settings.data_dir);
    let http = reqwest::Client::new();
    warm_history(settings, &store, &http, &symbols).await;

    info!(
        "Generating {}/{} day crossover signals for {} symbol(s)",
        settings.short_window,
        settings.long_window,
        symbols.len()
    );

    let mut total = 0;
    for symbol in &symbols {
        let series = match store.price_series(symbol) {
            Ok(series) => series,
            Err(error) => {
                warn!("{}: skipped: {}", symbol, error);
                continue;
            }
        };
        let signals = generate_signals(&series, settings.short_window, settings.long_window);
        if signals.is_empty() {
            info!("{}: no crossovers in {} bar(s)", series.symbol(), series.len());
            continue;
        }
        for signal in &signals {
            println!(
                "Stock: {}, Date: {}, Signal: {}",
                signal.symbol,
                signal.date,
                signal.action.as_str()
            );
        }
        total += signals.len();
    }

    info!("Generated {} signal(s)", total);
    Ok(())
}
