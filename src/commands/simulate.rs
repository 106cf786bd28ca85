use crate::commands::warm_history;
use crate::config::Settings;
use crate::portfolio::parse_portfolio;
use crate::simulator::SimulationRunner;
use crate::store::CsvStore;
use anyhow::Result;
use log::{info, warn};

/// Replays crossover signals for the given holdings against cached history
/// and prints the resulting trades and capital summary.
pub async fn run(
    settings: &Settings,
    portfolio_raw: &str,
    capital_override: Option<f64>,
) -> Result<()> {
    let holdings = parse_portfolio(portfolio_raw)?;
    let initial_capital = capital_override.unwrap_or(settings.initial_capital);
    let store = CsvStore::new(&settings.data_dir);
    let http = reqwest::Client::new();
    let symbols: Vec<String> = holdings.iter().map(|held| held.symbol.clone()).collect();
    warm_history(settings, &store, &http, &symbols).await;

    info!(
        "Simulating {} holding(s) with {:.2} starting capital per batch ({:?} mode)",
        holdings.len(),
        initial_capital,
        settings.capital_mode
    );

    let runner = SimulationRunner::new(
        &store,
        settings.short_window,
        settings.long_window,
        initial_capital,
        settings.capital_mode,
    );
    let report = runner.run(&holdings);

    if report.trade_history.is_empty() {
        println!("No trades executed.");
    } else {
        println!("Trade History:");
        for trade in &report.trade_history {
            println!(
                "  {} {} {} at {:.2}",
                trade.date,
                trade.action.as_str(),
                trade.symbol,
                trade.price
            );
        }
    }
    println!("Final Capital: ${:.2}", report.final_capital);
    println!("Portfolio Value: ${:.2}", report.portfolio_value);
    println!("Total Value: ${:.2}", report.total_value());

    if !report.skipped_symbols.is_empty() {
        warn!(
            "Skipped {} symbol(s) with no usable data: {}",
            report.skipped_symbols.len(),
            report.skipped_symbols.join(", ")
        );
    }
    Ok(())
}
