use crate::backtester::BacktestEngine;
use crate::errors::DataError;
use crate::models::{HoldingsEntry, PortfolioAccount, PriceSeries, Signal, TradeRecord};
use crate::signals::generate_signals;
use log::{info, warn};

/// Source of price history for the runner. The CSV store implements this in
/// production; tests drop in an in-memory map. Implementations must return
/// already-materialized series: the runner itself never touches the network.
pub trait PriceSource {
    fn price_series(&self, symbol: &str) -> Result<PriceSeries, DataError>;
}

/// How per-batch capital figures roll up into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapitalMode {
    /// Reported capital is the final batch's balance; earlier batches are
    /// overwritten. Mirrors the original aggregation.
    LastBatch,
    /// Batch balances are summed instead.
    Pooled,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub final_capital: f64,
    pub portfolio_value: f64,
    pub trade_history: Vec<TradeRecord>,
    pub signals: Vec<Signal>,
    pub skipped_symbols: Vec<String>,
    pub capital_mode: CapitalMode,
}

impl SimulationReport {
    pub fn total_value(&self) -> f64 {
        self.final_capital + self.portfolio_value
    }
}

/// Orchestrates signal generation and batch execution across a portfolio.
/// Every symbol's batch replays the full combined signal list against that
/// symbol's own price series, sharing one holdings ledger throughout.
pub struct SimulationRunner<'a, S: PriceSource> {
    source: &'a S,
    short_window: usize,
    long_window: usize,
    initial_capital: f64,
    capital_mode: CapitalMode,
}

impl<'a, S: PriceSource> SimulationRunner<'a, S> {
    pub fn new(
        source: &'a S,
        short_window: usize,
        long_window: usize,
        initial_capital: f64,
        capital_mode: CapitalMode,
    ) -> Self {
        Self {
            source,
            short_window,
            long_window,
            initial_capital,
            capital_mode,
        }
    }

    /// Runs the full simulation. Symbols whose data cannot be obtained are
    /// skipped with a warning; the run itself always completes and returns a
    /// (possibly partial) report.
    pub fn run(&self, portfolio: &[HoldingsEntry]) -> SimulationReport {
        let mut loaded: Vec<(String, PriceSeries)> = Vec::new();
        let mut signals: Vec<Signal> = Vec::new();
        let mut skipped_symbols = Vec::new();

        for entry in portfolio {
            match self.source.price_series(&entry.symbol) {
                Ok(series) => {
                    let symbol_signals =
                        generate_signals(&series, self.short_window, self.long_window);
                    info!(
                        "{}: {} crossover signal(s) from {} bars",
                        entry.symbol,
                        symbol_signals.len(),
                        series.len()
                    );
                    signals.extend(symbol_signals);
                    loaded.push((entry.symbol.clone(), series));
                }
                Err(error) => {
                    warn!("Skipping {}: {}", entry.symbol, error);
                    skipped_symbols.push(entry.symbol.clone());
                }
            }
        }

        // The ledger is seeded from the caller's whole portfolio, including
        // symbols whose data failed; their shares still count in valuations.
        let account = PortfolioAccount::with_holdings(self.initial_capital, portfolio.to_vec());
        let mut engine = BacktestEngine::new(account);

        let mut final_capital = 0.0;
        let mut portfolio_value = 0.0;
        let mut trade_history = Vec::new();

        for (symbol, series) in &loaded {
            let outcome = engine.run_batch(&signals, series, self.initial_capital);
            info!(
                "{} batch: {} of {} signal(s) executed, capital {:.2}, valuation {:.2}",
                symbol,
                outcome.trades.len(),
                signals.len(),
                outcome.final_capital,
                outcome.final_valuation
            );
            match self.capital_mode {
                CapitalMode::LastBatch => final_capital = outcome.final_capital,
                CapitalMode::Pooled => final_capital += outcome.final_capital,
            }
            portfolio_value += outcome.final_valuation;
            trade_history.extend(outcome.trades);
        }

        SimulationReport {
            final_capital,
            portfolio_value,
            trade_history,
            signals,
            skipped_symbols,
            capital_mode: self.capital_mode,
        }
    }
}
