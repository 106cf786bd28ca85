use crate::models::HoldingsEntry;
use log::warn;

/// Resolved prices for one symbol: the earliest cached open (the baseline)
/// and the latest real-time quote.
#[derive(Debug, Clone, Copy)]
pub struct PricePair {
    pub baseline: f64,
    pub current: f64,
}

#[derive(Debug, Clone)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub shares: u32,
    pub baseline_price: f64,
    pub current_price: f64,
    pub gain_loss_percent: f64,
}

#[derive(Debug, Clone)]
pub struct PortfolioPerformance {
    pub initial_value: f64,
    pub current_value: f64,
    pub gain_loss_percent: f64,
    pub symbols: Vec<SymbolPerformance>,
    pub skipped_symbols: Vec<String>,
}

/// Values a portfolio against its baseline. Symbols whose prices cannot be
/// resolved are skipped with a warning and excluded from both totals. A zero
/// baseline reports a gain of zero instead of dividing by it.
pub fn portfolio_performance<F>(portfolio: &[HoldingsEntry], mut prices: F) -> PortfolioPerformance
where
    F: FnMut(&str) -> Option<PricePair>,
{
    let mut initial_value = 0.0;
    let mut current_value = 0.0;
    let mut symbols = Vec::new();
    let mut skipped_symbols = Vec::new();

    for entry in portfolio {
        let Some(pair) = prices(&entry.symbol) else {
            warn!(
                "Skipping {} in performance summary: no price data",
                entry.symbol
            );
            skipped_symbols.push(entry.symbol.clone());
            continue;
        };

        let shares = f64::from(entry.shares);
        initial_value += pair.baseline * shares;
        current_value += pair.current * shares;
        symbols.push(SymbolPerformance {
            symbol: entry.symbol.clone(),
            shares: entry.shares,
            baseline_price: pair.baseline,
            current_price: pair.current,
            gain_loss_percent: percent_change(pair.baseline, pair.current),
        });
    }

    PortfolioPerformance {
        initial_value,
        current_value,
        gain_loss_percent: percent_change(initial_value, current_value),
        symbols,
        skipped_symbols,
    }
}

/// Percentage change from `from` to `to`. A zero starting value is reported
/// as 0% rather than raising a division fault.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        warn!("Zero baseline value; reporting 0% change");
        return 0.0;
    }
    (to - from) / from * 100.0
}
