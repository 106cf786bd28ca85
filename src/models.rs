use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One trading day of OHLCV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Date-ordered OHLCV history for one symbol. Bars are strictly increasing by
/// date with no duplicates; the constructor rejects anything else, so every
/// consumer can rely on the ordering.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
        let symbol = symbol.into();
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                bail!(
                    "price series for {} is not strictly ascending: {} followed by {}",
                    symbol,
                    pair[0].date,
                    pair[1].date
                );
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    /// Close price on an exact trading day, if the series has that day.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.bars
            .binary_search_by(|bar| bar.date.cmp(&date))
            .ok()
            .map(|index| self.bars[index].close)
    }

    pub fn first_bar(&self) -> Option<&PriceBar> {
        self.bars.first()
    }

    pub fn last_bar(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Sell,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "BUY",
            SignalAction::Sell => "SELL",
        }
    }
}

impl FromStr for SignalAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(SignalAction::Buy),
            "SELL" => Ok(SignalAction::Sell),
            other => Err(anyhow!("Unknown signal action '{}'", other)),
        }
    }
}

/// A crossover event for one symbol on one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub date: NaiveDate,
    pub action: SignalAction,
}

/// One executed unit-share trade, appended in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub action: SignalAction,
    pub price: f64,
}

/// Share count held for one symbol. The ledger never stores a zero-share
/// entry; reaching zero removes the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsEntry {
    pub symbol: String,
    pub shares: u32,
}

/// Cash balance plus the per-symbol share ledger. Mutated only by the
/// backtest engine during signal execution.
#[derive(Debug, Clone)]
pub struct PortfolioAccount {
    pub cash: f64,
    holdings: Vec<HoldingsEntry>,
}

impl PortfolioAccount {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            holdings: Vec::new(),
        }
    }

    /// Seeds the ledger from an initial portfolio, dropping zero-share rows.
    pub fn with_holdings(cash: f64, holdings: Vec<HoldingsEntry>) -> Self {
        let holdings = holdings
            .into_iter()
            .filter(|entry| entry.shares > 0)
            .collect();
        Self { cash, holdings }
    }

    pub fn holdings(&self) -> &[HoldingsEntry] {
        &self.holdings
    }

    pub fn shares_of(&self, symbol: &str) -> u32 {
        self.holdings
            .iter()
            .find(|entry| entry.symbol == symbol)
            .map(|entry| entry.shares)
            .unwrap_or(0)
    }

    /// Adds one share, creating the ledger entry when the symbol is new.
    pub fn add_share(&mut self, symbol: &str) {
        match self
            .holdings
            .iter_mut()
            .find(|entry| entry.symbol == symbol)
        {
            Some(entry) => entry.shares += 1,
            None => self.holdings.push(HoldingsEntry {
                symbol: symbol.to_string(),
                shares: 1,
            }),
        }
    }

    /// Removes one share. Returns false when nothing is held; a row that
    /// reaches zero shares is deleted from the ledger.
    pub fn remove_share(&mut self, symbol: &str) -> bool {
        let Some(index) = self
            .holdings
            .iter()
            .position(|entry| entry.symbol == symbol && entry.shares > 0)
        else {
            return false;
        };
        self.holdings[index].shares -= 1;
        if self.holdings[index].shares == 0 {
            self.holdings.remove(index);
        }
        true
    }
}
