use crate::errors::SkipReason;
use crate::models::{PortfolioAccount, PriceSeries, Signal, SignalAction, TradeRecord};
use chrono::NaiveDate;
use log::{debug, warn};

/// Outcome of presenting one signal to the engine. Skips are expected
/// backtest results, inspectable by the caller, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Executed(TradeRecord),
    Skipped(SkipReason),
}

impl Execution {
    pub fn is_executed(&self) -> bool {
        matches!(self, Execution::Executed(_))
    }
}

/// Result of replaying one batch of signals against one price series.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub final_capital: f64,
    pub final_valuation: f64,
    pub trades: Vec<TradeRecord>,
    pub outcomes: Vec<Execution>,
}

/// Sequential signal executor over a cash balance and share ledger. One
/// engine owns the account for a whole simulation run: the ledger carries
/// across batches while capital is reset at the start of each batch.
pub struct BacktestEngine {
    account: PortfolioAccount,
}

impl BacktestEngine {
    pub fn new(account: PortfolioAccount) -> Self {
        Self { account }
    }

    pub fn account(&self) -> &PortfolioAccount {
        &self.account
    }

    pub fn into_account(self) -> PortfolioAccount {
        self.account
    }

    /// Executes one unit-share signal against the account. Every skip leaves
    /// the account exactly as it was.
    pub fn execute(&mut self, signal: &Signal, series: &PriceSeries) -> Execution {
        let Some(close) = series.close_on(signal.date) else {
            let reason = SkipReason::MissingData {
                symbol: signal.symbol.clone(),
                date: signal.date,
            };
            warn!(
                "Skipping {} signal for {}: {}",
                signal.action.as_str(),
                signal.symbol,
                reason
            );
            return Execution::Skipped(reason);
        };

        match signal.action {
            SignalAction::Buy => {
                if self.account.cash < close {
                    let reason = SkipReason::InsufficientFunds {
                        required: close,
                        available: self.account.cash,
                    };
                    warn!("Skipping BUY {} on {}: {}", signal.symbol, signal.date, reason);
                    return Execution::Skipped(reason);
                }
                self.account.cash -= close;
                self.account.add_share(&signal.symbol);
            }
            SignalAction::Sell => {
                if !self.account.remove_share(&signal.symbol) {
                    let reason = SkipReason::NoHoldings {
                        symbol: signal.symbol.clone(),
                    };
                    warn!(
                        "Skipping SELL {} on {}: {}",
                        signal.symbol, signal.date, reason
                    );
                    return Execution::Skipped(reason);
                }
                self.account.cash += close;
            }
        }

        debug!(
            "Executed {} {} x1 @ {:.2} on {} (cash now {:.2})",
            signal.action.as_str(),
            signal.symbol,
            close,
            signal.date,
            self.account.cash
        );
        Execution::Executed(TradeRecord {
            date: signal.date,
            symbol: signal.symbol.clone(),
            action: signal.action,
            price: close,
        })
    }

    /// Marks every ledger entry to market at the close of `as_of` taken from
    /// `series`. Pure read. When the series has no bar on that date the
    /// holdings are valued at zero rather than failing the batch.
    pub fn valuation(&self, series: &PriceSeries, as_of: NaiveDate) -> f64 {
        let Some(close) = series.close_on(as_of) else {
            if !self.account.holdings().is_empty() {
                warn!(
                    "No close on {} in the {} series; valuing holdings at zero",
                    as_of,
                    series.symbol()
                );
            }
            return 0.0;
        };
        self.account
            .holdings()
            .iter()
            .map(|entry| f64::from(entry.shares) * close)
            .sum()
    }

    /// Replays one batch of signals in order. `initial_capital` resets the
    /// cash balance for this batch; holdings carry over from earlier batches.
    /// The valuation snapshot is taken once, after all signals, at the date
    /// of the last signal in the batch (the series' final bar when the batch
    /// is empty).
    pub fn run_batch(
        &mut self,
        signals: &[Signal],
        series: &PriceSeries,
        initial_capital: f64,
    ) -> BatchOutcome {
        self.account.cash = initial_capital;

        let mut trades = Vec::new();
        let mut outcomes = Vec::with_capacity(signals.len());
        for signal in signals {
            let outcome = self.execute(signal, series);
            if let Execution::Executed(record) = &outcome {
                trades.push(record.clone());
            }
            outcomes.push(outcome);
        }

        let as_of = signals
            .last()
            .map(|signal| signal.date)
            .or_else(|| series.last_bar().map(|bar| bar.date));
        let final_valuation = match as_of {
            Some(date) => self.valuation(series, date),
            None => 0.0,
        };

        BatchOutcome {
            final_capital: self.account.cash,
            final_valuation,
            trades,
            outcomes,
        }
    }
}
