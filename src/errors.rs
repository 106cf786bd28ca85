use chrono::NaiveDate;

/// Why the engine declined to execute a signal. These are expected backtest
/// outcomes rather than failures: the batch logs a warning and continues.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The signal's date has no bar in the price series.
    #[error("no close price on {date} for {symbol}")]
    MissingData { symbol: String, date: NaiveDate },

    /// Executing the buy would overdraw the cash balance.
    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    /// A sell arrived with no shares of the symbol on the ledger.
    #[error("no holdings of {symbol} to sell")]
    NoHoldings { symbol: String },
}

/// Failure to obtain price data for a symbol. The simulation runner skips
/// the symbol and keeps the run going.
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("no price data available for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DataError {
    pub fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        DataError::Unavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}
