use crate::errors::DataError;
use crate::models::{PriceBar, PriceSeries};
use crate::quotes::{Quote, QuoteClient};
use crate::simulator::PriceSource;
use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const QUOTES_FILE: &str = "quotes.csv";
const HISTORICAL_DIR: &str = "historical";

/// One row of the shared real-time quotes file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRow {
    pub symbol: String,
    pub price: f64,
    pub volume: i64,
    pub fetched_at: DateTime<Utc>,
}

/// On-disk CSV cache rooted at a data directory: one shared quotes file plus
/// one historical file per symbol under `historical/`. The policy throughout
/// is fetch-on-miss, never refresh-on-hit: whatever is cached is served as-is
/// until the file is deleted or an explicit refresh command rewrites it.
pub struct CsvStore {
    data_dir: PathBuf,
}

impl CsvStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn quotes_path(&self) -> PathBuf {
        self.data_dir.join(QUOTES_FILE)
    }

    fn historical_path(&self, symbol: &str) -> PathBuf {
        self.data_dir
            .join(HISTORICAL_DIR)
            .join(format!("{}.csv", symbol.to_uppercase()))
    }

    pub fn has_historical(&self, symbol: &str) -> bool {
        self.historical_path(symbol).is_file()
    }

    /// Reads a cached series from disk. This never touches the network; a
    /// missing file is reported as unavailable so the caller can decide
    /// whether to fetch.
    pub fn load_historical(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.historical_path(symbol);
        if !path.is_file() {
            return Err(DataError::unavailable(symbol, "no cached history"));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut bars = Vec::new();
        for record in reader.deserialize::<PriceBar>() {
            bars.push(record?);
        }
        // Files written by older tools may be newest-first; sort so the
        // series constructor sees ascending dates either way.
        bars.sort_by_key(|bar| bar.date);
        let series = PriceSeries::new(symbol.to_uppercase(), bars)
            .with_context(|| format!("invalid cached history in {}", path.display()))?;
        Ok(series)
    }

    /// Writes a series to its per-symbol file, ascending by date, replacing
    /// any previous contents.
    pub fn save_historical(&self, series: &PriceSeries) -> Result<(), DataError> {
        let path = self.historical_path(series.symbol());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&path)?;
        for bar in series.bars() {
            writer.serialize(bar)?;
        }
        writer.flush()?;
        debug!(
            "Saved {} bars for {} to {}",
            series.len(),
            series.symbol(),
            path.display()
        );
        Ok(())
    }

    /// Fetch-on-miss for one symbol's history. A cached file is left exactly
    /// as it is, even if stale.
    pub async fn ensure_historical(
        &self,
        client: &QuoteClient<'_>,
        symbol: &str,
    ) -> Result<(), DataError> {
        if self.has_historical(symbol) {
            debug!("{}: historical cache hit", symbol);
            return Ok(());
        }
        info!("{}: no cached history, fetching from provider", symbol);
        let series = client.daily_series(symbol).await?;
        self.save_historical(&series)
    }

    /// Scans the quotes file for a symbol's most recently appended row.
    pub fn cached_quote(&self, symbol: &str) -> Result<Option<QuoteRow>, DataError> {
        let path = self.quotes_path();
        if !path.is_file() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut found = None;
        for record in reader.deserialize::<QuoteRow>() {
            let row = record?;
            if row.symbol.eq_ignore_ascii_case(symbol) {
                found = Some(row);
            }
        }
        Ok(found)
    }

    /// Appends one quote row, stamping the fetch time. Creates the file with
    /// a header on first use.
    pub fn append_quote(&self, quote: &Quote) -> Result<QuoteRow, DataError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.quotes_path();
        let write_header = !path.is_file();

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        let row = QuoteRow {
            symbol: quote.symbol.to_uppercase(),
            price: quote.price,
            volume: quote.volume,
            fetched_at: Utc::now(),
        };
        writer.serialize(&row)?;
        writer.flush()?;
        Ok(row)
    }

    /// Replaces the whole quotes file with a freshly fetched batch.
    pub fn write_quotes(&self, quotes: &[Quote]) -> Result<(), DataError> {
        fs::create_dir_all(&self.data_dir)?;
        let mut writer = csv::Writer::from_path(self.quotes_path())?;
        let fetched_at = Utc::now();
        for quote in quotes {
            writer.serialize(QuoteRow {
                symbol: quote.symbol.to_uppercase(),
                price: quote.price,
                volume: quote.volume,
                fetched_at,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Real-time quote with fetch-on-miss: a cached row is returned without
    /// asking the provider again.
    pub async fn quote(
        &self,
        client: &QuoteClient<'_>,
        symbol: &str,
    ) -> Result<QuoteRow, DataError> {
        if let Some(row) = self.cached_quote(symbol)? {
            debug!("{}: quote cache hit at {:.2}", symbol, row.price);
            return Ok(row);
        }
        info!("{}: no cached quote, fetching from provider", symbol);
        let fetched = client.global_quote(symbol).await?;
        self.append_quote(&fetched)
    }
}

impl PriceSource for CsvStore {
    fn price_series(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        self.load_historical(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::TempDir;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: date.parse().unwrap(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 42_000,
        }
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::new(
            "AAPL",
            vec![
                bar("2024-01-02", 180.0),
                bar("2024-01-03", 182.5),
                bar("2024-01-04", 181.25),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_historical_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());

        store.save_historical(&sample_series()).unwrap();
        assert!(store.has_historical("AAPL"));
        assert!(store.has_historical("aapl"));

        let loaded = store.load_historical("AAPL").unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.first_bar().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!((loaded.last_bar().unwrap().close - 181.25).abs() < 1e-9);
    }

    #[test]
    fn test_missing_history_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        let error = store.load_historical("MSFT").unwrap_err();
        assert!(matches!(error, DataError::Unavailable { .. }));
    }

    #[test]
    fn test_newest_first_file_loads_ascending() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());

        let dir_path = dir.path().join("historical");
        fs::create_dir_all(&dir_path).unwrap();
        let mut file = fs::File::create(dir_path.join("TSLA.csv")).unwrap();
        writeln!(file, "date,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-04,251.0,255.0,249.0,253.0,9000").unwrap();
        writeln!(file, "2024-01-03,248.0,252.0,247.0,250.5,8000").unwrap();

        let series = store.load_historical("TSLA").unwrap();
        assert_eq!(
            series.first_bar().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
        assert!((series.first_bar().unwrap().close - 250.5).abs() < 1e-9);
    }

    #[test]
    fn test_quote_append_and_scan() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());

        assert!(store.cached_quote("AAPL").unwrap().is_none());
        store
            .append_quote(&Quote {
                symbol: "AAPL".to_string(),
                price: 178.25,
                volume: 1_000,
                latest_trading_day: None,
            })
            .unwrap();
        store
            .append_quote(&Quote {
                symbol: "MSFT".to_string(),
                price: 401.5,
                volume: 2_000,
                latest_trading_day: None,
            })
            .unwrap();

        let row = store.cached_quote("aapl").unwrap().unwrap();
        assert_eq!(row.symbol, "AAPL");
        assert!((row.price - 178.25).abs() < 1e-9);
        assert!(store.cached_quote("TSLA").unwrap().is_none());
    }

    #[test]
    fn test_write_quotes_replaces_previous_rows() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());

        store
            .append_quote(&Quote {
                symbol: "OLD".to_string(),
                price: 1.0,
                volume: 1,
                latest_trading_day: None,
            })
            .unwrap();
        store
            .write_quotes(&[Quote {
                symbol: "NEW".to_string(),
                price: 2.0,
                volume: 2,
                latest_trading_day: None,
            }])
            .unwrap();

        assert!(store.cached_quote("OLD").unwrap().is_none());
        assert!(store.cached_quote("NEW").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cached_quote_is_served_without_refresh() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        store
            .append_quote(&Quote {
                symbol: "AAPL".to_string(),
                price: 150.0,
                volume: 10,
                latest_trading_day: None,
            })
            .unwrap();

        // The base URL is unroutable: a cache hit must never reach it.
        let http = reqwest::Client::new();
        let client = QuoteClient::new(&http, "http://127.0.0.1:9", "demo");
        let row = store.quote(&client, "AAPL").await.unwrap();
        assert!((row.price - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_ensure_historical_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = CsvStore::new(dir.path());
        store.save_historical(&sample_series()).unwrap();

        let http = reqwest::Client::new();
        let client = QuoteClient::new(&http, "http://127.0.0.1:9", "demo");
        store.ensure_historical(&client, "AAPL").await.unwrap();

        let series = store.load_historical("AAPL").unwrap();
        assert_eq!(series.len(), 3);
    }
}
