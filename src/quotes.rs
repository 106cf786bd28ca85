use crate::errors::DataError;
use crate::models::{PriceBar, PriceSeries};
use anyhow::Context;
use chrono::NaiveDate;
use log::warn;
use reqwest::Client;
use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

const REQUEST_DELAY: Duration = Duration::from_millis(350);

/// A real-time quote as returned by the provider's GLOBAL_QUOTE function.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub volume: i64,
    pub latest_trading_day: Option<NaiveDate>,
}

/// Thin client over an Alpha Vantage style quote API. All numeric fields
/// arrive as JSON strings; a payload without its expected section (rate
/// limiting, unknown symbol) surfaces as `DataError::Unavailable` so callers
/// can skip the symbol and continue.
pub struct QuoteClient<'a> {
    http: &'a Client,
    base_url: String,
    api_key: String,
}

impl<'a> QuoteClient<'a> {
    pub fn new(http: &'a Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn global_quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let response: GlobalQuoteResponse = self
            .get(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", &self.api_key),
            ])
            .await?;
        parse_global_quote(symbol, response)
    }

    /// Roughly the 100 most recent trading days, oldest first.
    pub async fn daily_series(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let response: DailySeriesResponse = self
            .get(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", &self.api_key),
                ("outputsize", "compact"),
            ])
            .await?;
        parse_daily_series(symbol, response)
    }

    async fn get<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<T, DataError> {
        sleep(REQUEST_DELAY).await;
        let response = self
            .http
            .get(&self.base_url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.base_url))?
            .error_for_status()
            .with_context(|| format!("GET {} returned error", self.base_url))?;
        let value = response
            .json::<T>()
            .await
            .context("failed to parse quote provider response")?;
        Ok(value)
    }
}

fn parse_global_quote(symbol: &str, response: GlobalQuoteResponse) -> Result<Quote, DataError> {
    let payload = response
        .quote
        .ok_or_else(|| provider_rejection(symbol, response.error_message, response.note))?;
    let price = payload
        .price
        .ok_or_else(|| DataError::unavailable(symbol, "quote payload has no price"))?;

    Ok(Quote {
        symbol: payload
            .symbol
            .unwrap_or_else(|| symbol.to_uppercase()),
        price,
        volume: payload.volume.map(|value| value as i64).unwrap_or(0),
        latest_trading_day: payload
            .latest_trading_day
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()),
    })
}

fn parse_daily_series(
    symbol: &str,
    response: DailySeriesResponse,
) -> Result<PriceSeries, DataError> {
    let entries = response
        .series
        .ok_or_else(|| provider_rejection(symbol, response.error_message, response.note))?;
    if entries.is_empty() {
        return Err(DataError::unavailable(symbol, "empty daily series"));
    }

    // BTreeMap iteration puts the YYYY-MM-DD keys in ascending order, which
    // undoes the provider's most-recent-first layout.
    let mut bars = Vec::with_capacity(entries.len());
    for (raw_date, payload) in entries {
        let Ok(date) = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d") else {
            warn!("{}: dropping bar with unparsable date {:?}", symbol, raw_date);
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) =
            (payload.open, payload.high, payload.low, payload.close)
        else {
            warn!("{}: dropping incomplete bar on {}", symbol, date);
            continue;
        };
        bars.push(PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: payload.volume.map(|value| value as i64).unwrap_or(0),
        });
    }

    if bars.is_empty() {
        return Err(DataError::unavailable(symbol, "no usable bars in daily series"));
    }
    Ok(PriceSeries::new(symbol.to_uppercase(), bars)?)
}

fn provider_rejection(
    symbol: &str,
    error_message: Option<String>,
    note: Option<String>,
) -> DataError {
    let reason = error_message
        .or(note)
        .unwrap_or_else(|| "response has no data section".to_string());
    DataError::unavailable(symbol, reason)
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuotePayload>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuotePayload {
    #[serde(rename = "01. symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "05. price", default, deserialize_with = "deserialize_f64_opt")]
    price: Option<f64>,
    #[serde(rename = "06. volume", default, deserialize_with = "deserialize_f64_opt")]
    volume: Option<f64>,
    #[serde(rename = "07. latest trading day", default)]
    latest_trading_day: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    series: Option<BTreeMap<String, DailyBarPayload>>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBarPayload {
    #[serde(rename = "1. open", default, deserialize_with = "deserialize_f64_opt")]
    open: Option<f64>,
    #[serde(rename = "2. high", default, deserialize_with = "deserialize_f64_opt")]
    high: Option<f64>,
    #[serde(rename = "3. low", default, deserialize_with = "deserialize_f64_opt")]
    low: Option<f64>,
    #[serde(rename = "4. close", default, deserialize_with = "deserialize_f64_opt")]
    close: Option<f64>,
    #[serde(rename = "5. volume", default, deserialize_with = "deserialize_f64_opt")]
    volume: Option<f64>,
}

fn deserialize_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct F64OptVisitor;

    impl<'de> Visitor<'de> for F64OptVisitor {
        type Value = Option<f64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or string")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.trim().parse::<f64>().ok())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.trim().parse::<f64>().ok())
        }
    }

    deserializer.deserialize_any(F64OptVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_quote_with_string_fields() {
        let raw = r#"{
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "176.1500",
                "05. price": "178.2500",
                "06. volume": "51234567",
                "07. latest trading day": "2024-01-05"
            }
        }"#;
        let response: GlobalQuoteResponse = serde_json::from_str(raw).unwrap();
        let quote = parse_global_quote("aapl", response).unwrap();

        assert_eq!(quote.symbol, "AAPL");
        assert!((quote.price - 178.25).abs() < 1e-9);
        assert_eq!(quote.volume, 51_234_567);
        assert_eq!(
            quote.latest_trading_day,
            Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
    }

    #[test]
    fn test_empty_quote_section_is_unavailable() {
        let raw = r#"{"Note": "API call frequency exceeded"}"#;
        let response: GlobalQuoteResponse = serde_json::from_str(raw).unwrap();
        let error = parse_global_quote("AAPL", response).unwrap_err();
        assert!(matches!(error, DataError::Unavailable { .. }));
        assert!(error.to_string().contains("frequency"));
    }

    #[test]
    fn test_daily_series_is_reordered_ascending() {
        let raw = r#"{
            "Meta Data": {"2. Symbol": "MSFT"},
            "Time Series (Daily)": {
                "2024-01-05": {"1. open": "370.0", "2. high": "375.0", "3. low": "368.0", "4. close": "372.5", "5. volume": "18000000"},
                "2024-01-04": {"1. open": "365.0", "2. high": "371.0", "3. low": "364.0", "4. close": "369.0", "5. volume": "17000000"},
                "2024-01-03": {"1. open": "360.0", "2. high": "366.0", "3. low": "359.0", "4. close": "364.0", "5. volume": "16000000"}
            }
        }"#;
        let response: DailySeriesResponse = serde_json::from_str(raw).unwrap();
        let series = parse_daily_series("MSFT", response).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.first_bar().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
        assert_eq!(
            series.last_bar().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert!((series.last_bar().unwrap().close - 372.5).abs() < 1e-9);
    }

    #[test]
    fn test_incomplete_bars_are_dropped() {
        let raw = r#"{
            "Time Series (Daily)": {
                "2024-01-04": {"1. open": "365.0", "2. high": "371.0", "3. low": "364.0", "4. close": "369.0", "5. volume": "17000000"},
                "2024-01-03": {"1. open": "360.0", "2. high": "366.0", "3. low": "359.0", "5. volume": "16000000"}
            }
        }"#;
        let response: DailySeriesResponse = serde_json::from_str(raw).unwrap();
        let series = parse_daily_series("MSFT", response).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_missing_series_section_reports_provider_reason() {
        let raw = r#"{"Error Message": "Invalid API call"}"#;
        let response: DailySeriesResponse = serde_json::from_str(raw).unwrap();
        let error = parse_daily_series("NOPE", response).unwrap_err();
        assert!(error.to_string().contains("Invalid API call"));
    }
}
