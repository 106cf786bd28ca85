use crate::models::HoldingsEntry;
use anyhow::{anyhow, Result};

/// Parses holdings given as comma-separated `SYMBOL:SHARES` pairs, e.g.
/// `AAPL:10,MSFT:5`. Symbols are uppercased and duplicates have their share
/// counts summed; an entry with zero shares is kept so the symbol still
/// participates in signal generation.
pub fn parse_portfolio(raw: &str) -> Result<Vec<HoldingsEntry>> {
    let mut entries: Vec<HoldingsEntry> = Vec::new();

    for part in raw.split(',') {
        let entry = part.trim();
        if entry.is_empty() {
            continue;
        }
        let (symbol, shares) = entry.split_once(':').ok_or_else(|| {
            anyhow!(
                "Portfolio entry must be SYMBOL:SHARES (value: {})",
                entry
            )
        })?;
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(anyhow!("Portfolio entry has an empty symbol (value: {})", entry));
        }
        let shares: u32 = shares.trim().parse().map_err(|_| {
            anyhow!(
                "Share count for {} must be a non-negative integer (value: {})",
                symbol,
                shares.trim()
            )
        })?;

        match entries.iter_mut().find(|held| held.symbol == symbol) {
            Some(held) => held.shares += shares,
            None => entries.push(HoldingsEntry { symbol, shares }),
        }
    }

    if entries.is_empty() {
        return Err(anyhow!(
            "Portfolio must contain at least one SYMBOL:SHARES entry"
        ));
    }
    Ok(entries)
}
