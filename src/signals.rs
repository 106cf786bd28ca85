use crate::indicators::moving_average;
use crate::models::{PriceSeries, Signal, SignalAction};

/// Computes short/long moving averages for the series and scans them for
/// crossovers. A series shorter than `long_window + 1` bars cannot produce a
/// defined previous-and-current pair, so it yields no signals.
pub fn generate_signals(
    series: &PriceSeries,
    short_window: usize,
    long_window: usize,
) -> Vec<Signal> {
    let closes = series.closes();
    let short = moving_average(&closes, short_window);
    let long = moving_average(&closes, long_window);
    crossover_signals(series, &short, &long)
}

/// Lockstep scan of two aligned average series. Emits a buy when the short
/// average moves from at-or-below to strictly above the long average, a sell
/// on the mirrored downward cross. Indices where either average is still
/// undefined are skipped. At most one signal per index: the buy predicate
/// needs `short > long` and the sell predicate `short < long` on the same
/// day, which cannot both hold.
pub fn crossover_signals(
    series: &PriceSeries,
    short: &[Option<f64>],
    long: &[Option<f64>],
) -> Vec<Signal> {
    let bars = series.bars();
    let len = bars.len().min(short.len()).min(long.len());
    let mut signals = Vec::new();

    for i in 1..len {
        let (Some(curr_short), Some(curr_long), Some(prev_short), Some(prev_long)) =
            (short[i], long[i], short[i - 1], long[i - 1])
        else {
            continue;
        };

        let action = if curr_short > curr_long && prev_short <= prev_long {
            Some(SignalAction::Buy)
        } else if curr_short < curr_long && prev_short >= prev_long {
            Some(SignalAction::Sell)
        } else {
            None
        };

        if let Some(action) = action {
            signals.push(Signal {
                symbol: series.symbol().to_string(),
                date: bars[i].date,
                action,
            });
        }
    }

    signals
}
