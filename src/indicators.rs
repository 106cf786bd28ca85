/// Trailing moving average aligned index-for-index with `values`. The first
/// `window - 1` positions carry no value because the window is not yet full;
/// that state is distinct from a computed average of zero.
///
/// The window sum is carried incrementally so a full series costs O(n)
/// regardless of window size.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || values.len() < window {
        return vec![None; values.len()];
    }

    let mut averages: Vec<Option<f64>> = vec![None; window - 1];
    let mut window_sum: f64 = values[..window].iter().sum();
    averages.push(Some(window_sum / window as f64));
    for i in window..values.len() {
        window_sum += values[i] - values[i - window];
        averages.push(Some(window_sum / window as f64));
    }

    averages
}
