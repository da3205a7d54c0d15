// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Trailing, inclusive window:
//   SMA_t = mean(close_{t-window+1} .. close_t)   for t >= window - 1
//
// Computed with a running sum; the first `window - 1` slots have no value.
// =============================================================================

/// Compute the SMA series for `closes`, aligned index-for-index with the input.
///
/// Entries before index `window - 1` are `None`. `window == 0` yields all `None`.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    let w = window as f64;
    let mut sum: f64 = closes[..window].iter().sum();
    result[window - 1] = Some(sum / w);

    for i in window..closes.len() {
        sum += closes[i] - closes[i - window];
        result[i] = Some(sum / w);
    }

    result
}
