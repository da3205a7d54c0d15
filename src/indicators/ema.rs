// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Recursive EMA without bias adjustment:
//   alpha  = 2 / (span + 1)
//   EMA_0  = close_0
//   EMA_t  = alpha * close_t + (1 - alpha) * EMA_{t-1}
//
// Seeded with the first close rather than an SMA, so every index has a value.
// =============================================================================

/// Smoothing factor for a given `span`.
pub fn alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA series for `closes`, aligned index-for-index with the input.
///
/// Returns an empty `Vec` for empty input or `span == 0`.
pub fn calculate_ema(closes: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = closes.first() else {
        return Vec::new();
    };
    if span == 0 {
        return Vec::new();
    }

    let a = alpha(span);
    let mut result = Vec::with_capacity(closes.len());
    result.push(first);

    let mut prev = first;
    for &close in &closes[1..] {
        let ema = a * close + (1.0 - a) * prev;
        result.push(ema);
        prev = ema;
    }

    result
}
