// =============================================================================
// Relative Strength Index (RSI): simple rolling means
// =============================================================================
//
// Step 1. delta_t = close_t - close_{t-1}   (t >= 1), delta_0 = 0
// Step 2. avg_gain_t = mean(max(delta, 0))  over the trailing `window` deltas
//         avg_loss_t = mean(max(-delta, 0)) over the same deltas
// Step 3. RS  = avg_gain / avg_loss
//         RSI = 100 - 100 / (1 + RS)
//
// Index 0 has no predecessor and counts as an unchanged close, so the first
// value lands at index `window - 1`, in line with the SMA.
//
// Zero-loss windows: RS is unbounded, so RSI is pinned to 100.0. A window with
// neither gains nor losses reads 50.0.
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

/// Compute the RSI series for `closes`, aligned index-for-index with the input.
///
/// Entries before index `window - 1` are `None`; so is everything when
/// `window == 0` or there are fewer than `window` closes.
pub fn calculate_rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    // gains[i] / losses[i] belong to close index i; index 0 is flat.
    let (gains, losses): (Vec<f64>, Vec<f64>) = std::iter::once((0.0, 0.0))
        .chain(closes.windows(2).map(|w| {
            let d = w[1] - w[0];
            (d.max(0.0), (-d).max(0.0))
        }))
        .unzip();

    let w = window as f64;
    let mut gain_sum: f64 = gains[..window].iter().sum();
    let mut loss_sum: f64 = losses[..window].iter().sum();
    result[window - 1] = Some(rsi_from_averages(gain_sum / w, loss_sum / w));

    for i in window..closes.len() {
        gain_sum += gains[i] - gains[i - window];
        loss_sum += losses[i] - losses[i - window];
        // Running sums can drift a hair below zero.
        let avg_gain = (gain_sum / w).max(0.0);
        let avg_loss = (loss_sum / w).max(0.0);
        result[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    result
}

/// Human-readable zone for an RSI reading.
pub fn rsi_label(value: f64) -> &'static str {
    if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Relative tolerance under which a running-sum average counts as zero.
const ZERO_EPSILON: f64 = 1e-12;

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let scale = avg_gain.max(avg_loss);
    let loss_is_zero = avg_loss <= ZERO_EPSILON * scale.max(1.0);
    let gain_is_zero = avg_gain <= ZERO_EPSILON * scale.max(1.0);

    if loss_is_zero && gain_is_zero {
        50.0
    } else if loss_is_zero {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}
