// =============================================================================
// Buy / Sell Volume Split
// =============================================================================
//
// Attributes each candle's whole volume to one side:
//   close > open  => buy side
//   close <= open => sell side (doji candles count as selling)
// =============================================================================

use crate::market_data::Candle;

/// Split every candle's volume into `(buy_volume, sell_volume)` series.
pub fn split_volume(candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    candles
        .iter()
        .map(|c| {
            if c.is_bullish() {
                (c.volume, 0.0)
            } else {
                (0.0, c.volume)
            }
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_attributes_by_candle_direction() {
        let candles = vec![
            Candle::new(0, 10.0, 12.0, 9.0, 11.0, 5.0), // up
            Candle::new(1, 11.0, 12.0, 9.0, 10.0, 7.0), // down
            Candle::new(2, 10.0, 11.0, 9.0, 10.0, 3.0), // doji
        ];
        let (buy, sell) = split_volume(&candles);
        assert_eq!(buy, vec![5.0, 0.0, 0.0]);
        assert_eq!(sell, vec![0.0, 7.0, 3.0]);
    }

    #[test]
    fn buy_plus_sell_equals_volume() {
        let candles: Vec<Candle> = (0..64)
            .map(|i| {
                let open = 100.0 + (i as f64 * 0.9).sin();
                let close = 100.0 + (i as f64 * 1.3).cos();
                let hi = open.max(close) + 0.5;
                let lo = open.min(close) - 0.5;
                Candle::new(i, open, hi, lo, close, i as f64 * 1.5)
            })
            .collect();

        let (buy, sell) = split_volume(&candles);
        for (i, c) in candles.iter().enumerate() {
            assert_eq!(buy[i] + sell[i], c.volume, "index {i}");
        }
    }
}
