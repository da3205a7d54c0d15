// =============================================================================
// Window Extrema
// =============================================================================
//
// Highest high and lowest low over the fetched window. Ties go to the first
// occurrence in scan order.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// A single extreme point: which candle, when, and at what price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub index: usize,
    pub open_time: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    /// Candle with the greatest `high`.
    pub max: Extremum,
    /// Candle with the least `low`.
    pub min: Extremum,
}

/// Scan `candles` for the highest high and lowest low. `None` when empty.
pub fn find_extrema(candles: &[Candle]) -> Option<Extrema> {
    let first = candles.first()?;
    let mut max = Extremum {
        index: 0,
        open_time: first.open_time,
        price: first.high,
    };
    let mut min = Extremum {
        index: 0,
        open_time: first.open_time,
        price: first.low,
    };

    // Strict comparisons keep the first occurrence on ties.
    for (i, c) in candles.iter().enumerate().skip(1) {
        if c.high > max.price {
            max = Extremum {
                index: i,
                open_time: c.open_time,
                price: c.high,
            };
        }
        if c.low < min.price {
            min = Extremum {
                index: i,
                open_time: c.open_time,
                price: c.low,
            };
        }
    }

    Some(Extrema { max, min })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hl(open_time: i64, high: f64, low: f64) -> Candle {
        let mid = (high + low) / 2.0;
        Candle::new(open_time, mid, high, low, mid, 1.0)
    }

    #[test]
    fn extrema_example() {
        let candles = vec![hl(0, 5.0, 4.0), hl(1, 9.0, 3.0), hl(2, 7.0, 6.0)];
        let ex = find_extrema(&candles).unwrap();
        assert_eq!(ex.max.index, 1);
        assert_eq!(ex.max.price, 9.0);
        assert_eq!(ex.min.index, 1);
        assert_eq!(ex.min.price, 3.0);
        assert_eq!(ex.max.open_time, 1);
    }

    #[test]
    fn ties_resolve_to_first_occurrence() {
        let candles = vec![hl(0, 8.0, 2.0), hl(1, 9.0, 2.0), hl(2, 9.0, 3.0), hl(3, 7.0, 2.0)];
        let ex = find_extrema(&candles).unwrap();
        assert_eq!(ex.max.index, 1);
        assert_eq!(ex.min.index, 0);
    }

    #[test]
    fn empty_has_no_extrema() {
        assert!(find_extrema(&[]).is_none());
    }
}
