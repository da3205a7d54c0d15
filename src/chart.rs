// =============================================================================
// Chart Model: serialisable trace list for a candlestick dashboard
// =============================================================================
//
// Describes what to draw, not how: the front end maps each trace onto its
// charting library. Trace order is stable so clients can rely on it:
//
//   candlestick, max price, min price, last price, SMA, EMA,
//   buy volume, sell volume, RSI
//
// Indicator traces are omitted when the snapshot has no indicator block;
// price lines are omitted when the window is empty.
// =============================================================================

use serde::Serialize;

use crate::dashboard::DashboardSnapshot;

/// Which y-axis a trace is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Price,
    Volume,
    Oscillator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDash {
    Solid,
    Dash,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trace {
    Candlestick {
        name: String,
        x: Vec<String>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
    Line {
        name: String,
        x: Vec<String>,
        y: Vec<Option<f64>>,
        color: &'static str,
        dash: LineDash,
        axis: Axis,
    },
    Bar {
        name: String,
        x: Vec<String>,
        y: Vec<f64>,
        color: &'static str,
        axis: Axis,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub traces: Vec<Trace>,
    /// Mirrors `DashboardSnapshot::notice`.
    pub notice: Option<String>,
}

/// A horizontal line across the whole window at `level`.
fn level_line(name: String, x: &[String], level: f64, color: &'static str, dash: LineDash) -> Trace {
    Trace::Line {
        name,
        x: x.to_vec(),
        y: vec![Some(level); x.len()],
        color,
        dash,
        axis: Axis::Price,
    }
}

/// Build the trace list for `snapshot`.
pub fn build_figure(snapshot: &DashboardSnapshot) -> Figure {
    let candles = &snapshot.candles;
    let x: Vec<String> = candles
        .iter()
        .map(|c| c.open_time_utc().to_rfc3339())
        .collect();

    let mut traces = vec![Trace::Candlestick {
        name: "Candlesticks".to_string(),
        x: x.clone(),
        open: candles.iter().map(|c| c.open).collect(),
        high: candles.iter().map(|c| c.high).collect(),
        low: candles.iter().map(|c| c.low).collect(),
        close: candles.iter().map(|c| c.close).collect(),
    }];

    if !candles.is_empty() {
        if let Some(ex) = &snapshot.extrema {
            traces.push(level_line(
                format!("Max Price ({})", ex.max.price),
                &x,
                ex.max.price,
                "green",
                LineDash::Dash,
            ));
            traces.push(level_line(
                format!("Min Price ({})", ex.min.price),
                &x,
                ex.min.price,
                "red",
                LineDash::Dash,
            ));
        }
        traces.push(level_line(
            format!("Last Price ({})", snapshot.last_price.price),
            &x,
            snapshot.last_price.price,
            "blue",
            LineDash::Dot,
        ));
    }

    if let Some(series) = &snapshot.indicators {
        let p = snapshot.params;
        traces.push(Trace::Line {
            name: format!("SMA {}", p.sma_window),
            x: x.clone(),
            y: series.sma.clone(),
            color: "orange",
            dash: LineDash::Solid,
            axis: Axis::Price,
        });
        traces.push(Trace::Line {
            name: format!("EMA {}", p.ema_span),
            x: x.clone(),
            y: series.ema.clone(),
            color: "purple",
            dash: LineDash::Solid,
            axis: Axis::Price,
        });
        traces.push(Trace::Bar {
            name: "Buy Volume".to_string(),
            x: x.clone(),
            y: series.buy_volume.clone(),
            color: "green",
            axis: Axis::Volume,
        });
        traces.push(Trace::Bar {
            name: "Sell Volume".to_string(),
            x: x.clone(),
            y: series.sell_volume.clone(),
            color: "red",
            axis: Axis::Volume,
        });
        traces.push(Trace::Line {
            name: format!("RSI {}", p.rsi_window),
            x,
            y: series.rsi.clone(),
            color: "teal",
            dash: LineDash::Solid,
            axis: Axis::Oscillator,
        });
    }

    let mut title = format!("{} {}", snapshot.symbol, snapshot.timeframe);
    if let Some((value, label)) = snapshot.rsi_reading() {
        title.push_str(&format!(" | RSI {value:.1} {label}"));
    }

    Figure {
        title,
        traces,
        notice: snapshot.notice.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{find_extrema, IndicatorEngine, IndicatorParams};
    use crate::market_data::{Candle, PricePoint};
    use crate::types::Timeframe;
    use chrono::Utc;

    fn trace_name(trace: &Trace) -> &str {
        match trace {
            Trace::Candlestick { name, .. } | Trace::Line { name, .. } | Trace::Bar { name, .. } => name,
        }
    }

    fn snapshot(n: usize, with_indicators: bool) -> DashboardSnapshot {
        let candles: Vec<Candle> = (0..n)
            .map(|i| {
                let close = 1.0 + (i as f64 * 0.4).sin() * 0.05;
                Candle::new(i as i64 * 300_000, 1.0, close.max(1.0) + 0.01, close.min(1.0) - 0.01, close, 5.0)
            })
            .collect();
        let params = IndicatorParams::default();
        let indicators = if with_indicators {
            Some(IndicatorEngine::new(params).unwrap().compute(&candles).unwrap())
        } else {
            None
        };
        DashboardSnapshot {
            symbol: "EURUSDT".into(),
            timeframe: Timeframe::FiveMinutes,
            extrema: find_extrema(&candles),
            candles,
            indicators,
            notice: (!with_indicators).then(|| "insufficient data".to_string()),
            last_price: PricePoint {
                symbol: "EURUSDT".into(),
                price: 1.02,
                fetched_at: Utc::now(),
            },
            params,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn full_figure_has_all_traces_in_order() {
        let fig = build_figure(&snapshot(100, true));
        let names: Vec<&str> = fig.traces.iter().map(trace_name).collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "Candlesticks");
        assert!(names[1].starts_with("Max Price"));
        assert!(names[2].starts_with("Min Price"));
        assert!(names[3].starts_with("Last Price"));
        assert_eq!(&names[4..], ["SMA 50", "EMA 50", "Buy Volume", "Sell Volume", "RSI 14"]);
        assert!(fig.title.contains("RSI"));
        assert!(fig.notice.is_none());
    }

    #[test]
    fn suppressed_indicators_leave_price_traces() {
        let fig = build_figure(&snapshot(10, false));
        assert_eq!(fig.traces.len(), 4);
        assert_eq!(fig.notice.as_deref(), Some("insufficient data"));
        assert_eq!(fig.title, "EURUSDT 5m");
    }

    #[test]
    fn empty_window_only_candlestick() {
        let fig = build_figure(&snapshot(0, false));
        assert_eq!(fig.traces.len(), 1);
    }

    #[test]
    fn level_lines_span_window() {
        let snap = snapshot(12, false);
        let fig = build_figure(&snap);
        match &fig.traces[1] {
            Trace::Line { y, dash, .. } => {
                assert_eq!(y.len(), 12);
                assert_eq!(y[0], Some(snap.extrema.unwrap().max.price));
                assert_eq!(*dash, LineDash::Dash);
            }
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn traces_serialise_with_kind_tag() {
        let fig = build_figure(&snapshot(10, false));
        let json = serde_json::to_value(&fig).unwrap();
        assert_eq!(json["traces"][0]["kind"], "candlestick");
        assert_eq!(json["traces"][1]["kind"], "line");
        assert_eq!(json["traces"][1]["axis"], "price");
    }
}
