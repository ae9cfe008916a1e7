//! SVG chart rendering for reports.
//!
//! Every generator returns a standalone `<svg>` document, or an empty string
//! when there is nothing to draw. The caller embeds it with `image.decode`.

use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::BarSeries;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::{Trade, TradeKind};

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

const PRICE_COLOR: &str = "#1f2937";
const EMA_SHORT_COLOR: &str = "#f59e0b";
const EMA_LONG_COLOR: &str = "#8b5cf6";
const BUY_COLOR: &str = "#16a34a";
const SELL_COLOR: &str = "#dc2626";

fn plot_width() -> f64 {
    CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT
}

fn plot_height() -> f64 {
    CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
}

fn x_at(i: usize, len: usize) -> f64 {
    MARGIN_LEFT + (i as f64 / (len.saturating_sub(1)).max(1) as f64) * plot_width()
}

fn y_at(v: f64, min: f64, range: f64) -> f64 {
    MARGIN_TOP + plot_height() - ((v - min) / range) * plot_height()
}

fn svg_open(title: &str) -> String {
    let mut svg = format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    );
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"15\" text-anchor=\"end\" font-size=\"12\" fill=\"#666\">{}</text>\n",
        CHART_WIDTH, title
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM,
        CHART_WIDTH - MARGIN_RIGHT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg
}

fn y_labels(svg: &mut String, top: &str, mid: &str, bottom: &str) {
    for (y, label) in [
        (MARGIN_TOP + 5.0, top),
        (MARGIN_TOP + plot_height() / 2.0, mid),
        (CHART_HEIGHT - MARGIN_BOTTOM - 5.0, bottom),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            MARGIN_LEFT - 5.0,
            y,
            label
        ));
    }
}

fn x_labels(svg: &mut String, start: &str, mid: &str, end: &str) {
    for (x, label) in [
        (MARGIN_LEFT, start),
        (MARGIN_LEFT + plot_width() / 2.0, mid),
        (CHART_WIDTH - MARGIN_RIGHT, end),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            x, CHART_HEIGHT, label
        ));
    }
}

/// Path through the defined points; a gap starts a new sub-path.
fn series_path<I>(values: I, len: usize, min: f64, range: f64) -> String
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut path = String::new();
    let mut pen_down = false;
    for (i, value) in values.into_iter().enumerate() {
        match value {
            Some(v) => {
                let cmd = if pen_down { " L" } else { " M" };
                path.push_str(&format!("{} {:.1} {:.1}", cmd, x_at(i, len), y_at(v, min, range)));
                pen_down = true;
            }
            None => pen_down = false,
        }
    }
    path.trim_start().to_string()
}

fn bounds<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

/// Close price with both EMA overlays and a marker per trade.
pub fn generate_price_svg(
    bars: &BarSeries,
    ema_short: &IndicatorSeries,
    ema_long: &IndicatorSeries,
    trades: &[Trade],
) -> String {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return String::new();
    };
    let len = bars.len();

    let (min, max) = bounds(
        bars.iter()
            .map(|b| b.close)
            .chain(ema_short.values.iter().flatten().copied())
            .chain(ema_long.values.iter().flatten().copied()),
    );
    let range = (max - min).max(1e-9);
    let mid = &bars.bars()[len / 2];

    let mut svg = svg_open("Price");
    y_labels(
        &mut svg,
        &format!("{:.2}", max),
        &format!("{:.2}", (max + min) / 2.0),
        &format!("{:.2}", min),
    );
    x_labels(
        &mut svg,
        &first.date().to_string(),
        &mid.date().to_string(),
        &last.date().to_string(),
    );

    let lines = [
        (series_path(bars.iter().map(|b| Some(b.close)), len, min, range), PRICE_COLOR, 1.5),
        (series_path(ema_short.values.iter().copied(), len, min, range), EMA_SHORT_COLOR, 1.0),
        (series_path(ema_long.values.iter().copied(), len, min, range), EMA_LONG_COLOR, 1.0),
    ];
    for (path, color, width) in lines {
        if !path.is_empty() {
            svg.push_str(&format!(
                "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
                path, color, width
            ));
        }
    }

    for trade in trades {
        let Some(i) = bars.iter().position(|b| b.timestamp == trade.timestamp) else {
            continue;
        };
        let x = x_at(i, len);
        let y = y_at(trade.price, min, range);
        let marker = match trade.kind {
            TradeKind::Buy => format!(
                "  <polygon points=\"{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" fill=\"{}\"/>\n",
                x,
                y - 6.0,
                x - 5.0,
                y + 4.0,
                x + 5.0,
                y + 4.0,
                BUY_COLOR
            ),
            TradeKind::Sell | TradeKind::PartialSell => format!(
                "  <polygon points=\"{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" fill=\"{}\"/>\n",
                x,
                y + 6.0,
                x - 5.0,
                y - 4.0,
                x + 5.0,
                y - 4.0,
                SELL_COLOR
            ),
        };
        svg.push_str(&marker);
    }

    svg.push_str("</svg>");
    svg
}

pub fn generate_equity_svg(equity_curve: &[EquityPoint]) -> String {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return String::new();
    };
    let len = equity_curve.len();
    let (min, max) = bounds(equity_curve.iter().map(|p| p.equity));
    let range = (max - min).max(1.0);
    let mid = &equity_curve[len / 2];

    let mut svg = svg_open("Equity");
    y_labels(
        &mut svg,
        &format!("{:.2}", max),
        &format!("{:.2}", (max + min) / 2.0),
        &format!("{:.2}", min),
    );
    x_labels(
        &mut svg,
        &first.timestamp.date().to_string(),
        &mid.timestamp.date().to_string(),
        &last.timestamp.date().to_string(),
    );
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"#2563eb\" stroke-width=\"2\"/>\n",
        series_path(equity_curve.iter().map(|p| Some(p.equity)), len, min, range)
    ));
    svg.push_str("</svg>");
    svg
}

pub fn generate_drawdown_svg(equity_curve: &[EquityPoint]) -> String {
    if equity_curve.len() < 2 {
        return String::new();
    }

    let drawdowns = compute_drawdown_series(equity_curve);
    let max_dd = drawdowns.iter().cloned().fold(0.0, f64::max).max(0.01);
    let len = drawdowns.len();
    let y_scale = |dd: f64| -> f64 { MARGIN_TOP + (dd / max_dd) * plot_height() };

    let mut path_data = format!("M {:.1} {:.1}", x_at(0, len), y_scale(0.0));
    for (i, &dd) in drawdowns.iter().enumerate().skip(1) {
        path_data.push_str(&format!(" L {:.1} {:.1}", x_at(i, len), y_scale(dd)));
    }
    path_data.push_str(&format!(
        " L {:.1} {:.1} L {:.1} {:.1} Z",
        x_at(len - 1, len),
        y_scale(0.0),
        x_at(0, len),
        y_scale(0.0)
    ));

    let mid = &equity_curve[len / 2];
    let mut svg = svg_open("Drawdown (%)");
    y_labels(
        &mut svg,
        "0%",
        &format!("-{:.1}%", max_dd * 50.0),
        &format!("-{:.1}%", max_dd * 100.0),
    );
    x_labels(
        &mut svg,
        &equity_curve[0].timestamp.date().to_string(),
        &mid.timestamp.date().to_string(),
        &equity_curve[len - 1].timestamp.date().to_string(),
    );
    svg.push_str(&format!(
        "  <path d=\"{}\" fill=\"rgba(239,68,68,0.3)\" stroke=\"#dc2626\" stroke-width=\"1\"/>\n",
        path_data
    ));
    svg.push_str("</svg>");
    svg
}

/// Positive fraction below the running peak at each point.
pub fn compute_drawdown_series(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut drawdowns = Vec::with_capacity(equity_curve.len());
    let mut peak = f64::NEG_INFINITY;

    for point in equity_curve {
        peak = peak.max(point.equity);
        let dd = if peak > 0.0 {
            (peak - point.equity) / peak
        } else {
            0.0
        };
        drawdowns.push(dd);
    }

    drawdowns
}
