//! Table formatting for reports.
//!
//! Provides functions to generate Typst markup for:
//! - Strategy summary and performance metrics
//! - Monthly returns heatmap grid
//! - Trade log and round-trip table

use crate::domain::backtest::BacktestConfig;
use crate::domain::execution::ExitPolicy;
use crate::domain::metrics::Metrics;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::{Trade, round_trips};
use crate::domain::strategy::{SignalGenerator, SignalRule};
use chrono::Datelike;
use std::collections::BTreeMap;

/// Escapes characters Typst treats as markup inside `[...]` content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '#' | '[' | ']' | '*' | '_' | '$' | '@' | '<' | '\\' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn format_pct(value: f64) -> String {
    format!("{:+.2}%", value * 100.0)
}

fn key_value_table(rows: &[(&str, String)]) -> String {
    let mut output = String::from("#table(\n  columns: 2,\n  align: (left, right),\n");
    output.push_str("  [*Property*], [*Value*],\n");
    for (key, value) in rows {
        output.push_str(&format!("  [{}], [{}],\n", key, escape(value)));
    }
    output.push_str(")\n");
    output
}

fn signal_rows(signal: &SignalRule) -> Vec<(&'static str, String)> {
    match signal {
        SignalRule::Threshold(rule) => vec![
            ("RSI Oversold", format!("{:.1}", rule.rsi_oversold)),
            ("RSI Overbought", format!("{:.1}", rule.rsi_overbought)),
            ("Volume Surge", format!("{:.2}x", rule.volume_surge)),
        ],
        SignalRule::CprPivot(rule) => vec![
            ("Volume Threshold", format!("{:.2}x", rule.volume_threshold)),
            ("Pivot Threshold", format!("{:.3}%", rule.pivot_threshold * 100.0)),
        ],
    }
}

fn exit_rows(exit: &ExitPolicy) -> Vec<(&'static str, String)> {
    match exit {
        ExitPolicy::StagedPartial(p) => vec![
            ("First Target", format!("{:.2}%", p.first_target * 100.0)),
            ("Second Target", format!("{:.2}%", p.second_target * 100.0)),
            ("Partial Fraction", format!("{:.0}%", p.partial_fraction * 100.0)),
        ],
        ExitPolicy::StopTakeProfit(p) => vec![
            ("Stop Loss", format!("{:.2}%", p.stop_loss * 100.0)),
            ("Take Profit", format!("{:.2}%", p.take_profit * 100.0)),
            (
                "Sizing",
                if p.size_weighted { "risk-weighted" } else { "one unit" }.to_string(),
            ),
        ],
    }
}

pub fn render_strategy_summary(config: &BacktestConfig) -> String {
    let mut rows = vec![
        ("Symbol", config.symbol.clone()),
        ("Interval", config.interval.to_string()),
        ("Start Date", config.start_date.to_string()),
        ("End Date", config.end_date.to_string()),
        ("Initial Capital", format!("{:.2}", config.initial_capital)),
        ("Signal Rule", config.signal.name().to_string()),
    ];
    rows.extend(signal_rows(&config.signal));
    rows.push(("Exit Policy", config.exit.name().to_string()));
    rows.extend(exit_rows(&config.exit));
    rows.push((
        "Risk Per Trade",
        format!("{:.2}%", config.sizing.position_size_percent),
    ));
    key_value_table(&rows)
}

pub fn render_metrics_table(m: &Metrics) -> String {
    let mut rows = vec![
        ("Initial Value", format!("{:.2}", m.initial_value)),
        ("Final Value", format!("{:.2}", m.final_value)),
        ("Total Return", format_pct(m.total_return)),
        ("Annualized Return", format_pct(m.annualized_return)),
        ("Daily Volatility", format!("{:.4}", m.daily_volatility)),
        ("Annualized Volatility", format!("{:.4}", m.annualized_volatility)),
        ("Sharpe Ratio", format!("{:.2}", m.sharpe_ratio)),
        ("Sortino Ratio", format!("{:.2}", m.sortino_ratio)),
        ("Max Drawdown", format_pct(m.max_drawdown)),
        ("Average Drawdown", format_pct(m.avg_drawdown)),
        ("Bars In Drawdown", m.drawdown_duration.to_string()),
    ];
    match &m.trade_stats {
        Some(stats) => {
            rows.push(("Total Trades", stats.total_trades.to_string()));
            rows.push(("Win Rate", format!("{:.1}%", stats.win_rate * 100.0)));
            rows.push((
                "Avg Trade Duration",
                format!("{} days", stats.avg_trade_duration_days),
            ));
            rows.push(("Profit Factor", format!("{:.2}", stats.profit_factor)));
        }
        None => rows.push(("Total Trades", "n/a".to_string())),
    }
    rows.push(("Round Trips", m.round_trips.count.to_string()));
    rows.push(("Closed Round Trips", m.round_trips.closed.to_string()));
    rows.push(("Realized P&L", format!("{:.2}", m.round_trips.realized_pnl)));
    rows.push(("Projected 1 Month", format!("{:.2}", m.projections.one_month)));
    rows.push(("Projected 12 Months", format!("{:.2}", m.projections.twelve_months)));
    rows.push(("Projected 10 Years", format!("{:.2}", m.projections.ten_years)));
    key_value_table(&rows)
}

pub struct MonthlyReturns {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

/// Month-over-month change of the last equity value in each month. The
/// first month is measured against the first point of the curve.
pub fn compute_monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturns> {
    let Some(first) = equity_curve.first() else {
        return Vec::new();
    };

    let mut month_end: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for point in equity_curve {
        let key = (point.timestamp.year(), point.timestamp.month());
        month_end.insert(key, point.equity);
    }

    let mut prev = first.equity;
    month_end
        .into_iter()
        .map(|((year, month), end)| {
            let return_pct = if prev > 0.0 { (end - prev) / prev } else { 0.0 };
            prev = end;
            MonthlyReturns {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}

/// Returns (fill_color, needs_white_text) for a given return value.
fn return_color(ret: f64) -> (&'static str, bool) {
    if ret >= 0.10 {
        ("rgb(\"#006400\")", true)
    } else if ret >= 0.05 {
        ("rgb(\"#228B22\")", true)
    } else if ret >= 0.02 {
        ("rgb(\"#90EE90\")", false)
    } else if ret > 0.0 {
        ("rgb(\"#E0FFE0\")", false)
    } else if ret == 0.0 {
        ("rgb(\"#FFFFFF\")", false)
    } else if ret > -0.02 {
        ("rgb(\"#FFE0E0\")", false)
    } else if ret > -0.05 {
        ("rgb(\"#FF9090\")", false)
    } else if ret > -0.10 {
        ("rgb(\"#FF4444\")", true)
    } else {
        ("rgb(\"#8B0000\")", true)
    }
}

fn format_heatmap_cell(ret: f64) -> String {
    let (color, white_text) = return_color(ret);
    let formatted = format!("{:+.1}%", ret * 100.0);
    if white_text {
        format!("table.cell(fill: {}, text(fill: white, [{}]))", color, formatted)
    } else {
        format!("table.cell(fill: {}, [{}])", color, formatted)
    }
}

pub fn format_returns_heatmap(returns: &[MonthlyReturns]) -> String {
    if returns.is_empty() {
        return String::new();
    }

    let mut years: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        let entry = years.entry(r.year).or_insert([None; 12]);
        entry[(r.month - 1) as usize] = Some(r.return_pct);
    }

    let mut output = String::from("#table(\n  columns: 14,\n");
    output.push_str("  [*Year*], [*Jan*], [*Feb*], [*Mar*], [*Apr*], [*May*], [*Jun*], ");
    output.push_str("[*Jul*], [*Aug*], [*Sep*], [*Oct*], [*Nov*], [*Dec*], [*YTD*],\n");

    for (year, monthly) in &years {
        output.push_str(&format!("  [{}],", year));
        let mut ytd = 1.0_f64;
        for ret in monthly {
            match ret {
                Some(ret) => {
                    ytd *= 1.0 + ret;
                    output.push_str(&format!(" {},", format_heatmap_cell(*ret)));
                }
                None => output.push_str(" [-],"),
            }
        }
        output.push_str(&format!(" {},\n", format_heatmap_cell(ytd - 1.0)));
    }

    output.push_str(")\n");
    output
}

/// Every fill in emission order.
pub fn render_trade_log(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "_No trades executed._\n".to_string();
    }

    let mut output = String::from(
        "#table(\n  columns: 6,\n  align: (right, left, left, right, right, right),\n",
    );
    output.push_str("  [*\\#*], [*Time*], [*Side*], [*Price*], [*Size*], [*Value*],\n");

    for (i, trade) in trades.iter().enumerate() {
        let color = if trade.kind.is_exit() { "red" } else { "green" };
        output.push_str(&format!(
            "  [{}], [{}], text(fill: {}, [{}]), [{:.4}], [{:.4}], [{:.2}],\n",
            i + 1,
            trade.timestamp.format("%Y-%m-%d %H:%M"),
            color,
            trade.kind,
            trade.price,
            trade.size,
            trade.value()
        ));
    }

    output.push_str(")\n");
    output
}

/// One row per entry with its realized P&L so far.
pub fn render_round_trips(trades: &[Trade]) -> String {
    let trips = round_trips(trades);
    if trips.is_empty() {
        return "_No round trips._\n".to_string();
    }

    let mut output = String::from(
        "#table(\n  columns: 7,\n  align: (right, left, left, right, right, right, right),\n",
    );
    output.push_str(
        "  [*\\#*], [*Entry*], [*Exit*], [*Entry Price*], [*Exits*], [*Days*], [*P&L*],\n",
    );

    for (i, trip) in trips.iter().enumerate() {
        let pnl = trip.pnl();
        let pnl_color = if pnl >= 0.0 { "green" } else { "red" };
        let exit = match trip.exit_timestamp() {
            Some(ts) if trip.is_closed() => ts.format("%Y-%m-%d %H:%M").to_string(),
            Some(ts) => format!("{} (partial)", ts.format("%Y-%m-%d %H:%M")),
            None => "open".to_string(),
        };
        let days = trip
            .holding_days()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "  [{}], [{}], [{}], [{:.4}], [{}], [{}], text(fill: {}, [{:.2}]),\n",
            i + 1,
            trip.entry.timestamp.format("%Y-%m-%d %H:%M"),
            exit,
            trip.entry.price,
            trip.exits.len(),
            days,
            pnl_color,
            pnl
        ));
    }

    output.push_str(")\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::{SizingParams, StopTakeParams};
    use crate::domain::indicator_helpers::IndicatorParams;
    use crate::domain::ohlcv::Interval;
    use crate::domain::position::TradeKind;
    use crate::domain::strategy::ThresholdRule;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn point(y: i32, m: u32, d: u32, equity: f64) -> EquityPoint {
        EquityPoint {
            timestamp: ts(y, m, d),
            equity,
        }
    }

    fn trade(kind: TradeKind, price: f64, day: u32, size: f64) -> Trade {
        Trade {
            kind,
            price,
            timestamp: ts(2024, 1, day),
            size,
        }
    }

    #[test]
    fn escape_markup_characters() {
        assert_eq!(escape("a_b #1 [x]"), "a\\_b \\#1 \\[x\\]");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn strategy_summary_lists_rule_parameters() {
        let config = BacktestConfig {
            symbol: "AAPL".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            interval: Interval::Day1,
            initial_capital: 10_000.0,
            indicators: IndicatorParams::default(),
            signal: SignalRule::Threshold(ThresholdRule::default()),
            exit: ExitPolicy::StopTakeProfit(StopTakeParams::default()),
            sizing: SizingParams::default(),
        };
        let out = render_strategy_summary(&config);
        assert!(out.starts_with("#table("));
        assert!(out.contains("[RSI Oversold], [30.0]"));
        assert!(out.contains("[Exit Policy], [stop\\_take]"));
        assert!(out.contains("[Stop Loss], [2.00%]"));
        assert!(out.contains("[Sizing], [one unit]"));
    }

    #[test]
    fn monthly_returns_chain_month_ends() {
        let curve = vec![
            point(2024, 1, 2, 100.0),
            point(2024, 1, 31, 110.0),
            point(2024, 2, 15, 99.0),
            point(2024, 3, 1, 99.0),
        ];
        let returns = compute_monthly_returns(&curve);
        assert_eq!(returns.len(), 3);
        assert!((returns[0].return_pct - 0.10).abs() < 1e-12);
        assert!((returns[1].return_pct + 0.10).abs() < 1e-12);
        assert_eq!(returns[2].return_pct, 0.0);
        assert!(compute_monthly_returns(&[]).is_empty());
    }

    #[test]
    fn heatmap_has_year_row() {
        let returns =
            compute_monthly_returns(&[point(2023, 12, 1, 100.0), point(2024, 1, 1, 105.0)]);
        let out = format_returns_heatmap(&returns);
        assert!(out.contains("[2023],"));
        assert!(out.contains("[2024],"));
        assert!(out.contains("+5.0%"));
        assert!(format_returns_heatmap(&[]).is_empty());
    }

    #[test]
    fn trade_log_rows() {
        let trades = vec![
            trade(TradeKind::Buy, 100.0, 2, 4.0),
            trade(TradeKind::PartialSell, 102.0, 3, 2.0),
        ];
        let out = render_trade_log(&trades);
        assert!(out.contains("[1], [2024-01-02 00:00], text(fill: green, [buy])"));
        assert!(out.contains("[partial-sell]"));
        assert!(out.contains("[204.00]"));
        assert_eq!(render_trade_log(&[]), "_No trades executed._\n");
    }

    #[test]
    fn round_trip_rows_mark_partial_and_open() {
        let trades = vec![
            trade(TradeKind::Buy, 100.0, 2, 4.0),
            trade(TradeKind::PartialSell, 102.0, 3, 2.0),
            trade(TradeKind::PartialSell, 103.0, 5, 2.0),
            trade(TradeKind::Buy, 101.0, 8, 1.0),
        ];
        let out = render_round_trips(&trades);
        assert!(
            out.contains("[2024-01-05 00:00], [100.0000], [2], [3], text(fill: green, [10.00])")
        );
        assert!(out.contains("[open]"));
        assert_eq!(render_round_trips(&[]), "_No round trips._\n");
    }
}
