//! Built-in Typst report template.
//!
//! Custom templates may use any subset of the placeholders listed in
//! [`PLACEHOLDERS`].

pub const PLACEHOLDERS: &[&str] = &[
    "{{TITLE}}",
    "{{RUN_ID}}",
    "{{STRATEGY_SUMMARY}}",
    "{{METRICS_TABLE}}",
    "{{PRICE_CHART_SVG}}",
    "{{EQUITY_CURVE_SVG}}",
    "{{DRAWDOWN_CHART_SVG}}",
    "{{MONTHLY_RETURNS}}",
    "{{ROUND_TRIPS}}",
    "{{TRADE_LOG}}",
];

const TEMPLATE: &str = r#"#set page(
  paper: "a4",
  margin: (x: 1.5cm, y: 2cm),
  numbering: "1 / 1",
)
#set text(size: 10pt)
#set table(stroke: 0.5pt + luma(200), inset: 5pt)

#align(center)[
  = Backtest Report
  #text(size: 14pt)[{{TITLE}}]

  #text(size: 8pt, fill: luma(120))[Run {{RUN_ID}}]
]

== Strategy Summary

{{STRATEGY_SUMMARY}}

== Performance Metrics

{{METRICS_TABLE}}

== Price and Signals

{{PRICE_CHART_SVG}}

== Equity Curve

{{EQUITY_CURVE_SVG}}

== Drawdown

{{DRAWDOWN_CHART_SVG}}

== Monthly Returns

{{MONTHLY_RETURNS}}

#pagebreak()

== Round Trips

{{ROUND_TRIPS}}

== Trade Log

{{TRADE_LOG}}
"#;

pub fn template() -> &'static str {
    TEMPLATE
}
