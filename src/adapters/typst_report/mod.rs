//! Typst report generation.
//!
//! Reads a Typst template (either the built-in default or a custom file),
//! resolves all `{{PLACEHOLDER}}` markers by calling helpers from
//! `chart_svg` and `tables`, and writes the final `.typ` file.

pub mod chart_svg;
pub mod default_template;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::PivotraderError;
use crate::ports::report_port::{ReportPort, ReportSnapshot};

fn embed_svg(svg: &str, empty_note: &str) -> String {
    if svg.is_empty() {
        return format!("_{}_", empty_note);
    }
    format!(
        "#image(bytes(\"{}\"), format: \"svg\", width: 100%)",
        svg.replace('\\', "\\\\").replace('"', "\\\"")
    )
}

/// Resolve all `{{PLACEHOLDER}}`s in the given template string and return
/// the final Typst markup.
pub fn resolve(template: &str, snapshot: &ReportSnapshot<'_>) -> String {
    let config = snapshot.config;
    let title = format!("{} ({})", config.symbol, config.interval);

    let price = chart_svg::generate_price_svg(
        snapshot.bars,
        snapshot.ema_short,
        snapshot.ema_long,
        snapshot.trades,
    );
    let equity = chart_svg::generate_equity_svg(snapshot.equity_curve);
    let drawdown = chart_svg::generate_drawdown_svg(snapshot.equity_curve);
    let monthly = tables::format_returns_heatmap(&tables::compute_monthly_returns(
        snapshot.equity_curve,
    ));

    let replacements = [
        ("{{TITLE}}", tables::escape(&title)),
        ("{{RUN_ID}}", tables::escape(&config.run_id())),
        ("{{STRATEGY_SUMMARY}}", tables::render_strategy_summary(config)),
        ("{{METRICS_TABLE}}", tables::render_metrics_table(snapshot.metrics)),
        ("{{PRICE_CHART_SVG}}", embed_svg(&price, "No price data.")),
        ("{{EQUITY_CURVE_SVG}}", embed_svg(&equity, "No equity data.")),
        ("{{DRAWDOWN_CHART_SVG}}", embed_svg(&drawdown, "No drawdown data.")),
        (
            "{{MONTHLY_RETURNS}}",
            if monthly.is_empty() {
                "_Insufficient data for monthly returns._".to_string()
            } else {
                monthly
            },
        ),
        ("{{ROUND_TRIPS}}", tables::render_round_trips(snapshot.trades)),
        ("{{TRADE_LOG}}", tables::render_trade_log(snapshot.trades)),
    ];

    let mut output = template.to_string();
    for (placeholder, value) in &replacements {
        output = output.replace(placeholder, value);
    }
    output
}

/// Writes `.typ` reports, optionally from a user template.
#[derive(Debug, Clone, Default)]
pub struct TypstReportAdapter {
    template_path: Option<PathBuf>,
}

impl TypstReportAdapter {
    pub fn new(template_path: Option<PathBuf>) -> Self {
        Self { template_path }
    }

    fn load_template(&self) -> Result<String, PivotraderError> {
        match &self.template_path {
            Some(path) => fs::read_to_string(path).map_err(|e| PivotraderError::Report {
                reason: format!("failed to read template {}: {}", path.display(), e),
            }),
            None => Ok(default_template::template().to_string()),
        }
    }
}

impl ReportPort for TypstReportAdapter {
    fn write(
        &self,
        snapshot: &ReportSnapshot<'_>,
        output_path: &str,
    ) -> Result<(), PivotraderError> {
        let template = self.load_template()?;
        let markup = resolve(&template, snapshot);

        if let Some(parent) = Path::new(output_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, markup).map_err(|e| PivotraderError::Report {
            reason: format!("failed to write {}: {}", output_path, e),
        })?;
        log::info!("report written to {}", output_path);
        Ok(())
    }
}
