//! Configuration validation.
//!
//! Validates all config fields before a backtest runs. Missing optional
//! keys fall back to the defaults used by `cli::build_backtest_config`,
//! so only present-but-wrong values and missing required keys fail.

use crate::domain::error::PivotraderError;
use crate::domain::ohlcv::Interval;
use crate::ports::config_port::{ConfigPort, ValueKind};
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    validate_symbol(config)?;
    validate_dates(config)?;
    validate_interval(config)?;
    validate_initial_capital(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    validate_signal(config)?;
    validate_periods(config)?;
    validate_ema_pair(config)?;
    validate_thresholds(config)?;
    validate_rsi_bounds(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    validate_exit(config)?;
    validate_position_size_percent(config)?;
    validate_stop_take(config)?;
    validate_staged_targets(config)?;
    Ok(())
}

/// `[data]`, `[sqlite]` and `[persistence]` wiring.
pub fn validate_io_config(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    validate_data_source(config)?;
    validate_persistence(config)?;
    Ok(())
}

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    validate_value_types(config)?;
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    validate_risk_config(config)?;
    validate_io_config(config)?;
    Ok(())
}

/// Every typed key. The getters fall back to defaults on unparseable
/// values, so these are checked before anything reads them.
const TYPED_KEYS: &[(&str, &str, ValueKind)] = &[
    ("backtest", "initial_capital", ValueKind::Float),
    ("strategy", "ema_short", ValueKind::Int),
    ("strategy", "ema_long", ValueKind::Int),
    ("strategy", "rsi_period", ValueKind::Int),
    ("strategy", "atr_period", ValueKind::Int),
    ("strategy", "bollinger_period", ValueKind::Int),
    ("strategy", "volume_window", ValueKind::Int),
    ("strategy", "bollinger_stddev", ValueKind::Float),
    ("strategy", "volume_threshold", ValueKind::Float),
    ("strategy", "pivot_threshold", ValueKind::Float),
    ("strategy", "rsi_oversold", ValueKind::Float),
    ("strategy", "rsi_overbought", ValueKind::Float),
    ("strategy", "volume_surge", ValueKind::Float),
    ("risk", "stop_loss", ValueKind::Float),
    ("risk", "take_profit", ValueKind::Float),
    ("risk", "size_weighted", ValueKind::Bool),
    ("risk", "position_size_percent", ValueKind::Float),
    ("risk", "first_target", ValueKind::Float),
    ("risk", "second_target", ValueKind::Float),
    ("risk", "partial_fraction", ValueKind::Float),
    ("sqlite", "pool_size", ValueKind::Int),
];

/// Present values of every typed key must parse.
pub fn validate_value_types(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    for &(section, key, kind) in TYPED_KEYS {
        config
            .check_value(section, key, kind)
            .map_err(|reason| PivotraderError::config_invalid(section, key, reason))?;
    }
    Ok(())
}

fn required_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, PivotraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(PivotraderError::config_missing(section, key)),
    }
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    required_string(config, "backtest", "symbol").map(|_| ())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(PivotraderError::config_invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, PivotraderError> {
    match value {
        None => Err(PivotraderError::config_missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            PivotraderError::config_invalid(
                "backtest",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

pub fn parse_interval(config: &dyn ConfigPort) -> Result<Interval, PivotraderError> {
    match config.get_string("backtest", "interval") {
        None => Ok(Interval::Day1),
        Some(s) => s
            .parse::<Interval>()
            .map_err(|reason| PivotraderError::config_invalid("backtest", "interval", reason)),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    parse_interval(config).map(|_| ())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if value <= 0.0 {
        return Err(PivotraderError::config_invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn one_of(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), PivotraderError> {
    match config.get_string(section, key) {
        None => Ok(()),
        Some(v) if allowed.contains(&v.trim().to_lowercase().as_str()) => Ok(()),
        Some(v) => Err(PivotraderError::config_invalid(
            section,
            key,
            format!("'{}' is not one of {}", v, allowed.join(", ")),
        )),
    }
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    one_of(config, "strategy", "signal", &["threshold", "cpr_pivot"])
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    for (key, default) in [
        ("ema_short", 9),
        ("ema_long", 21),
        ("rsi_period", 14),
        ("atr_period", 14),
        ("bollinger_period", 20),
        ("volume_window", 20),
    ] {
        if config.get_int("strategy", key, default) < 1 {
            return Err(PivotraderError::config_invalid(
                "strategy",
                key,
                format!("{} must be at least 1", key),
            ));
        }
    }
    Ok(())
}

fn validate_ema_pair(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let short = config.get_int("strategy", "ema_short", 9);
    let long = config.get_int("strategy", "ema_long", 21);
    if short >= long {
        return Err(PivotraderError::config_invalid(
            "strategy",
            "ema_short",
            "ema_short must be shorter than ema_long",
        ));
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    for (key, default) in [
        ("volume_threshold", 1.5),
        ("volume_surge", 1.2),
        ("bollinger_stddev", 2.0),
    ] {
        if config.get_double("strategy", key, default) <= 0.0 {
            return Err(PivotraderError::config_invalid(
                "strategy",
                key,
                format!("{} must be positive", key),
            ));
        }
    }

    let pivot = config.get_double("strategy", "pivot_threshold", 0.001);
    if !(0.0..1.0).contains(&pivot) {
        return Err(PivotraderError::config_invalid(
            "strategy",
            "pivot_threshold",
            "pivot_threshold must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_rsi_bounds(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let oversold = config.get_double("strategy", "rsi_oversold", 30.0);
    let overbought = config.get_double("strategy", "rsi_overbought", 70.0);
    if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
        return Err(PivotraderError::config_invalid(
            "strategy",
            "rsi_oversold",
            "RSI bounds must lie in [0, 100]",
        ));
    }
    if oversold >= overbought {
        return Err(PivotraderError::config_invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    Ok(())
}

fn validate_exit(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    one_of(config, "risk", "exit", &["staged", "stop_take"])
}

fn validate_position_size_percent(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let value = config.get_double("risk", "position_size_percent", 2.0);
    if value <= 0.0 || value > 100.0 {
        return Err(PivotraderError::config_invalid(
            "risk",
            "position_size_percent",
            "position_size_percent must be in (0, 100]",
        ));
    }
    Ok(())
}

fn validate_stop_take(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let stop = config.get_double("risk", "stop_loss", 0.02);
    if !(0.0..1.0).contains(&stop) {
        return Err(PivotraderError::config_invalid(
            "risk",
            "stop_loss",
            "stop_loss must be a fraction in [0, 1)",
        ));
    }
    let take = config.get_double("risk", "take_profit", 0.04);
    if take < 0.0 {
        return Err(PivotraderError::config_invalid(
            "risk",
            "take_profit",
            "take_profit must be non-negative",
        ));
    }
    Ok(())
}

fn validate_staged_targets(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    let first = config.get_double("risk", "first_target", 0.02);
    let second = config.get_double("risk", "second_target", 0.025);
    if first <= 0.0 {
        return Err(PivotraderError::config_invalid(
            "risk",
            "first_target",
            "first_target must be positive",
        ));
    }
    if second < first {
        return Err(PivotraderError::config_invalid(
            "risk",
            "second_target",
            "second_target must not be below first_target",
        ));
    }
    let fraction = config.get_double("risk", "partial_fraction", 0.5);
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(PivotraderError::config_invalid(
            "risk",
            "partial_fraction",
            "partial_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    one_of(config, "data", "source", &["csv", "sqlite"])?;
    let source = config
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "csv".to_string());
    match source.as_str() {
        "sqlite" => required_string(config, "sqlite", "path").map(|_| ()),
        _ => required_string(config, "data", "csv_dir").map(|_| ()),
    }
}

fn validate_persistence(config: &dyn ConfigPort) -> Result<(), PivotraderError> {
    one_of(config, "persistence", "sink", &["none", "json", "sqlite"])?;
    let sink = config
        .get_string("persistence", "sink")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "none".to_string());
    match sink.as_str() {
        "json" => required_string(config, "persistence", "json_path").map(|_| ()),
        "sqlite" => required_string(config, "sqlite", "path").map(|_| ()),
        _ => Ok(()),
    }
}
