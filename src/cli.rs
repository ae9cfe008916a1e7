//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_record_adapter::JsonRecordAdapter;
use crate::adapters::log_event_adapter::LogEventSink;
use crate::adapters::typst_report::TypstReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::config_validation::{parse_date, parse_interval, validate_all};
use crate::domain::error::PivotraderError;
use crate::domain::execution::{ExitPolicy, SizingParams, StagedExitParams, StopTakeParams};
use crate::domain::indicator_helpers::IndicatorParams;
use crate::domain::ohlcv::BarSeries;
use crate::domain::strategy::{CprPivotRule, SignalGenerator, SignalRule, ThresholdRule};
use crate::ports::config_port::{ConfigPort, ValueKind};
use crate::ports::data_port::DataPort;
use crate::ports::event_port::EventSink;
use crate::ports::persistence_port::{PersistencePort, RunRecord};
use crate::ports::report_port::{ReportPort, ReportSnapshot};

#[derive(Parser, Debug)]
#[command(name = "pivotrader", about = "Single-symbol signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Report path (defaults to [report] output, then report.typ)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        /// Validate and print the resolved run without touching data
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the stored data range for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List symbols available at the configured interval
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            output,
            symbol,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbol.as_deref())
            } else {
                run_backtest_command(&config, output.as_deref(), symbol.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, PivotraderError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Serves `[backtest] symbol` from a command-line override and everything
/// else from the wrapped config.
pub struct SymbolOverride<'a> {
    inner: &'a dyn ConfigPort,
    symbol: Option<String>,
}

impl<'a> SymbolOverride<'a> {
    pub fn new(inner: &'a dyn ConfigPort, symbol: Option<&str>) -> Self {
        Self {
            inner,
            symbol: symbol.map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()),
        }
    }
}

impl ConfigPort for SymbolOverride<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match (&self.symbol, section, key) {
            (Some(symbol), "backtest", "symbol") => Some(symbol.clone()),
            _ => self.inner.get_string(section, key),
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.inner.get_int(section, key, default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.inner.get_double(section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(section, key, default)
    }

    fn check_value(&self, section: &str, key: &str, kind: ValueKind) -> Result<(), String> {
        self.inner.check_value(section, key, kind)
    }
}

fn period(config: &dyn ConfigPort, key: &str, default: i64) -> usize {
    config.get_int("strategy", key, default).max(1) as usize
}

pub fn build_signal_rule(config: &dyn ConfigPort) -> SignalRule {
    match config.get_choice("strategy", "signal", "cpr_pivot").as_str() {
        "threshold" => SignalRule::Threshold(ThresholdRule {
            rsi_oversold: config.get_double("strategy", "rsi_oversold", 30.0),
            rsi_overbought: config.get_double("strategy", "rsi_overbought", 70.0),
            volume_surge: config.get_double("strategy", "volume_surge", 1.2),
        }),
        _ => SignalRule::CprPivot(CprPivotRule {
            volume_threshold: config.get_double("strategy", "volume_threshold", 1.5),
            pivot_threshold: config.get_double("strategy", "pivot_threshold", 0.001),
        }),
    }
}

/// Exit policy from `[risk] exit`; without one, threshold signals use the
/// staged ladder and CPR signals use stop/take.
pub fn build_exit_policy(config: &dyn ConfigPort, signal: &SignalRule) -> ExitPolicy {
    let default = match signal {
        SignalRule::Threshold(_) => "staged",
        SignalRule::CprPivot(_) => "stop_take",
    };
    match config.get_choice("risk", "exit", default).as_str() {
        "stop_take" => ExitPolicy::StopTakeProfit(StopTakeParams {
            stop_loss: config.get_double("risk", "stop_loss", 0.02),
            take_profit: config.get_double("risk", "take_profit", 0.04),
            size_weighted: config.get_bool("risk", "size_weighted", false),
        }),
        _ => ExitPolicy::StagedPartial(StagedExitParams {
            first_target: config.get_double("risk", "first_target", 0.02),
            second_target: config.get_double("risk", "second_target", 0.025),
            partial_fraction: config.get_double("risk", "partial_fraction", 0.5),
        }),
    }
}

pub fn build_backtest_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestConfig, PivotraderError> {
    let config = SymbolOverride::new(config, symbol_override);

    let symbol = config
        .get_string("backtest", "symbol")
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PivotraderError::config_missing("backtest", "symbol"))?;
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    let indicators = IndicatorParams {
        rsi_period: period(&config, "rsi_period", 14),
        atr_period: period(&config, "atr_period", 14),
        bollinger_period: period(&config, "bollinger_period", 20),
        bollinger_stddev: config.get_double("strategy", "bollinger_stddev", 2.0),
        ema_short: period(&config, "ema_short", 9),
        ema_long: period(&config, "ema_long", 21),
        volume_window: period(&config, "volume_window", 20),
    };
    let signal = build_signal_rule(&config);
    let exit = build_exit_policy(&config, &signal);

    Ok(BacktestConfig {
        symbol,
        start_date,
        end_date,
        interval: parse_interval(&config)?,
        initial_capital: config.get_double("backtest", "initial_capital", 100_000.0),
        indicators,
        signal,
        exit,
        sizing: SizingParams {
            position_size_percent: config.get_double("risk", "position_size_percent", 2.0),
        },
    })
}

pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, PivotraderError> {
    match config.get_choice("data", "source", "csv").as_str() {
        "sqlite" => open_sqlite_data_port(config),
        _ => {
            let dir = config
                .get_string("data", "csv_dir")
                .ok_or_else(|| PivotraderError::config_missing("data", "csv_dir"))?;
            log::debug!("reading bars from CSV directory {}", dir);
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir.trim()))))
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, PivotraderError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    Ok(Box::new(SqliteAdapter::from_config(config)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite_data_port(_config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, PivotraderError> {
    Err(PivotraderError::config_invalid(
        "data",
        "source",
        "sqlite support is not compiled in",
    ))
}

/// `None` when `[persistence] sink` is absent or `none`.
pub fn open_persistence(
    config: &dyn ConfigPort,
) -> Result<Option<Box<dyn PersistencePort>>, PivotraderError> {
    match config.get_choice("persistence", "sink", "none").as_str() {
        "json" => {
            let dir = config
                .get_string("persistence", "json_path")
                .ok_or_else(|| PivotraderError::config_missing("persistence", "json_path"))?;
            Ok(Some(Box::new(JsonRecordAdapter::new(PathBuf::from(dir.trim())))))
        }
        "sqlite" => open_sqlite_persistence(config).map(Some),
        _ => Ok(None),
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite_persistence(
    config: &dyn ConfigPort,
) -> Result<Box<dyn PersistencePort>, PivotraderError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    Ok(Box::new(SqliteAdapter::from_config(config)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite_persistence(
    _config: &dyn ConfigPort,
) -> Result<Box<dyn PersistencePort>, PivotraderError> {
    Err(PivotraderError::config_invalid(
        "persistence",
        "sink",
        "sqlite support is not compiled in",
    ))
}

/// Fetch bars and run the backtest.
pub fn run_pipeline(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    sink: &dyn EventSink,
) -> Result<(BarSeries, BacktestResult), PivotraderError> {
    let bars = data_port.fetch_bars(
        &config.symbol,
        config.start_date,
        config.end_date,
        config.interval,
    )?;
    eprintln!(
        "Running backtest: {} ({}), {} to {}, {} bars",
        config.symbol,
        config.interval,
        config.start_date,
        config.end_date,
        bars.len()
    );
    let result = run_backtest(&bars, config, sink)?;
    Ok((bars, result))
}

/// Report destination: `-o`, then `[report] output`, then `report.typ`.
pub fn resolve_output_path(output: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("report.typ"))
}

fn print_summary(config: &BacktestConfig, result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== Results: {} ===", config.run_id());
    eprintln!("Final Value:      {:.2}", m.final_value);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Volatility (ann): {:.4}", m.annualized_volatility);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
    eprintln!("Fills:            {}", result.trades.len());
    match &m.trade_stats {
        Some(stats) => {
            eprintln!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
            eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
            eprintln!("Avg Duration:     {} days", stats.avg_trade_duration_days);
        }
        None => eprintln!("Trade Stats:      n/a (no completed sells)"),
    }
    eprintln!(
        "Round Trips:      {} ({} closed, {} winners, realized {:.2})",
        m.round_trips.count, m.round_trips.closed, m.round_trips.winners, m.round_trips.realized_pnl
    );
    eprintln!(
        "Projected:        1m {:.2} / 12m {:.2} / 10y {:.2}",
        m.projections.one_month, m.projections.twelve_months, m.projections.ten_years
    );
}

fn run_backtest_command(
    config_path: &Path,
    output: Option<&Path>,
    symbol: Option<&str>,
) -> Result<(), PivotraderError> {
    let adapter = load_config(config_path)?;
    let config = SymbolOverride::new(&adapter, symbol);
    validate_all(&config)?;

    let bt_config = build_backtest_config(&config, None)?;
    eprintln!(
        "Strategy: signal={} exit={}",
        bt_config.signal.name(),
        bt_config.exit.name()
    );

    let data_port = open_data_port(&config)?;
    let (bars, result) = run_pipeline(data_port.as_ref(), &bt_config, &LogEventSink)?;
    print_summary(&bt_config, &result);

    match open_persistence(&config) {
        Ok(Some(sink)) => {
            if let Err(e) = sink.save_run(&RunRecord::from_result(&bt_config, &result)) {
                log::error!("failed to persist run {}: {}", bt_config.run_id(), e);
            }
        }
        Ok(None) => {}
        Err(e) => log::error!("persistence unavailable: {}", e),
    }

    let output_path = resolve_output_path(output, &config);
    let reporter = TypstReportAdapter::new(
        config
            .get_string("report", "template_path")
            .map(PathBuf::from),
    );
    let snapshot = ReportSnapshot::new(&bt_config, &bars, &result);
    match reporter.write(&snapshot, &output_path.to_string_lossy()) {
        Ok(()) => eprintln!("\nReport written to: {}", output_path.display()),
        Err(e) => log::error!("report not written: {}", e),
    }
    Ok(())
}

pub fn run_dry_run(config_path: &Path, symbol: Option<&str>) -> Result<(), PivotraderError> {
    let adapter = load_config(config_path)?;
    let config = SymbolOverride::new(&adapter, symbol);
    validate_all(&config)?;
    eprintln!("Config validated successfully");

    let bt_config = build_backtest_config(&config, None)?;
    eprintln!("\nRun: {}", bt_config.run_id());
    eprintln!("  symbol:   {}", bt_config.symbol);
    eprintln!("  interval: {}", bt_config.interval);
    eprintln!("  period:   {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  capital:  {:.2}", bt_config.initial_capital);
    eprintln!("  signal:   {:?}", bt_config.signal);
    eprintln!("  exit:     {:?}", bt_config.exit);
    eprintln!("  sizing:   {:.2}% risk per entry", bt_config.sizing.position_size_percent);
    eprintln!(
        "  data:     {}",
        config.get_choice("data", "source", "csv")
    );
    eprintln!(
        "  persist:  {}",
        config.get_choice("persistence", "sink", "none")
    );

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), PivotraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let bt_config = build_backtest_config(&adapter, None)?;
    eprintln!(
        "Configuration is valid: {} with {} signals and {} exits.",
        bt_config.symbol,
        bt_config.signal.name(),
        bt_config.exit.name()
    );
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), PivotraderError> {
    let adapter = load_config(config_path)?;
    let interval = parse_interval(&adapter)?;
    let data_port = open_data_port(&adapter)?;

    let symbols = match SymbolOverride::new(&adapter, symbol).get_string("backtest", "symbol") {
        Some(s) => vec![s.trim().to_uppercase()],
        None => data_port.list_symbols(interval)?,
    };

    for s in &symbols {
        match data_port.get_data_range(s, interval) {
            Ok(Some((first, last, count))) => {
                println!("{} ({}): {} bars, {} to {}", s, interval, count, first, last);
            }
            Ok(None) => eprintln!("{} ({}): no data found", s, interval),
            Err(e) => eprintln!("error querying {} ({}): {}", s, interval, e),
        }
    }
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), PivotraderError> {
    let adapter = load_config(config_path)?;
    let interval = parse_interval(&adapter)?;
    let data_port = open_data_port(&adapter)?;

    let symbols = data_port.list_symbols(interval)?;
    if symbols.is_empty() {
        eprintln!("No symbols found at interval {}", interval);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
