//! SQLite adapter: bar storage behind [`DataPort`] and run storage behind
//! [`PersistencePort`].

use crate::domain::error::PivotraderError;
use crate::domain::ohlcv::{BarSeries, Interval, OhlcvBar};
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::{Trade, TradeKind};
use crate::domain::strategy::SignalGenerator;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::persistence_port::{PersistencePort, RunRecord};
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS bars (
        symbol TEXT NOT NULL,
        interval TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        open REAL NOT NULL,
        high REAL NOT NULL,
        low REAL NOT NULL,
        close REAL NOT NULL,
        volume REAL NOT NULL,
        PRIMARY KEY (symbol, interval, timestamp)
    );
    CREATE TABLE IF NOT EXISTS runs (
        run_id TEXT PRIMARY KEY,
        symbol TEXT NOT NULL,
        interval TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        signal TEXT NOT NULL,
        exit_policy TEXT NOT NULL,
        config_json TEXT NOT NULL,
        metrics_json TEXT NOT NULL,
        final_value REAL NOT NULL,
        total_return REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS run_trades (
        run_id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        kind TEXT NOT NULL,
        price REAL NOT NULL,
        timestamp TEXT NOT NULL,
        size REAL NOT NULL,
        PRIMARY KEY (run_id, seq)
    );
    CREATE TABLE IF NOT EXISTS run_equity (
        run_id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        equity REAL NOT NULL,
        PRIMARY KEY (run_id, seq)
    );";

fn db_err(e: r2d2::Error) -> PivotraderError {
    PivotraderError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> PivotraderError {
    PivotraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_ts(value: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            value.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn parse_kind(value: &str) -> rusqlite::Result<TradeKind> {
    match value {
        "buy" => Ok(TradeKind::Buy),
        "sell" => Ok(TradeKind::Sell),
        "partial-sell" => Ok(TradeKind::PartialSell),
        other => Err(rusqlite::Error::InvalidColumnType(
            0,
            format!("unknown trade kind '{}'", other),
            rusqlite::types::Type::Text,
        )),
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PivotraderError> {
        let db_path = config
            .get_string("sqlite", "path")
            .ok_or_else(|| PivotraderError::config_missing("sqlite", "path"))?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, PivotraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PivotraderError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), PivotraderError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    pub fn insert_bars(
        &self,
        symbol: &str,
        interval: Interval,
        bars: &[OhlcvBar],
    ) -> Result<(), PivotraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO bars
                     (symbol, interval, timestamp, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_err)?;
            for bar in bars {
                stmt.execute(params![
                    symbol,
                    interval.as_str(),
                    bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ])
                .map_err(query_err)?;
            }
        }
        tx.commit().map_err(query_err)
    }

    /// Reads a stored run back; `None` when the id is unknown.
    pub fn load_run(&self, run_id: &str) -> Result<Option<RunRecord>, PivotraderError> {
        let conn = self.conn()?;

        let header: Option<(String, String)> = conn
            .query_row(
                "SELECT config_json, metrics_json FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(query_err)?;
        let Some((config_json, metrics_json)) = header else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT kind, price, timestamp, size FROM run_trades
                 WHERE run_id = ?1 ORDER BY seq",
            )
            .map_err(query_err)?;
        let trades = stmt
            .query_map(params![run_id], |row| {
                let kind: String = row.get(0)?;
                let timestamp: String = row.get(2)?;
                Ok(Trade {
                    kind: parse_kind(&kind)?,
                    price: row.get(1)?,
                    timestamp: parse_ts(&timestamp)?,
                    size: row.get(3)?,
                })
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        let mut stmt = conn
            .prepare("SELECT timestamp, equity FROM run_equity WHERE run_id = ?1 ORDER BY seq")
            .map_err(query_err)?;
        let equity_curve = stmt
            .query_map(params![run_id], |row| {
                let timestamp: String = row.get(0)?;
                Ok(EquityPoint {
                    timestamp: parse_ts(&timestamp)?,
                    equity: row.get(1)?,
                })
            })
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        Ok(Some(RunRecord {
            run_id: run_id.to_string(),
            config: serde_json::from_str(&config_json)?,
            trades,
            equity_curve,
            metrics: serde_json::from_str(&metrics_json)?,
        }))
    }

    pub fn run_count(&self) -> Result<usize, PivotraderError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
            .map_err(query_err)?;
        Ok(count as usize)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<BarSeries, PivotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, open, high, low, close, volume
                 FROM bars
                 WHERE symbol = ?1 AND interval = ?2
                   AND date(timestamp) >= ?3 AND date(timestamp) <= ?4
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let bars = stmt
            .query_map(
                params![
                    symbol,
                    interval.as_str(),
                    start_date.format("%Y-%m-%d").to_string(),
                    end_date.format("%Y-%m-%d").to_string()
                ],
                |row| {
                    let timestamp: String = row.get(0)?;
                    Ok(OhlcvBar {
                        timestamp: parse_ts(&timestamp)?,
                        open: row.get(1)?,
                        high: row.get(2)?,
                        low: row.get(3)?,
                        close: row.get(4)?,
                        volume: row.get(5)?,
                    })
                },
            )
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        if bars.is_empty() {
            return Err(PivotraderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        BarSeries::new(bars)
    }

    fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, PivotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM bars WHERE interval = ?1 ORDER BY symbol")
            .map_err(query_err)?;
        let symbols = stmt
            .query_map(params![interval.as_str()], |row| row.get(0))
            .map_err(query_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_err)?;
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PivotraderError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*)
                 FROM bars WHERE symbol = ?1 AND interval = ?2",
                params![symbol, interval.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = parse_ts(&min_str).map_err(query_err)?;
                let max = parse_ts(&max_str).map_err(query_err)?;
                Ok(Some((min.date(), max.date(), count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl PersistencePort for SqliteAdapter {
    /// Upserts the run header and replaces its trades and equity rows in
    /// one transaction.
    fn save_run(&self, record: &RunRecord) -> Result<(), PivotraderError> {
        let config_json = serde_json::to_string(&record.config)?;
        let metrics_json = serde_json::to_string(&record.metrics)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT INTO runs (run_id, symbol, interval, start_date, end_date, signal,
                               exit_policy, config_json, metrics_json, final_value, total_return)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(run_id) DO UPDATE SET
                symbol = excluded.symbol,
                interval = excluded.interval,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                signal = excluded.signal,
                exit_policy = excluded.exit_policy,
                config_json = excluded.config_json,
                metrics_json = excluded.metrics_json,
                final_value = excluded.final_value,
                total_return = excluded.total_return",
            params![
                record.run_id,
                record.config.symbol,
                record.config.interval.as_str(),
                record.config.start_date.format("%Y-%m-%d").to_string(),
                record.config.end_date.format("%Y-%m-%d").to_string(),
                record.config.signal.name(),
                record.config.exit.name(),
                config_json,
                metrics_json,
                record.metrics.final_value,
                record.metrics.total_return
            ],
        )
        .map_err(query_err)?;

        tx.execute("DELETE FROM run_trades WHERE run_id = ?1", params![record.run_id])
            .map_err(query_err)?;
        tx.execute("DELETE FROM run_equity WHERE run_id = ?1", params![record.run_id])
            .map_err(query_err)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO run_trades (run_id, seq, kind, price, timestamp, size)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(query_err)?;
            for (seq, trade) in record.trades.iter().enumerate() {
                stmt.execute(params![
                    record.run_id,
                    seq as i64,
                    trade.kind.as_str(),
                    trade.price,
                    trade.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    trade.size
                ])
                .map_err(query_err)?;
            }

            let mut stmt = tx
                .prepare(
                    "INSERT INTO run_equity (run_id, seq, timestamp, equity)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_err)?;
            for (seq, point) in record.equity_curve.iter().enumerate() {
                stmt.execute(params![
                    record.run_id,
                    seq as i64,
                    point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    point.equity
                ])
                .map_err(query_err)?;
            }
        }

        tx.commit().map_err(query_err)?;
        log::info!(
            "saved run {} ({} trades, {} equity points)",
            record.run_id,
            record.trades.len(),
            record.equity_curve.len()
        );
        Ok(())
    }
}
