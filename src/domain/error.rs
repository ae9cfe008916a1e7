//! Domain error types.

/// Top-level error type for pivotrader.
#[derive(Debug, thiserror::Error)]
pub enum PivotraderError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol} at interval {interval}")]
    NoData { symbol: String, interval: String },

    #[error("bar {index} does not advance the timestamp of the bar before it")]
    UnorderedBars { index: usize },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PivotraderError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PivotraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_missing(section: &str, key: &str) -> Self {
        PivotraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<serde_json::Error> for PivotraderError {
    fn from(err: serde_json::Error) -> Self {
        PivotraderError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<&PivotraderError> for std::process::ExitCode {
    fn from(err: &PivotraderError) -> Self {
        let code: u8 = match err {
            PivotraderError::Io(_) | PivotraderError::Report { .. } => 1,
            PivotraderError::ConfigParse { .. }
            | PivotraderError::ConfigMissing { .. }
            | PivotraderError::ConfigInvalid { .. } => 2,
            PivotraderError::Database { .. }
            | PivotraderError::DatabaseQuery { .. }
            | PivotraderError::Serialization { .. } => 3,
            PivotraderError::DataSource { .. } | PivotraderError::UnorderedBars { .. } => 4,
            PivotraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_message_names_symbol_and_interval() {
        let err = PivotraderError::NoData {
            symbol: "GOOGL".into(),
            interval: "15m".into(),
        };
        assert_eq!(err.to_string(), "no data for GOOGL at interval 15m");
    }

    #[test]
    fn config_helpers_fill_section_and_key() {
        let err = PivotraderError::config_invalid("risk", "stop_loss", "must be below 1");
        assert!(matches!(
            err,
            PivotraderError::ConfigInvalid { ref section, ref key, .. }
                if section == "risk" && key == "stop_loss"
        ));
        let err = PivotraderError::config_missing("backtest", "symbol");
        assert_eq!(err.to_string(), "missing config key [backtest] symbol");
    }

    #[test]
    fn serde_json_errors_convert() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: PivotraderError = parse.unwrap_err().into();
        assert!(matches!(err, PivotraderError::Serialization { .. }));
    }
}
