//! Configuration access port trait.

use std::fmt;

/// Type a present config value must parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Int => write!(f, "integer"),
            ValueKind::Float => write!(f, "number"),
            ValueKind::Bool => write!(f, "boolean"),
        }
    }
}

/// Accepted boolean spellings, case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Lower-cased, trimmed string value, or `default` when absent.
    fn get_choice(&self, section: &str, key: &str, default: &str) -> String {
        self.get_string(section, key)
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_else(|| default.to_string())
    }

    /// `Err` when the key is present but does not parse as `kind`.
    /// The typed getters fall back to their default in that case, so
    /// validation calls this first.
    fn check_value(&self, section: &str, key: &str, kind: ValueKind) -> Result<(), String> {
        let Some(raw) = self.get_string(section, key) else {
            return Ok(());
        };
        let raw = raw.trim();
        let parses = match kind {
            ValueKind::Int => raw.parse::<i64>().is_ok(),
            ValueKind::Float => raw.parse::<f64>().is_ok(),
            ValueKind::Bool => parse_bool(raw).is_some(),
        };
        if parses {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid {}", raw, kind))
        }
    }
}
